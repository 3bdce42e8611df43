//! Structural decoding of bearer tokens.
//!
//! Tokens are JWTs (`header.payload.signature`). Only the payload is read and
//! the signature is never checked, so a successful decode proves nothing about
//! who issued the token. Claims are used to pre-populate display data and to
//! treat a token as stale before the server rejects it.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Base64url that tolerates both padded and unpadded segments.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token: {0}")]
    Malformed(String),
}

/// Claims projected from the payload segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenPayload {
    /// `sub` claim (string or number in the source token).
    pub subject: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    /// `exp` claim in epoch seconds.
    pub expires_at: Option<i64>,
}

/// Decode the payload of a three-segment token.
pub fn decode(token: &str) -> Result<TokenPayload, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, got {}",
            segments.len()
        )));
    }

    let bytes = SEGMENT_ENGINE
        .decode(segments[1])
        .map_err(|e| TokenError::Malformed(format!("invalid payload encoding: {e}")))?;

    let claims: JsonValue = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("invalid payload json: {e}")))?;

    if !claims.is_object() {
        return Err(TokenError::Malformed("payload is not an object".into()));
    }

    Ok(TokenPayload {
        subject: claims.get("sub").and_then(claim_as_string),
        email: claims.get("email").and_then(|v| v.as_str()).map(str::to_owned),
        name: claims.get("name").and_then(|v| v.as_str()).map(str::to_owned),
        expires_at: claims.get("exp").and_then(claim_as_epoch),
    })
}

/// Fail-closed expiry check: undecodable tokens and tokens without `exp`
/// count as expired.
pub fn is_expired(token: &str, now_epoch_seconds: i64) -> bool {
    match decode(token) {
        Ok(TokenPayload {
            expires_at: Some(exp),
            ..
        }) => exp <= now_epoch_seconds,
        _ => true,
    }
}

/// Whether a token is structurally sound and unexpired at `now_epoch_seconds`.
pub fn is_valid(token: &str, now_epoch_seconds: i64) -> bool {
    !is_expired(token, now_epoch_seconds)
}

/// Whether the token carries an `exp` claim at or before `now_epoch_seconds`.
///
/// Unlike [`is_expired`] this does not fail closed: a token with no readable
/// expiry has not lapsed. Used for tokens the server just issued or that are
/// already in use.
pub fn has_lapsed(token: &str, now_epoch_seconds: i64) -> bool {
    matches!(
        decode(token),
        Ok(TokenPayload { expires_at: Some(exp), .. }) if exp <= now_epoch_seconds
    )
}

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

fn claim_as_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn claim_as_epoch(value: &JsonValue) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.floor() as i64))
}

/// Build an unsigned token around `claims`. Test helper for modules that
/// need realistic tokens.
#[cfg(test)]
pub(crate) fn encode_unsigned(claims: &JsonValue) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_decode_reads_claims() {
        let token = encode_unsigned(&json!({
            "sub": "42",
            "email": "a@b.com",
            "exp": NOW + 60,
        }));

        let payload = decode(&token).unwrap();
        assert_eq!(payload.subject.as_deref(), Some("42"));
        assert_eq!(payload.email.as_deref(), Some("a@b.com"));
        assert_eq!(payload.name, None);
        assert_eq!(payload.expires_at, Some(NOW + 60));
    }

    #[test]
    fn test_decode_numeric_subject_and_float_exp() {
        let token = encode_unsigned(&json!({"sub": 7, "exp": 1234.9}));
        let payload = decode(&token).unwrap();
        assert_eq!(payload.subject.as_deref(), Some("7"));
        assert_eq!(payload.expires_at, Some(1234));
    }

    #[test]
    fn test_decode_accepts_padded_payload() {
        use base64::engine::general_purpose::URL_SAFE;

        let payload = URL_SAFE.encode(r#"{"exp":1}"#);
        assert!(payload.ends_with('='));
        let token = format!("h.{payload}.s");
        assert_eq!(decode(&token).unwrap().expires_at, Some(1));
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        for token in ["", "abc", "a.b", "a.b.c.d", "...."] {
            assert!(
                matches!(decode(token), Err(TokenError::Malformed(_))),
                "expected malformed for {token:?}"
            );
            assert!(is_expired(token, NOW), "expected expired for {token:?}");
        }
    }

    #[test]
    fn test_garbage_payload_is_malformed() {
        assert!(matches!(decode("a.!!!.c"), Err(TokenError::Malformed(_))));
        assert!(matches!(decode("a..c"), Err(TokenError::Malformed(_))));

        // Valid base64 but not JSON
        let not_json = format!("a.{}.c", SEGMENT_ENGINE.encode("hello"));
        assert!(matches!(decode(&not_json), Err(TokenError::Malformed(_))));

        // JSON but not an object
        let array = format!("a.{}.c", SEGMENT_ENGINE.encode("[1,2]"));
        assert!(matches!(decode(&array), Err(TokenError::Malformed(_))));
    }

    #[test]
    fn test_is_expired_compares_against_now() {
        let past = encode_unsigned(&json!({"exp": NOW - 1}));
        let future = encode_unsigned(&json!({"exp": NOW + 3600}));
        let boundary = encode_unsigned(&json!({"exp": NOW}));

        assert!(is_expired(&past, NOW));
        assert!(!is_expired(&future, NOW));
        assert!(is_expired(&boundary, NOW));

        assert!(is_valid(&future, NOW));
        assert!(!is_valid(&past, NOW));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = encode_unsigned(&json!({"sub": "1"}));
        assert!(is_expired(&token, NOW));
    }

    #[test]
    fn test_has_lapsed_needs_a_readable_past_exp() {
        assert!(has_lapsed(&encode_unsigned(&json!({"exp": NOW})), NOW));
        assert!(has_lapsed(&encode_unsigned(&json!({"exp": NOW - 1})), NOW));
        assert!(!has_lapsed(&encode_unsigned(&json!({"exp": NOW + 1})), NOW));

        assert!(!has_lapsed(&encode_unsigned(&json!({"sub": "1"})), NOW));
        assert!(!has_lapsed("opaque-token", NOW));
        assert!(is_expired("opaque-token", NOW));
    }
}
