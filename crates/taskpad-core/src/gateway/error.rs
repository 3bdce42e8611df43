use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure class of a remote auth operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum GatewayErrorKind {
    /// Rejected credentials or request validation failure.
    InvalidCredentials,
    /// The account already exists.
    Conflict,
    /// Network, DNS, TLS or timeout failure; no response was received.
    Unreachable,
    Unknown,
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[error("{kind:?}: {message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    pub message: String,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Unreachable, message)
    }

    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Pull a human-readable message out of an error body. Auth servers put it
    /// under `detail`, `error` or `message`; anything else is shown raw.
    fn extract_message(body: &str) -> Option<String> {
        let json: serde_json::Value = serde_json::from_str(body).ok()?;
        ["detail", "error", "message"]
            .iter()
            .find_map(|key| json.get(key).and_then(|v| v.as_str()))
            .map(str::to_owned)
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body).unwrap_or_else(|| {
            let truncated = Self::truncate_body(body);
            if truncated.is_empty() {
                format!("Status {}", status)
            } else {
                format!("Status {}: {}", status, truncated)
            }
        });

        let kind = match status.as_u16() {
            400 | 401 | 403 | 422 => GatewayErrorKind::InvalidCredentials,
            409 => GatewayErrorKind::Conflict,
            _ => GatewayErrorKind::Unknown,
        };

        Self::new(kind, message)
    }

    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::unreachable(format!("Request timed out: {}", err))
        } else if err.is_connect() || err.is_request() {
            Self::unreachable(format!("Network error: {}", err))
        } else if err.is_decode() {
            Self::new(GatewayErrorKind::Unknown, format!("Invalid response: {}", err))
        } else {
            Self::new(GatewayErrorKind::Unknown, err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_classifies() {
        let cases = [
            (StatusCode::BAD_REQUEST, GatewayErrorKind::InvalidCredentials),
            (StatusCode::UNAUTHORIZED, GatewayErrorKind::InvalidCredentials),
            (StatusCode::FORBIDDEN, GatewayErrorKind::InvalidCredentials),
            (StatusCode::UNPROCESSABLE_ENTITY, GatewayErrorKind::InvalidCredentials),
            (StatusCode::CONFLICT, GatewayErrorKind::Conflict),
            (StatusCode::NOT_FOUND, GatewayErrorKind::Unknown),
            (StatusCode::TOO_MANY_REQUESTS, GatewayErrorKind::Unknown),
            (StatusCode::INTERNAL_SERVER_ERROR, GatewayErrorKind::Unknown),
        ];
        for (status, kind) in cases {
            assert_eq!(GatewayError::from_status(status, "").kind, kind, "{status}");
        }
    }

    #[test]
    fn test_from_status_prefers_json_detail() {
        let err = GatewayError::from_status(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Incorrect email or password"}"#,
        );
        assert_eq!(err.message, "Incorrect email or password");

        let err = GatewayError::from_status(StatusCode::CONFLICT, r#"{"error": "Email already registered"}"#);
        assert_eq!(err.message, "Email already registered");
    }

    #[test]
    fn test_from_status_truncates_raw_body() {
        let body = "x".repeat(2000);
        let err = GatewayError::from_status(StatusCode::BAD_GATEWAY, &body);
        assert!(err.message.contains("truncated, 2000 total bytes"));
        assert!(err.message.len() < 600);
    }
}
