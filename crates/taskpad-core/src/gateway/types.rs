use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::models::user::deserialize_optional_id;
use crate::models::User;

/// Successful result of `register` or `authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthGrant {
    #[serde(alias = "access_token")]
    pub token: String,
    /// Whatever identity the body carried. Never fails the parse: the grant
    /// is still usable when the user object is odd or missing fields.
    #[serde(default, deserialize_with = "deserialize_lenient_user")]
    pub user: Option<User>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub user_id: Option<String>,
}

impl AuthGrant {
    pub fn new(token: impl Into<String>, user: Option<User>) -> Self {
        Self {
            token: token.into(),
            user,
            user_id: None,
        }
    }
}

/// Display name keys seen across servers, in order of preference.
const DISPLAY_NAME_KEYS: [&str; 4] = ["displayName", "display_name", "name", "username"];

fn deserialize_lenient_user<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<User>, D::Error> {
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(user_from_body))
}

fn user_from_body(value: &JsonValue) -> Option<User> {
    let fields = value.as_object()?;
    let text = |key: &str| match fields.get(key)? {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    };

    Some(User {
        id: text("id").unwrap_or_default(),
        email: text("email").unwrap_or_default(),
        display_name: DISPLAY_NAME_KEYS.iter().find_map(|key| text(*key)),
    })
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub username: &'a str,
}
