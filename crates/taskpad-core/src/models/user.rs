use serde::{Deserialize, Deserializer, Serialize};

/// Identity of the signed-in user, for display only.
///
/// Populated from decoded token claims or from the gateway response body,
/// never used to make authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "username", alias = "name")]
    pub display_name: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        let email = email.into();
        let display_name = Some(local_part(&email).to_string());
        Self {
            id: id.into(),
            email,
            display_name,
        }
    }

    /// Name to show in the UI: the explicit display name, or the email local part.
    pub fn display_label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => local_part(&self.email),
        }
    }
}

/// Everything before the `@` of an email address ("user" for an empty string).
pub fn local_part(email: &str) -> &str {
    match email.split('@').next() {
        Some(local) if !local.is_empty() => local,
        _ => "user",
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// Servers send user ids as either JSON numbers or strings (UUIDs).
pub(crate) fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(RawId::into_string)
}

pub(crate) fn deserialize_optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(RawId::into_string))
}
