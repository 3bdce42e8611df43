use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;

use super::User;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum SessionStatus {
    /// Not yet determined; only observed before rehydration completes.
    #[default]
    Unknown,
    Anonymous,
    Authenticated,
    /// A previously valid token was found to be past its expiry at request time.
    Expired,
}

/// Authentication state as seen by the UI.
///
/// Invariant: `status == Authenticated` exactly when `token` and `user` are
/// both present and the token was unexpired when last checked.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub status: SessionStatus,
    pub token: Option<String>,
    pub user: Option<User>,
    pub last_error: Option<GatewayError>,
}

impl Session {
    pub(crate) fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            ..Self::default()
        }
    }

    pub(crate) fn authenticated(token: String, user: User) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            token: Some(token),
            user: Some(user),
            last_error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_is_unknown() {
        let session = Session::default();
        assert_eq!(session.status, SessionStatus::Unknown);
        assert!(session.token.is_none());
        assert!(session.user.is_none());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_authenticated_session_carries_token_and_user() {
        let session = Session::authenticated("t".to_string(), User::new("1", "a@b.com"));
        assert!(session.is_authenticated());
        assert_eq!(session.token.as_deref(), Some("t"));
        assert_eq!(session.user.as_ref().map(|u| u.email.as_str()), Some("a@b.com"));
    }
}
