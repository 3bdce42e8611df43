use anyhow::Result;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::User;
use crate::token;

use super::KeyValueStore;

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "auth_user";
pub const EXPIRES_AT_KEY: &str = "auth_expires_at";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Stored session is corrupted: {0}")]
    Corrupted(String),
    #[error("Session storage unavailable: {0}")]
    Unavailable(String),
}

/// A persisted session as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

/// The bearer token and user record for one profile.
///
/// `load` never fails. Unparseable or partial records are wiped and
/// reported as absent; a backend that cannot be read right now is reported
/// as absent and left untouched.
pub struct SessionStore {
    backend: Box<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> Option<StoredSession> {
        match self.try_load() {
            Ok(stored) => stored,
            Err(e @ StoreError::Unavailable(_)) => {
                warn!(error = %e, "Could not read stored session");
                None
            }
            Err(e @ StoreError::Corrupted(_)) => {
                warn!(error = %e, "Discarding stored session");
                if let Err(e) = self.clear() {
                    warn!(error = %e, "Failed to clear corrupted session");
                }
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<StoredSession>, StoreError> {
        let read = |key: &str| {
            self.backend.get(key).map_err(|e| {
                let detail = format!("{key}: {e:#}");
                if e.downcast_ref::<serde_json::Error>().is_some() {
                    StoreError::Corrupted(detail)
                } else {
                    StoreError::Unavailable(detail)
                }
            })
        };

        let token = read(TOKEN_KEY)?;
        let user = read(USER_KEY)?;

        let Some(token) = token else {
            if user.is_some() || read(EXPIRES_AT_KEY)?.is_some() {
                return Err(StoreError::Corrupted("user record without token".into()));
            }
            return Ok(None);
        };

        let user = user.ok_or_else(|| StoreError::Corrupted("token without user record".into()))?;
        let user: User = serde_json::from_str(&user)
            .map_err(|e| StoreError::Corrupted(format!("unparseable user record: {e}")))?;

        Ok(Some(StoredSession { token, user }))
    }

    /// Persist `token` and `user`. The token is written last so an
    /// interrupted save never looks like a complete record.
    pub fn save(&self, token: &str, user: &User) -> Result<()> {
        let user_json = serde_json::to_string(user)?;
        self.backend.set(USER_KEY, &user_json)?;

        match token::decode(token).ok().and_then(|p| p.expires_at) {
            Some(exp) => self.backend.set(EXPIRES_AT_KEY, &exp.to_string())?,
            None => self.backend.remove(EXPIRES_AT_KEY)?,
        }

        self.backend.set(TOKEN_KEY, token)?;
        debug!(user_id = %user.id, "Saved session");
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.backend.remove(TOKEN_KEY)?;
        self.backend.remove(USER_KEY)?;
        self.backend.remove(EXPIRES_AT_KEY)?;
        Ok(())
    }
}
