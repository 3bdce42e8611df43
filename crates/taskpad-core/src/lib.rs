//! Taskpad core - client-side authentication session management.
//!
//! The task UI talks to a single `SessionManager`, which owns the
//! authentication state and coordinates:
//!
//! - `gateway`: register / sign in / sign out calls against the auth service
//! - `token`: structural JWT decoding and expiry checks (no signature checks)
//! - `store`: persistence of the bearer token and user across restarts
//!
//! Decoded token claims are for display only and must never be used for
//! authorization.

pub mod config;
pub mod gateway;
pub mod models;
pub mod session;
pub mod store;
pub mod token;

pub use config::{Config, StorageBackend};
pub use gateway::{AuthGrant, CredentialGateway, GatewayError, GatewayErrorKind, HttpGateway};
pub use models::{Session, SessionStatus, User};
pub use session::SessionManager;
pub use store::{FileStore, KeyValueStore, KeyringStore, MemoryStore, SessionStore};
pub use token::{TokenError, TokenPayload};

/// Build a manager from configuration: HTTP gateway plus the configured
/// storage backend for the active profile.
pub fn open(config: &Config) -> anyhow::Result<SessionManager<HttpGateway>> {
    let gateway = HttpGateway::from_config(config)?;
    let store = SessionStore::new(config.open_store()?);
    Ok(SessionManager::new(gateway, store))
}
