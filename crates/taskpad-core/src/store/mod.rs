//! Durable session persistence.
//!
//! `SessionStore` keeps the bearer token, the user record and an expiry
//! marker under fixed keys in a `KeyValueStore` backend:
//! - `MemoryStore`: process-local, for tests and embedding
//! - `FileStore`: `session.json` in the profile's data directory
//! - `KeyringStore`: OS keychain via `keyring`

pub mod backend;
pub mod session_store;

pub use backend::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
pub use session_store::{SessionStore, StoreError, StoredSession};
