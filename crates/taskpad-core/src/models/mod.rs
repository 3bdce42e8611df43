//! Data models shared across the session core.
//!
//! - `User`: the identity record shown in the UI
//! - `Session`, `SessionStatus`: the authentication state owned by `SessionManager`

pub mod session;
pub mod user;

pub use session::{Session, SessionStatus};
pub use user::User;
