//! Remote credential operations.
//!
//! `CredentialGateway` is the seam between the session manager and the auth
//! service. `HttpGateway` is the production implementation; tests substitute
//! in-memory fakes.
//!
//! Every call is exactly one round trip. Failures are classified into
//! `GatewayErrorKind` and nothing is retried here.

pub mod client;
pub mod error;
pub mod types;

use std::future::Future;

pub use client::HttpGateway;
pub use error::{GatewayError, GatewayErrorKind};
pub use types::AuthGrant;

pub trait CredentialGateway: Send + Sync {
    /// Create an account. Servers answer with a token for the new account.
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, GatewayError>> + Send;

    /// Exchange credentials for a bearer token.
    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<AuthGrant, GatewayError>> + Send;

    /// Ask the server to forget `token`. Best effort.
    fn invalidate(&self, token: &str) -> impl Future<Output = Result<(), GatewayError>> + Send;
}
