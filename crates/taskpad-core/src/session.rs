//! Session manager: the authentication state machine.
//!
//! ```text
//! Unknown ──rehydrate──> Anonymous | Authenticated
//! Anonymous | Expired ──sign_in──> Authenticated
//! Authenticated ──bearer_token (exp passed)──> Expired
//! any ──sign_out──> Anonymous
//! ```
//!
//! `sign_up` never changes status: registration stores the issued token but
//! the user still signs in as a separate step.
//!
//! Mutating operations are serialized in call order through `op_lock`, a FIFO
//! async mutex held for the whole operation including its network call.
//! State changes are published on a `watch` channel, and every store write
//! that accompanies one happens inside the channel's write lock so the two
//! cannot be interleaved by `bearer_token` on another thread.
//!
//! Tokens without a readable `exp` are accepted from the gateway and kept
//! while in use. Only a stored token found at startup is held to the
//! fail-closed check.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::gateway::{AuthGrant, CredentialGateway, GatewayError, GatewayErrorKind};
use crate::models::user::local_part;
use crate::models::{Session, SessionStatus, User};
use crate::store::{SessionStore, StoredSession};
use crate::token::{self, TokenPayload};

/// Source of "now" in epoch seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub struct SessionManager<G> {
    gateway: G,
    store: SessionStore,
    state: watch::Sender<Session>,
    op_lock: Mutex<()>,
    clock: Clock,
}

impl<G: CredentialGateway> SessionManager<G> {
    /// Create a manager and rehydrate it from `store`. No network call is made.
    pub fn new(gateway: G, store: SessionStore) -> Self {
        Self::with_clock(gateway, store, Arc::new(token::now_epoch_seconds))
    }

    pub fn with_clock(gateway: G, store: SessionStore, clock: Clock) -> Self {
        let (state, _) = watch::channel(Session::default());
        let manager = Self {
            gateway,
            store,
            state,
            op_lock: Mutex::new(()),
            clock,
        };
        manager.rehydrate();
        manager
    }

    fn now(&self) -> i64 {
        (self.clock)()
    }

    fn rehydrate(&self) {
        let next = match self.store.load() {
            None => {
                debug!("No stored session");
                Session::anonymous()
            }
            Some(stored) if token::is_expired(&stored.token, self.now()) => {
                // No refresh mechanism exists, so a stale token is dropped outright
                info!(user_id = %stored.user.id, "Stored session expired, discarding");
                self.clear_store();
                Session::anonymous()
            }
            Some(stored) => {
                let user = user_from_stored(&stored);
                info!(user_id = %user.id, "Restored session");
                Session::authenticated(stored.token, user)
            }
        };
        self.state.send_replace(next);
    }

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Register a new account.
    ///
    /// The issued token is persisted but the session is not authenticated;
    /// the caller signs in separately.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, GatewayError> {
        let _guard = self.op_lock.lock().await;

        match self.gateway.register(email, password).await {
            Ok(grant) => {
                let user = resolve_user(&grant, email);
                self.state.send_modify(|s| {
                    if let Err(e) = self.store.save(&grant.token, &user) {
                        warn!(error = %e, "Failed to persist token after sign up");
                    }
                    s.last_error = None;
                });
                info!(user_id = %user.id, "Registered account");
                Ok(user)
            }
            Err(e) => {
                warn!(kind = ?e.kind, "Sign up failed");
                self.state.send_modify(|s| s.last_error = Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Exchange credentials for a token and authenticate the session.
    ///
    /// On failure the status and stored session are left as they were. A
    /// token whose `exp` has already passed is refused as `Unknown`.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, GatewayError> {
        let _guard = self.op_lock.lock().await;

        let grant = self
            .gateway
            .authenticate(email, password)
            .await
            .and_then(|grant| {
                if token::has_lapsed(&grant.token, self.now()) {
                    return Err(GatewayError::new(
                        GatewayErrorKind::Unknown,
                        "Server issued an already expired token",
                    ));
                }
                Ok(grant)
            });

        match grant {
            Ok(grant) => {
                let user = resolve_user(&grant, email);
                self.state.send_modify(|s| {
                    if let Err(e) = self.store.save(&grant.token, &user) {
                        warn!(error = %e, "Failed to persist session, continuing in memory");
                    }
                    *s = Session::authenticated(grant.token, user.clone());
                });
                info!(user_id = %user.id, "Signed in");
                Ok(user)
            }
            Err(e) => {
                warn!(kind = ?e.kind, "Sign in failed");
                self.state.send_modify(|s| s.last_error = Some(e.clone()));
                Err(e)
            }
        }
    }

    /// Forget the session locally, then ask the server to invalidate the token.
    ///
    /// Always succeeds: the local transition happens first and a remote
    /// failure is only logged.
    pub async fn sign_out(&self) {
        let _guard = self.op_lock.lock().await;

        // A token saved by sign_up is only in the store
        let in_memory = self.state.borrow().token.clone();
        let token = in_memory.or_else(|| self.store.load().map(|stored| stored.token));

        self.state.send_modify(|s| {
            self.clear_store();
            *s = Session::anonymous();
        });
        info!("Signed out");

        if let Some(token) = token {
            if let Err(e) = self.gateway.invalidate(&token).await {
                warn!(kind = ?e.kind, error = %e.message, "Remote sign out failed");
            }
        }
    }

    /// Whether `token` is structurally valid and unexpired right now.
    /// Does not touch the session.
    pub fn verify(&self, token: &str) -> bool {
        token::is_valid(token, self.now())
    }

    /// Token to attach to an outgoing request.
    ///
    /// If the current token's `exp` has passed since it was last checked, the
    /// store is cleared, the session moves to `Expired` and `None` is
    /// returned. Tokens without a readable `exp` are returned as is.
    pub fn bearer_token(&self) -> Option<String> {
        let session = self.session();
        if session.status != SessionStatus::Authenticated {
            return None;
        }
        let token = session.token?;

        if token::has_lapsed(&token, self.now()) {
            if !self.expire_if_current(&token) {
                // A newer session replaced this one after the snapshot
                return self.bearer_token();
            }
            return None;
        }
        Some(token)
    }

    /// Move to `Expired` only if `token` is still the live session token.
    /// Returns whether the session was expired.
    fn expire_if_current(&self, token: &str) -> bool {
        self.state.send_if_modified(|s| {
            if s.status != SessionStatus::Authenticated || s.token.as_deref() != Some(token) {
                return false;
            }
            info!("Session token expired");
            self.clear_store();
            *s = Session {
                status: SessionStatus::Expired,
                ..Session::default()
            };
            true
        })
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }
    }
}

/// Build the user for a fresh grant: token claims first, then the response
/// body, then what the caller typed.
fn resolve_user(grant: &AuthGrant, email: &str) -> User {
    let claims = decode_claims(&grant.token);
    let body = grant.user.as_ref();

    let id = claims
        .subject
        .or_else(|| body.map(|u| u.id.clone()).filter(|id| !id.is_empty()))
        .or_else(|| grant.user_id.clone())
        .unwrap_or_default();

    let email = claims
        .email
        .or_else(|| body.map(|u| u.email.clone()).filter(|e| !e.is_empty()))
        .unwrap_or_else(|| email.to_string());

    let display_name = claims
        .name
        .or_else(|| body.and_then(|u| u.display_name.clone()))
        .unwrap_or_else(|| local_part(&email).to_string());

    User {
        id,
        email,
        display_name: Some(display_name),
    }
}

/// Build the user for a restored session: token claims first, then the
/// stored record field by field.
fn user_from_stored(stored: &StoredSession) -> User {
    let claims = decode_claims(&stored.token);
    let email = claims.email.unwrap_or_else(|| stored.user.email.clone());
    let display_name = claims
        .name
        .or_else(|| stored.user.display_name.clone())
        .unwrap_or_else(|| local_part(&email).to_string());

    User {
        id: claims.subject.unwrap_or_else(|| stored.user.id.clone()),
        email,
        display_name: Some(display_name),
    }
}

/// Claims are best effort; an undecodable token yields no claims.
fn decode_claims(token: &str) -> TokenPayload {
    token::decode(token).unwrap_or_else(|e| {
        debug!(error = %e, "Token payload not decodable, using fallback identity");
        TokenPayload::default()
    })
}
