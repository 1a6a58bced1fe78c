//! Backend-as-a-service contract.
//!
//! The identity core needs three things from its hosted backend: session
//! issuance and refresh, a stream of session changes, and a keyed record store
//! for profiles. [`Backend`] captures exactly that; [`RestBackend`] talks to a
//! hosted project over HTTP and [`InMemoryBackend`] keeps everything in
//! process for the CLI demo and tests.

mod memory;
mod rest;
mod types;

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;
use tokio::sync::broadcast;

use amber_eats_core::{Email, IdentityId};

use crate::profile::ProfileRecord;

pub use memory::InMemoryBackend;
pub use rest::RestBackend;
pub use types::{
    AuthUser, Session, SessionEvent, SessionEventKind, SignUpMetadata, SignUpOutcome, UserMetadata,
};

/// Errors returned by a [`Backend`].
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Email/password pair was rejected.
    #[error("Invalid login credentials")]
    InvalidCredentials,

    /// The resource already exists (e.g. a registered email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Non-success status with a message from the backend.
    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The operation needs a session and none is active.
    #[error("No active session")]
    NoSession,

    /// The backend answered with something we could not interpret.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The backend refused to serve the request right now.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Operations the identity core consumes from its backend.
///
/// Futures are `Send` so a [`crate::session::SessionStore`] can drive them
/// from spawned tasks.
pub trait Backend: Send + Sync + 'static {
    /// The current session, if any. Implementations may refresh an expired
    /// session before answering.
    fn get_session(&self)
    -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    /// Subscribe to session changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;

    /// Authenticate with email and password.
    fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> impl Future<Output = Result<Session, BackendError>> + Send;

    /// Register a new identity with attached metadata.
    fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &SignUpMetadata,
    ) -> impl Future<Output = Result<SignUpOutcome, BackendError>> + Send;

    /// Invalidate the current session.
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Exchange the current refresh token for a new session.
    fn refresh_session(&self) -> impl Future<Output = Result<Session, BackendError>> + Send;

    /// Look up the profile record keyed by `id`. `Ok(None)` means "not found".
    fn fetch_profile(
        &self,
        id: &IdentityId,
    ) -> impl Future<Output = Result<Option<ProfileRecord>, BackendError>> + Send;

    /// Insert or merge a profile record keyed by its id.
    fn upsert_profile(
        &self,
        record: &ProfileRecord,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;
}
