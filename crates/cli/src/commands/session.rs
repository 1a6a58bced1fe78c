//! Session commands against the hosted backend.
//!
//! # Usage
//!
//! ```bash
//! ae-cli session sign-in -e maria@example.com -p 'correct horse'
//! ae-cli session sign-up -e ana@example.com -p 'correct horse' -n Ana -r courier
//! ```
//!
//! # Environment Variables
//!
//! - `AMBER_BACKEND_URL` - Base URL of the hosted backend
//! - `AMBER_BACKEND_ANON_KEY` - Public API key for the backend project
//! - `AMBER_WELCOME_POINTS` - Points granted to new clients (optional)

use amber_eats_core::{Role, UnknownValueError};
use amber_eats_identity::backend::SignUpMetadata;
use amber_eats_identity::{
    AuthError, AuthState, ConfigError, IdentityConfig, RestBackend, SessionStore,
};
use secrecy::SecretString;
use thiserror::Error;

use super::print_json;

/// Errors that can occur during session commands.
#[derive(Debug, Error)]
pub enum SessionCommandError {
    /// Backend configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid role.
    #[error("{0}. Valid roles: client, restaurant, courier, admin")]
    InvalidRole(#[from] UnknownValueError),

    /// Sign-in or sign-up failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The backend issued no session, usually because the email needs
    /// confirming first.
    #[error("No session issued for {0}; confirm the email address and sign in")]
    PendingConfirmation(String),

    /// Output could not be serialized.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

fn connect() -> Result<SessionStore<RestBackend>, ConfigError> {
    let config = IdentityConfig::from_env()?;
    tracing::info!("Using backend at {}", config.backend.base_url);
    Ok(SessionStore::new(
        RestBackend::new(&config.backend),
        config.session,
    ))
}

fn print_profile(email: &str, state: &AuthState) -> Result<(), SessionCommandError> {
    match state.profile() {
        Some(profile) => {
            tracing::info!("Signed in as {} ({})", profile.name(), profile.role());
            print_json(profile)?;
            Ok(())
        }
        None => Err(SessionCommandError::PendingConfirmation(email.to_owned())),
    }
}

/// Sign in and print the hydrated profile.
pub async fn sign_in(email: &str, password: String) -> Result<(), SessionCommandError> {
    let store = connect()?;
    let password = SecretString::from(password);

    let state = store.sign_in_with_email(email, &password).await?;
    print_profile(email, &state)
}

/// Create an account and print the hydrated profile.
pub async fn sign_up(
    email: &str,
    password: String,
    name: Option<String>,
    role: &str,
) -> Result<(), SessionCommandError> {
    let role: Role = role.parse()?;
    let store = connect()?;
    let password = SecretString::from(password);

    let metadata = SignUpMetadata {
        name,
        phone: None,
        role,
    };
    let state = store.sign_up_with_email(email, &password, metadata).await?;
    print_profile(email, &state)
}
