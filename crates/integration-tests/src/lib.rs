//! Integration tests for the `AmberEats` identity core.
//!
//! Every test runs against [`InMemoryBackend`], so no network or database is
//! needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p amber-eats-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_flows` - Sign-up, sign-in, hydration fallbacks, profile updates
//!   and the sign-out race
//! - `role_switch` - Demo role switching through the session store
//! - `loyalty_flows` - Point awards, tiers, cashback and concurrent writers

#![cfg_attr(not(test), forbid(unsafe_code))]

use amber_eats_core::Role;
use amber_eats_identity::backend::SignUpMetadata;
use amber_eats_identity::{AuthError, InMemoryBackend, SessionConfig, SessionStore};
use secrecy::SecretString;

/// Password accepted by every helper account.
pub const TEST_PASSWORD: &str = "amber-tikka-masala";

/// A store over a fresh in-memory backend, with the default welcome points.
#[must_use]
pub fn test_store() -> SessionStore<InMemoryBackend> {
    SessionStore::new(InMemoryBackend::new(), SessionConfig::default())
}

/// The helper password as a secret.
#[must_use]
pub fn password() -> SecretString {
    SecretString::from(TEST_PASSWORD)
}

/// Sign-up metadata with a display name.
#[must_use]
pub fn metadata(name: &str, role: Role) -> SignUpMetadata {
    SignUpMetadata {
        name: Some(name.to_owned()),
        phone: None,
        role,
    }
}

/// Create an account and leave it signed in.
///
/// # Errors
///
/// Returns the store's `AuthError` if sign-up fails.
pub async fn sign_up(
    store: &SessionStore<InMemoryBackend>,
    email: &str,
    name: &str,
    role: Role,
) -> Result<(), AuthError> {
    store
        .sign_up_with_email(email, &password(), metadata(name, role))
        .await
        .map(|_| ())
}
