//! Scripted walkthrough on the in-memory backend.
//!
//! Signs up a client, signs out and back in, updates the phone number,
//! switches the profile to the requested role and signs out. Prints the
//! profile after each profile-changing step.
//!
//! # Usage
//!
//! ```bash
//! ae-cli demo --role courier
//! ```

use amber_eats_core::{Role, UnknownValueError};
use amber_eats_identity::backend::SignUpMetadata;
use amber_eats_identity::{
    AuthError, InMemoryBackend, Profile, ProfileError, ProfilePatch, SessionConfig, SessionStore,
};
use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

use super::print_json;

const DEMO_EMAIL: &str = "maria.lopez@ambereats.app";
const DEMO_PASSWORD: &str = "amber-demo-2024";
const DEMO_NAME: &str = "Maria Lopez";
const DEMO_PHONE: &str = "+1 555 0100";

/// Errors that can occur during the demo.
#[derive(Debug, Error)]
pub enum DemoError {
    /// Invalid role.
    #[error("{0}. Valid roles: client, restaurant, courier, admin")]
    InvalidRole(#[from] UnknownValueError),

    /// A session step failed.
    #[error("Session step failed: {0}")]
    Auth(#[from] AuthError),

    /// A profile step failed.
    #[error("Profile step failed: {0}")]
    Profile(#[from] ProfileError),

    /// A step finished without a hydrated profile.
    #[error("No profile after {0}")]
    MissingProfile(&'static str),

    /// Output could not be serialized.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct DemoStep<'a> {
    step: &'static str,
    profile: &'a Profile,
}

fn show(step: &'static str, profile: Option<&Profile>) -> Result<(), DemoError> {
    let profile = profile.ok_or(DemoError::MissingProfile(step))?;
    tracing::info!("{step}: {} as {}", profile.name(), profile.role());
    print_json(&DemoStep { step, profile })?;
    Ok(())
}

/// Run the walkthrough, switching to `role` near the end.
pub async fn run(role: &str) -> Result<(), DemoError> {
    let role: Role = role.parse()?;

    let store = SessionStore::new(InMemoryBackend::new(), SessionConfig::default());
    let password = SecretString::from(DEMO_PASSWORD);

    let state = store
        .sign_up_with_email(
            DEMO_EMAIL,
            &password,
            SignUpMetadata {
                name: Some(DEMO_NAME.to_owned()),
                phone: None,
                role: Role::Client,
            },
        )
        .await?;
    show("sign-up", state.profile())?;

    store.sign_out().await?;
    let state = store.sign_in_with_email(DEMO_EMAIL, &password).await?;
    show("sign-in", state.profile())?;

    let updated = store
        .update_profile(ProfilePatch {
            phone: Some(DEMO_PHONE.to_owned()),
            ..ProfilePatch::default()
        })
        .await?;
    show("update-profile", Some(&updated))?;

    let switched = store.switch_role_for_demo(role)?;
    show("switch-role", Some(&switched))?;

    store.sign_out().await?;
    tracing::info!("Signed out, authenticated: {}", store.state().is_authenticated());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_runs_for_every_role() {
        for role in Role::ALL {
            assert!(run(role.as_str()).await.is_ok(), "demo failed for {role}");
        }
    }

    #[tokio::test]
    async fn test_demo_rejects_unknown_role() {
        assert!(matches!(run("chef").await, Err(DemoError::InvalidRole(_))));
    }
}
