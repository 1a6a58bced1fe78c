//! The session store.
//!
//! [`SessionStore`] owns the signed-in identity and its active profile. It is
//! constructed explicitly at application start and passed around by handle;
//! clones share the same state.
//!
//! # Hydration
//!
//! Whenever a session with an identity appears, the store fetches the
//! identity's profile record and resolves it. A missing record, or a fetch
//! that fails for any other reason, yields a synthesized default client
//! profile, so a signed-in user always ends up with a usable profile.
//!
//! Every sign-out and every hydration start bumps an epoch counter. A
//! hydration only commits its result if the epoch is unchanged, so a slow
//! fetch that completes after a sign-out is discarded instead of
//! repopulating the state.

mod error;
mod state;

pub use error::{AuthError, ProfileError};
pub use state::AuthState;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use amber_eats_core::Email;

use crate::backend::{AuthUser, Backend, SessionEvent, SessionEventKind, SignUpMetadata};
use crate::config::SessionConfig;
use crate::profile::{self, Profile, ProfilePatch, ProfileRecord};

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Handle to the identity, profile and lifecycle of the current user.
pub struct SessionStore<B: Backend> {
    inner: Arc<StoreInner<B>>,
}

impl<B: Backend> Clone for SessionStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct StoreInner<B> {
    backend: B,
    config: SessionConfig,
    state: watch::Sender<AuthState>,
    epoch: AtomicU64,
}

impl<B: Backend> SessionStore<B> {
    /// Create a store in the `Unauthenticated` state.
    #[must_use]
    pub fn new(backend: B, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);

        Self {
            inner: Arc::new(StoreInner {
                backend,
                config,
                state,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// The backend this store talks to.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// A snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<AuthUser> {
        self.inner.state.borrow().identity().cloned()
    }

    /// The active profile, if hydrated.
    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.inner.state.borrow().profile().cloned()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Pick up an existing backend session, e.g. at application start.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the session lookup fails.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<AuthState, AuthError> {
        match self.inner.backend.get_session().await? {
            Some(session) => {
                self.hydrate(session.user).await;
            }
            None => debug!("No session to restore"),
        }
        Ok(self.state())
    }

    /// Sign in with email and password, then hydrate the profile.
    ///
    /// On failure the state is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::Backend` on network or backend failures.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_email(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthState, AuthError> {
        let email = Email::parse(email)?;

        let session = self
            .inner
            .backend
            .sign_in_with_password(&email, password)
            .await?;
        info!(user_id = %session.user.id, "Signed in");

        self.hydrate(session.user).await;
        Ok(self.state())
    }

    /// Create an account and write its initial profile record.
    ///
    /// Clients start with the configured welcome points and a fresh referral
    /// code. A failed profile write is logged and does not fail the sign-up;
    /// hydration falls back to a synthesized profile. If the backend issues a
    /// session right away, the new profile is hydrated before returning.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    /// Returns `AuthError::Backend` on network or backend failures.
    #[instrument(skip(self, password, metadata), fields(role = %metadata.role))]
    pub async fn sign_up_with_email(
        &self,
        email: &str,
        password: &SecretString,
        metadata: SignUpMetadata,
    ) -> Result<AuthState, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let outcome = self
            .inner
            .backend
            .sign_up(&email, password, &metadata)
            .await?;
        info!(user_id = %outcome.user.id, "Account created");

        let record =
            profile::initial_record(&outcome.user, metadata.role, self.inner.config.welcome_points);
        if let Err(e) = self.inner.backend.upsert_profile(&record).await {
            warn!(user_id = %outcome.user.id, error = %e, "Failed to write initial profile");
        }

        if let Some(session) = outcome.session {
            self.hydrate(session.user).await;
        } else {
            debug!("No session issued at sign-up, awaiting confirmation");
        }
        Ok(self.state())
    }

    /// Sign out.
    ///
    /// Local state is cleared first, so the store is `Unauthenticated` even if
    /// the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Backend` if the backend could not invalidate the
    /// session.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.clear();
        self.inner
            .backend
            .sign_out()
            .await
            .map_err(AuthError::Backend)?;
        info!("Signed out");
        Ok(())
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Merge a partial update into the active profile and write the fields it
    /// changed to the backend.
    ///
    /// The patch's `role` is ignored. The stored row receives the merged
    /// values, so a derived tier or a rejected referral code matches what
    /// the profile shows. The local merge happens even when the backend write
    /// fails; the failure is still returned.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotAuthenticated` if nobody is signed in.
    /// Returns `ProfileError::NoProfile` if hydration has not finished.
    /// Returns `ProfileError::Write` if the backend rejected the write.
    #[instrument(skip(self, patch))]
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<Profile, ProfileError> {
        let (identity, current) = match self.state() {
            AuthState::Unauthenticated => return Err(ProfileError::NotAuthenticated),
            AuthState::Authenticating { .. } => return Err(ProfileError::NoProfile),
            AuthState::Authenticated { identity, profile } => (identity, profile),
        };
        let epoch = self.inner.epoch.load(Ordering::SeqCst);

        let mut patch = patch;
        patch.role = None;
        patch.updated_at = Some(Utc::now());

        let next = profile::merge(&current, patch.clone());
        let record = ProfileRecord {
            id: identity.id.clone(),
            fields: next
                .to_record()
                .fields
                .changed_from(&current.to_record().fields),
        };
        let write = self.inner.backend.upsert_profile(&record).await;

        let mut merged = None;
        self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            let AuthState::Authenticated { profile, .. } = state else {
                return false;
            };
            *profile = profile::merge(profile, patch.clone());
            merged = Some(profile.clone());
            true
        });
        let merged = merged.unwrap_or_else(|| {
            debug!(user_id = %identity.id, "Session changed during profile update, skipping local merge");
            next
        });

        match write {
            Ok(()) => Ok(merged),
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "Profile write failed, local profile updated anyway");
                Err(ProfileError::Write(e))
            }
        }
    }

    /// Replace the active profile with a seeded profile of `role`, keeping
    /// its base fields. The backend is not contacted.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NoProfile` if no profile is loaded.
    #[cfg(feature = "demo")]
    pub fn switch_role_for_demo(
        &self,
        role: amber_eats_core::Role,
    ) -> Result<Profile, ProfileError> {
        let mut switched = None;
        self.inner.state.send_if_modified(|state| match state {
            AuthState::Authenticated { profile, .. } => {
                *profile = profile::demo::switch_role(profile, role);
                switched = Some(profile.clone());
                true
            }
            _ => false,
        });

        let profile = switched.ok_or(ProfileError::NoProfile)?;
        info!(user_id = %profile.id(), role = %role, "Switched role (demo)");
        Ok(profile)
    }

    // =========================================================================
    // Backend Events
    // =========================================================================

    /// Apply a session event pushed by the backend.
    pub async fn handle_event(&self, event: SessionEvent) {
        debug!(kind = ?event.kind, "Session event");

        match (event.kind, event.session) {
            (SessionEventKind::SignedOut, _) | (_, None) => {
                if self.identity().is_some() {
                    info!("Session ended by backend");
                    self.clear();
                }
            }
            (SessionEventKind::TokenRefreshed, Some(session)) => {
                if !self.replace_identity(session.user) {
                    debug!("Refreshed session belongs to another identity, ignoring");
                }
            }
            (
                SessionEventKind::InitialSession
                | SessionEventKind::SignedIn
                | SessionEventKind::UserUpdated,
                Some(session),
            ) => {
                let same_identity = self
                    .identity()
                    .is_some_and(|current| current.id == session.user.id);
                if same_identity {
                    self.replace_identity(session.user);
                } else {
                    self.hydrate(session.user).await;
                }
            }
        }
    }

    /// Apply backend session events in a background task.
    ///
    /// The task ends when the store is dropped or the backend closes its
    /// event stream; abort the handle to stop it earlier.
    #[must_use]
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut events = self.inner.backend.subscribe();
        let store: Weak<StoreInner<B>> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Session listener lagged behind backend events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let Some(inner) = store.upgrade() else {
                    break;
                };
                Self { inner }.handle_event(event).await;
            }
            debug!("Session listener stopped");
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Resolve and commit the profile for `identity`, unless the session
    /// changes while the record is being fetched.
    async fn hydrate(&self, identity: AuthUser) -> bool {
        let mut epoch = 0;
        self.inner.state.send_modify(|state| {
            epoch = self.inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            *state = AuthState::Authenticating {
                identity: identity.clone(),
            };
        });

        let profile = self.load_profile(&identity).await;

        let committed = self.inner.state.send_if_modified(|state| {
            if self.inner.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *state = AuthState::Authenticated {
                identity: identity.clone(),
                profile: profile.clone(),
            };
            true
        });

        if committed {
            info!(user_id = %identity.id, role = %profile.role(), "Profile hydrated");
        } else {
            debug!(user_id = %identity.id, "Discarding stale profile hydration");
        }
        committed
    }

    async fn load_profile(&self, identity: &AuthUser) -> Profile {
        match self.inner.backend.fetch_profile(&identity.id).await {
            Ok(Some(record)) => {
                let role_tag = record
                    .role_tag()
                    .or(identity.metadata.role.as_deref());
                let profile = profile::resolve(&record, role_tag);
                if let Some(client) = profile.as_client()
                    && record.fields.referral_code.as_deref() != Some(client.referral_code.as_str())
                {
                    let mut fill = ProfileRecord::new(identity.id.clone());
                    fill.fields.referral_code = Some(client.referral_code.as_str().to_string());
                    self.write_back(&fill, "referral code").await;
                }
                profile
            }
            Ok(None) => {
                debug!(user_id = %identity.id, "No profile record, synthesizing default");
                let profile = profile::synthesize_default(identity);
                self.write_back(&profile.to_record(), "default profile").await;
                profile
            }
            Err(e) => {
                warn!(user_id = %identity.id, error = %e, "Profile fetch failed, using default profile");
                profile::synthesize_default(identity)
            }
        }
    }

    /// Store a value resolved during hydration. Failure only costs a
    /// different value on the next hydration.
    async fn write_back(&self, record: &ProfileRecord, what: &str) {
        match self.inner.backend.upsert_profile(record).await {
            Ok(()) => debug!(user_id = %record.id, what, "Stored resolved profile values"),
            Err(e) => warn!(user_id = %record.id, what, error = %e, "Could not store resolved profile values"),
        }
    }

    /// Drop identity and profile, invalidating in-flight hydrations.
    fn clear(&self) {
        self.inner.state.send_modify(|state| {
            self.inner.epoch.fetch_add(1, Ordering::SeqCst);
            *state = AuthState::Unauthenticated;
        });
    }

    /// Swap in fresh identity details for the same user. Returns `false` if
    /// `user` is not the current identity.
    fn replace_identity(&self, user: AuthUser) -> bool {
        let mut replaced = false;
        self.inner.state.send_if_modified(|state| {
            let current = match state {
                AuthState::Unauthenticated => return false,
                AuthState::Authenticating { identity }
                | AuthState::Authenticated { identity, .. } => identity,
            };
            if current.id != user.id {
                return false;
            }
            replaced = true;
            if *current == user {
                return false;
            }
            *current = user.clone();
            true
        });
        replaced
    }
}

/// Validate password requirements.
fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    let password = password.expose_secret();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if password.trim().is_empty() {
        return Err(AuthError::WeakPassword(
            "password must not be blank".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use amber_eats_core::Role;

    fn store() -> SessionStore<InMemoryBackend> {
        SessionStore::new(InMemoryBackend::new(), SessionConfig::default())
    }

    fn password() -> SecretString {
        SecretString::from("correct-horse")
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password(&SecretString::from("short")).is_err());
        assert!(validate_password(&SecretString::from("        ")).is_err());
        assert!(validate_password(&password()).is_ok());
    }

    #[tokio::test]
    async fn test_new_store_is_unauthenticated() {
        let store = store();
        assert_eq!(store.state(), AuthState::Unauthenticated);
        assert!(store.identity().is_none());
        assert!(store.profile().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_hydrates_client_with_welcome_points() {
        let store = store();
        let state = store
            .sign_up_with_email("maria@example.com", &password(), SignUpMetadata::default())
            .await
            .unwrap();

        let profile = state.profile().unwrap();
        let client = profile.as_client().unwrap();
        assert_eq!(client.loyalty_points, 100);
        assert_eq!(client.base.name, "maria");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_weak_password() {
        let err = store()
            .sign_up_with_email("a@b.com", &SecretString::from("123"), SignUpMetadata::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_sign_in_with_bad_email_leaves_state() {
        let store = store();
        let err = store
            .sign_in_with_email("not-an-email", &password())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
        assert_eq!(store.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_sign_out_clears_state() {
        let store = store();
        store
            .sign_up_with_email("a@b.com", &password(), SignUpMetadata::default())
            .await
            .unwrap();
        store.sign_out().await.unwrap();
        assert_eq!(store.state(), AuthState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_signed_out_event_clears_state() {
        let store = store();
        store
            .sign_up_with_email("a@b.com", &password(), SignUpMetadata::default())
            .await
            .unwrap();

        store.handle_event(SessionEvent::signed_out()).await;
        assert!(store.identity().is_none());
    }

    #[tokio::test]
    async fn test_role_from_sign_up_metadata() {
        let store = store();
        let metadata = SignUpMetadata {
            name: Some("Luigi".to_string()),
            phone: None,
            role: Role::Restaurant,
        };
        let state = store
            .sign_up_with_email("luigi@example.com", &password(), metadata)
            .await
            .unwrap();
        assert_eq!(state.profile().unwrap().role(), Role::Restaurant);
        assert_eq!(state.profile().unwrap().name(), "Luigi");
    }
}
