//! Process-local backend.
//!
//! Accounts, sessions and profile rows live in memory. Passwords are hashed
//! with Argon2id exactly as a hosted backend would, only with a much lighter
//! cost so demos and tests stay fast. Fault injection hooks let tests drive
//! the failure and race paths of the session store.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{RwLock, broadcast, watch};
use tracing::{debug, instrument};
use uuid::Uuid;

use amber_eats_core::{Email, IdentityId};

use super::{
    AuthUser, Backend, BackendError, Session, SessionEvent, SessionEventKind, SignUpMetadata,
    SignUpOutcome, UserMetadata,
};
use crate::profile::ProfileRecord;

const EVENT_CAPACITY: usize = 16;
const DEFAULT_SESSION_TTL_SECS: i64 = 3_600;

/// In-memory [`Backend`].
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct InMemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    accounts: RwLock<HashMap<Email, Account>>,
    profiles: RwLock<HashMap<IdentityId, ProfileRecord>>,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
    session_ttl: Duration,
    fail_fetches: AtomicBool,
    fail_writes: AtomicBool,
    fetch_gate: watch::Sender<bool>,
    fetch_count: AtomicUsize,
}

struct Account {
    user: AuthUser,
    password_hash: String,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// An empty backend issuing one-hour sessions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_session_ttl(Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }

    /// An empty backend issuing sessions that live for `ttl`.
    #[must_use]
    pub fn with_session_ttl(ttl: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (fetch_gate, _) = watch::channel(true);

        Self {
            inner: Arc::new(MemoryInner {
                accounts: RwLock::new(HashMap::new()),
                profiles: RwLock::new(HashMap::new()),
                session: RwLock::new(None),
                events,
                session_ttl: ttl,
                fail_fetches: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                fetch_gate,
                fetch_count: AtomicUsize::new(0),
            }),
        }
    }

    // =========================================================================
    // Fault Injection
    // =========================================================================

    /// Make every profile fetch fail with [`BackendError::Unavailable`].
    pub fn fail_profile_fetches(&self, fail: bool) {
        self.inner.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make every profile upsert fail with [`BackendError::Unavailable`].
    pub fn fail_profile_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Park profile fetches until [`Self::release_profile_fetches`].
    pub fn hold_profile_fetches(&self) {
        self.inner.fetch_gate.send_replace(false);
    }

    /// Let parked and future profile fetches proceed.
    pub fn release_profile_fetches(&self) {
        self.inner.fetch_gate.send_replace(true);
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Number of profile fetches started so far.
    #[must_use]
    pub fn profile_fetch_count(&self) -> usize {
        self.inner.fetch_count.load(Ordering::SeqCst)
    }

    /// The stored profile row for `id`.
    pub async fn profile_record(&self, id: &IdentityId) -> Option<ProfileRecord> {
        self.inner.profiles.read().await.get(id).cloned()
    }

    /// Store a profile row directly, replacing any existing one.
    pub async fn insert_profile(&self, record: ProfileRecord) {
        self.inner
            .profiles
            .write()
            .await
            .insert(record.id.clone(), record);
    }

    /// Push a session event to all subscribers.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.inner.events.send(event);
    }

    /// Force the cached session's access token to be expired.
    pub async fn expire_session(&self) {
        if let Some(session) = self.inner.session.write().await.as_mut() {
            session.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn issue_session(&self, user: AuthUser) -> Session {
        Session {
            access_token: SecretString::from(Uuid::new_v4().simple().to_string()),
            refresh_token: SecretString::from(Uuid::new_v4().simple().to_string()),
            expires_at: Utc::now() + self.inner.session_ttl,
            user,
        }
    }

    async fn start_session(&self, user: AuthUser, kind: SessionEventKind) -> Session {
        let session = self.issue_session(user);
        *self.inner.session.write().await = Some(session.clone());
        self.emit(SessionEvent::new(kind, Some(session.clone())));
        session
    }

    async fn wait_for_fetch_gate(&self) -> Result<(), BackendError> {
        let mut gate = self.inner.fetch_gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map(|_| ())
            .map_err(|_| BackendError::Unavailable("fetch gate closed".to_string()))
    }
}

/// Argon2id with the smallest parameters the crate accepts.
fn hasher() -> Result<Argon2<'static>, BackendError> {
    let params = Params::new(Params::MIN_M_COST, 1, 1, None)
        .map_err(|e| BackendError::Unavailable(format!("argon2 parameters: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn hash_password(password: &SecretString) -> Result<String, BackendError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Unavailable(format!("password hashing failed: {e}")))
}

fn verify_password(password: &SecretString, hash: &str) -> Result<(), BackendError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| BackendError::InvalidCredentials)?;

    hasher()?
        .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
        .map_err(|_| BackendError::InvalidCredentials)
}

impl Backend for InMemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let cached = self.inner.session.read().await.clone();
        match cached {
            Some(session) if session.is_expired(Utc::now()) => {
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, BackendError> {
        let user = {
            let accounts = self.inner.accounts.read().await;
            let account = accounts.get(email).ok_or(BackendError::InvalidCredentials)?;
            verify_password(password, &account.password_hash)?;
            account.user.clone()
        };

        Ok(self.start_session(user, SessionEventKind::SignedIn).await)
    }

    #[instrument(skip(self, password, metadata), fields(email = %email))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, BackendError> {
        let password_hash = hash_password(password)?;

        let user = {
            let mut accounts = self.inner.accounts.write().await;
            if accounts.contains_key(email) {
                return Err(BackendError::Conflict("User already registered".to_string()));
            }

            let user = AuthUser {
                id: IdentityId::new(Uuid::new_v4().to_string()),
                email: email.clone(),
                phone: None,
                avatar_url: None,
                metadata: UserMetadata::from(metadata),
            };
            accounts.insert(
                email.clone(),
                Account {
                    user: user.clone(),
                    password_hash,
                },
            );
            user
        };
        debug!(user_id = %user.id, "Account created");

        let session = self.start_session(user.clone(), SessionEventKind::SignedIn).await;
        Ok(SignUpOutcome {
            user,
            session: Some(session),
        })
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if self.inner.session.write().await.take().is_some() {
            self.emit(SessionEvent::signed_out());
        }
        Ok(())
    }

    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let user = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.user.clone())
            .ok_or(BackendError::NoSession)?;

        Ok(self
            .start_session(user, SessionEventKind::TokenRefreshed)
            .await)
    }

    async fn fetch_profile(&self, id: &IdentityId) -> Result<Option<ProfileRecord>, BackendError> {
        self.inner.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.wait_for_fetch_gate().await?;

        if self.inner.fail_fetches.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "profile fetch failed (injected)".to_string(),
            ));
        }

        Ok(self.inner.profiles.read().await.get(id).cloned())
    }

    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<(), BackendError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "profile write failed (injected)".to_string(),
            ));
        }

        let mut profiles = self.inner.profiles.write().await;
        match profiles.get_mut(&record.id) {
            Some(existing) => existing.fields.overlay(record.fields.clone()),
            None => {
                profiles.insert(record.id.clone(), record.clone());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    fn password(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password(&password("correct horse")).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password(&password("correct horse"), &hash).is_ok());
        assert!(matches!(
            verify_password(&password("wrong horse"), &hash),
            Err(BackendError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = InMemoryBackend::new();
        let outcome = backend
            .sign_up(&email("a@b.com"), &password("hunter22!"), &SignUpMetadata::default())
            .await
            .unwrap();
        assert!(outcome.session.is_some());

        let session = backend
            .sign_in_with_password(&email("A@B.com"), &password("hunter22!"))
            .await
            .unwrap();
        assert_eq!(session.user.id, outcome.user.id);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_conflicts() {
        let backend = InMemoryBackend::new();
        let meta = SignUpMetadata::default();
        backend
            .sign_up(&email("a@b.com"), &password("hunter22!"), &meta)
            .await
            .unwrap();
        let err = backend
            .sign_up(&email("a@b.com"), &password("other-pass"), &meta)
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let backend = InMemoryBackend::new();
        backend
            .sign_up(&email("a@b.com"), &password("hunter22!"), &SignUpMetadata::default())
            .await
            .unwrap();
        let err = backend
            .sign_in_with_password(&email("a@b.com"), &password("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let backend = InMemoryBackend::new();
        let mut events = backend.subscribe();

        backend
            .sign_up(&email("a@b.com"), &password("hunter22!"), &SignUpMetadata::default())
            .await
            .unwrap();
        backend.sign_out().await.unwrap();

        assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::SignedIn);
        assert_eq!(events.recv().await.unwrap().kind, SessionEventKind::SignedOut);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_on_read() {
        let backend = InMemoryBackend::new();
        backend
            .sign_up(&email("a@b.com"), &password("hunter22!"), &SignUpMetadata::default())
            .await
            .unwrap();
        backend.expire_session().await;

        let session = backend.get_session().await.unwrap().unwrap();
        assert!(!session.is_expired(Utc::now()));
    }

    #[tokio::test]
    async fn test_upsert_merges_existing_row() {
        let backend = InMemoryBackend::new();
        let id = IdentityId::new("u1");

        let mut first = ProfileRecord::new(id.clone());
        first.fields.name = Some("A".to_string());
        first.fields.phone = Some("+1".to_string());
        backend.upsert_profile(&first).await.unwrap();

        let mut second = ProfileRecord::new(id.clone());
        second.fields.name = Some("B".to_string());
        backend.upsert_profile(&second).await.unwrap();

        let stored = backend.profile_record(&id).await.unwrap();
        assert_eq!(stored.fields.name.as_deref(), Some("B"));
        assert_eq!(stored.fields.phone.as_deref(), Some("+1"));
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let backend = InMemoryBackend::new();
        let id = IdentityId::new("u1");

        backend.fail_profile_fetches(true);
        assert!(backend.fetch_profile(&id).await.is_err());
        backend.fail_profile_fetches(false);
        assert!(backend.fetch_profile(&id).await.unwrap().is_none());

        backend.fail_profile_writes(true);
        assert!(backend.upsert_profile(&ProfileRecord::new(id)).await.is_err());
        assert_eq!(backend.profile_fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_held_fetch_waits_for_release() {
        let backend = InMemoryBackend::new();
        backend.hold_profile_fetches();

        let fetch = tokio::spawn({
            let backend = backend.clone();
            async move { backend.fetch_profile(&IdentityId::new("u1")).await }
        });
        tokio::task::yield_now().await;
        assert!(!fetch.is_finished());

        backend.release_profile_fetches();
        assert!(fetch.await.unwrap().unwrap().is_none());
    }
}
