//! HTTP adapter for the hosted backend.
//!
//! Auth goes through `/auth/v1/*` and profile rows through the REST table
//! interface at `/rest/v1/{table}`. Every request carries the project's anon
//! key in the `apikey` header; authenticated requests add the session's
//! access token as a bearer token.

use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, instrument, warn};

use amber_eats_core::{Email, IdentityId};

use super::{
    AuthUser, Backend, BackendError, Session, SessionEvent, SessionEventKind, SignUpMetadata,
    SignUpOutcome, UserMetadata,
};
use crate::config::BackendConfig;
use crate::profile::ProfileRecord;

const EVENT_CAPACITY: usize = 16;
const USER_AGENT: &str = concat!("amber-eats-identity/", env!("CARGO_PKG_VERSION"));

/// Backend client over HTTP.
///
/// Cheap to clone; clones share the HTTP client, the cached session and the
/// event channel.
#[derive(Clone)]
pub struct RestBackend {
    inner: Arc<RestBackendInner>,
}

struct RestBackendInner {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
    profiles_table: String,
    session: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: UserMetadata,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    user_metadata: WireMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMetadata {
    name: Option<String>,
    phone: Option<String>,
    role: Option<String>,
    avatar_url: Option<String>,
}

/// Sign-up answers with a session when email confirmation is disabled and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    User(WireUser),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorBody {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl ErrorBody {
    fn message(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.message.clone())
            .or_else(|| self.error.clone())
    }

    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<WireUser> for AuthUser {
    type Error = BackendError;

    fn try_from(user: WireUser) -> Result<Self, Self::Error> {
        let email = user
            .email
            .as_deref()
            .ok_or_else(|| BackendError::InvalidResponse("user has no email".to_string()))
            .and_then(|e| {
                Email::parse(e).map_err(|err| BackendError::InvalidResponse(err.to_string()))
            })?;

        Ok(Self {
            id: IdentityId::new(user.id),
            email,
            phone: non_blank(user.phone),
            avatar_url: non_blank(user.user_metadata.avatar_url),
            metadata: UserMetadata {
                name: non_blank(user.user_metadata.name),
                phone: non_blank(user.user_metadata.phone),
                role: non_blank(user.user_metadata.role),
            },
        })
    }
}

impl TryFrom<TokenResponse> for Session {
    type Error = BackendError;

    fn try_from(token: TokenResponse) -> Result<Self, Self::Error> {
        Ok(Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: SecretString::from(token.refresh_token),
            expires_at: Utc::now() + Duration::seconds(token.expires_in.max(0)),
            user: AuthUser::try_from(token.user)?,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

impl RestBackend {
    /// Create a client for the configured backend project.
    #[must_use]
    pub fn new(config: &BackendConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(RestBackendInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                anon_key: config.anon_key.clone(),
                profiles_table: config.profiles_table.clone(),
                session: RwLock::new(None),
                events,
            }),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.inner.base_url)
    }

    fn emit(&self, kind: SessionEventKind, session: Option<Session>) {
        // No receivers is fine.
        let _ = self.inner.events.send(SessionEvent::new(kind, session));
    }

    /// Bearer token for data requests: the session's access token when signed
    /// in, the anon key otherwise.
    async fn bearer(&self) -> String {
        self.inner.session.read().await.as_ref().map_or_else(
            || self.inner.anon_key.expose_secret().to_string(),
            |s| s.access_token.expose_secret().to_string(),
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, self.endpoint(path))
            .header("apikey", self.inner.anon_key.expose_secret())
            .header("User-Agent", USER_AGENT)
    }

    async fn token_request<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<Session, BackendError> {
        let response = self
            .request(reqwest::Method::POST, "auth/v1/token")
            .query(&[("grant_type", grant_type)])
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        let token: TokenResponse = response.json().await?;
        let session = Session::try_from(token)?;

        *self.inner.session.write().await = Some(session.clone());
        Ok(session)
    }
}

/// Map a non-success response to a [`BackendError`].
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.message().unwrap_or(text);

    Err(match (status, body.code()) {
        (StatusCode::BAD_REQUEST, Some("invalid_grant" | "invalid_credentials")) => {
            BackendError::InvalidCredentials
        }
        (_, Some("user_already_exists" | "email_exists")) | (StatusCode::CONFLICT, _) => {
            BackendError::Conflict(message)
        }
        (StatusCode::UNPROCESSABLE_ENTITY, _) if message.contains("already registered") => {
            BackendError::Conflict(message)
        }
        (StatusCode::TOO_MANY_REQUESTS, _) => BackendError::Unavailable(message),
        (s, _) if s.is_server_error() => BackendError::Unavailable(message),
        (s, _) => BackendError::Api {
            status: s.as_u16(),
            message,
        },
    })
}

impl Backend for RestBackend {
    #[instrument(skip(self))]
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let cached = self.inner.session.read().await.clone();

        match cached {
            Some(session) if session.is_expired(Utc::now()) => {
                debug!(user_id = %session.user.id, "Cached session expired, refreshing");
                match self.refresh_session().await {
                    Ok(session) => Ok(Some(session)),
                    Err(e) => {
                        warn!(error = %e, "Session refresh failed, dropping session");
                        *self.inner.session.write().await = None;
                        self.emit(SessionEventKind::SignedOut, None);
                        Ok(None)
                    }
                }
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
        let grant = PasswordGrant {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let session = self.token_request("password", &grant).await?;

        self.emit(SessionEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self, password, metadata), fields(email = %email, role = %metadata.role))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        metadata: &SignUpMetadata,
    ) -> Result<SignUpOutcome, BackendError> {
        let request = SignUpRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            data: UserMetadata::from(metadata),
        };

        let response = self
            .request(reqwest::Method::POST, "auth/v1/signup")
            .json(&request)
            .send()
            .await?;
        let response = check_status(response).await?;

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(token) => {
                let session = Session::try_from(token)?;
                *self.inner.session.write().await = Some(session.clone());
                self.emit(SessionEventKind::SignedIn, Some(session.clone()));
                Ok(SignUpOutcome {
                    user: session.user.clone(),
                    session: Some(session),
                })
            }
            SignUpResponse::User(user) => {
                debug!("Sign-up pending email confirmation");
                Ok(SignUpOutcome {
                    user: AuthUser::try_from(user)?,
                    session: None,
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.inner.session.write().await.take() else {
            return Ok(());
        };
        self.emit(SessionEventKind::SignedOut, None);

        let response = self
            .request(reqwest::Method::POST, "auth/v1/logout")
            .bearer_auth(session.access_token.expose_secret())
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .inner
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(BackendError::NoSession)?;

        let grant = RefreshGrant {
            refresh_token: refresh_token.expose_secret(),
        };
        let session = self.token_request("refresh_token", &grant).await?;

        self.emit(SessionEventKind::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn fetch_profile(&self, id: &IdentityId) -> Result<Option<ProfileRecord>, BackendError> {
        let bearer = self.bearer().await;
        let path = format!("rest/v1/{}", self.inner.profiles_table);

        let response = self
            .request(reqwest::Method::GET, &path)
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
            .bearer_auth(bearer)
            .send()
            .await?;
        let response = check_status(response).await?;

        let mut rows: Vec<ProfileRecord> = response.json().await?;
        if rows.len() > 1 {
            warn!(rows = rows.len(), "Multiple profile rows for one identity, using the first");
        }
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    #[instrument(skip(self, record), fields(id = %record.id))]
    async fn upsert_profile(&self, record: &ProfileRecord) -> Result<(), BackendError> {
        let bearer = self.bearer().await;
        let path = format!("rest/v1/{}", self.inner.profiles_table);

        let response = self
            .request(reqwest::Method::POST, &path)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(bearer)
            .json(record)
            .send()
            .await?;
        check_status(response).await?;

        Ok(())
    }
}
