//! Identity and session types exchanged with the backend.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use amber_eats_core::{Email, IdentityId, Role};

/// Free-form metadata attached to an identity at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Requested role tag, kept raw so unknown tags survive a round trip.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// The backend-authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: IdentityId,
    pub email: Email,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub metadata: UserMetadata,
}

impl AuthUser {
    /// Name to show for this identity: the sign-up name, or the email's
    /// local part when none was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.metadata
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map_or_else(|| self.email.local_part().to_string(), str::to_string)
    }

    /// Phone on the identity, falling back to the one given at sign-up.
    #[must_use]
    pub fn contact_phone(&self) -> Option<String> {
        self.phone.clone().or_else(|| self.metadata.phone.clone())
    }
}

/// An issued session.
///
/// Tokens are wrapped in [`SecretString`] so they never show up in logs.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Why the backend emitted a [`SessionEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// A change in authentication state pushed by the backend.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub kind: SessionEventKind,
    pub session: Option<Session>,
}

impl SessionEvent {
    #[must_use]
    pub const fn new(kind: SessionEventKind, session: Option<Session>) -> Self {
        Self { kind, session }
    }

    #[must_use]
    pub const fn signed_out() -> Self {
        Self {
            kind: SessionEventKind::SignedOut,
            session: None,
        }
    }
}

/// Metadata supplied by the caller of sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignUpMetadata {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

impl From<&SignUpMetadata> for UserMetadata {
    fn from(meta: &SignUpMetadata) -> Self {
        Self {
            name: meta.name.clone(),
            phone: meta.phone.clone(),
            role: Some(meta.role.as_str().to_string()),
        }
    }
}

/// Result of a successful sign-up.
///
/// `session` is `None` when the backend requires email confirmation before
/// issuing a session.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<Session>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(name: Option<&str>) -> AuthUser {
        AuthUser {
            id: IdentityId::new("u1"),
            email: Email::parse("maria.lopez@example.com").unwrap(),
            phone: None,
            avatar_url: None,
            metadata: UserMetadata {
                name: name.map(str::to_string),
                phone: Some("+15550100".to_string()),
                role: None,
            },
        }
    }

    #[test]
    fn test_display_name_prefers_metadata() {
        assert_eq!(user(Some("Maria")).display_name(), "Maria");
    }

    #[test]
    fn test_display_name_falls_back_to_email_prefix() {
        assert_eq!(user(None).display_name(), "maria.lopez");
        assert_eq!(user(Some("   ")).display_name(), "maria.lopez");
    }

    #[test]
    fn test_contact_phone_falls_back_to_metadata() {
        assert_eq!(user(None).contact_phone().as_deref(), Some("+15550100"));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            access_token: SecretString::from("a"),
            refresh_token: SecretString::from("r"),
            expires_at: now,
            user: user(None),
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_session_debug_hides_tokens() {
        let session = Session {
            access_token: SecretString::from("very-secret-access"),
            refresh_token: SecretString::from("very-secret-refresh"),
            expires_at: Utc::now(),
            user: user(None),
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("very-secret-access"));
        assert!(!debug.contains("very-secret-refresh"));
    }

    #[test]
    fn test_sign_up_metadata_carries_role_tag() {
        let meta = SignUpMetadata {
            role: Role::Courier,
            ..SignUpMetadata::default()
        };
        assert_eq!(UserMetadata::from(&meta).role.as_deref(), Some("courier"));
    }
}
