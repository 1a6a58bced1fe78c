//! Session store error types.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors from sign-in, sign-up and sign-out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] amber_eats_core::EmailError),

    /// Wrong password or unknown account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Network or backend failure.
    #[error("backend error: {0}")]
    Backend(BackendError),
}

impl From<BackendError> for AuthError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::InvalidCredentials => Self::InvalidCredentials,
            BackendError::Conflict(_) => Self::UserAlreadyExists,
            other => Self::Backend(other),
        }
    }
}

/// Errors from profile operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// No identity is signed in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// No profile is loaded yet.
    #[error("no profile loaded")]
    NoProfile,

    /// The backend rejected the profile write. The local profile was still
    /// updated.
    #[error("profile write failed: {0}")]
    Write(#[source] BackendError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_auth_errors() {
        assert!(matches!(
            AuthError::from(BackendError::InvalidCredentials),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            AuthError::from(BackendError::Conflict("taken".to_string())),
            AuthError::UserAlreadyExists
        ));
        assert!(matches!(
            AuthError::from(BackendError::NoSession),
            AuthError::Backend(BackendError::NoSession)
        ));
    }
}
