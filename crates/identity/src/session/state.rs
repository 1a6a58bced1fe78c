//! Observable authentication state.

use crate::backend::AuthUser;
use crate::profile::Profile;

/// Where the session store is in its lifecycle.
///
/// `Authenticating` covers the window between a successful credential check
/// and the end of profile hydration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating {
        identity: AuthUser,
    },
    Authenticated {
        identity: AuthUser,
        profile: Profile,
    },
}

impl AuthState {
    /// The signed-in identity, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&AuthUser> {
        match self {
            Self::Unauthenticated => None,
            Self::Authenticating { identity } | Self::Authenticated { identity, .. } => {
                Some(identity)
            }
        }
    }

    /// The active profile, once hydrated.
    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }
}
