//! `AmberEats` identity core.
//!
//! Authentication sessions, role-polymorphic user profiles and the loyalty
//! rewards engine behind the `AmberEats` apps.
//!
//! # Modules
//!
//! - [`backend`]: the backend-as-a-service contract and its HTTP and
//!   in-memory adapters
//! - [`session`]: [`SessionStore`], which signs users in and out and keeps
//!   their profile hydrated
//! - [`profile`]: typed profiles and the resolver that fills their defaults
//! - [`loyalty`]: points, tiers, history, referrals and cashback
//! - [`config`]: environment configuration
//!
//! # Features
//!
//! - `demo`: enables `SessionStore::switch_role_for_demo`, which swaps the
//!   active profile's role without contacting the backend.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod loyalty;
pub mod profile;
pub mod session;

pub use backend::{Backend, BackendError, InMemoryBackend, RestBackend};
pub use config::{ConfigError, IdentityConfig, SessionConfig};
pub use loyalty::{Award, LoyaltyError, LoyaltyState, LoyaltyStore};
pub use profile::{Profile, ProfilePatch};
pub use session::{AuthError, AuthState, ProfileError, SessionStore};
