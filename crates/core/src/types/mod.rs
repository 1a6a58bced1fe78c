//! Core types for AmberEats.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod referral;
pub mod role;
pub mod status;
pub mod tier;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::CurrencyCode;
pub use referral::{ReferralCode, ReferralCodeError};
pub use role::{AdminPermission, Role, UnknownValueError};
pub use status::*;
pub use tier::Tier;
