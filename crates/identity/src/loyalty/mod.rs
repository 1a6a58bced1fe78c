//! Loyalty points, tiers, history, referrals and cashback.
//!
//! [`engine`] holds the pure transitions; [`LoyaltyStore`] owns one state and
//! applies them. The state lives in memory only.

pub mod engine;
mod error;
pub mod state;
mod store;

pub use engine::Award;
pub use error::LoyaltyError;
pub use state::{CashbackWallet, LoyaltyState, ReferralStats, RewardEvent};
pub use store::{AwardOutcome, LoyaltyStore, TierChange};
