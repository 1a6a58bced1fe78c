//! Loyalty errors.

use thiserror::Error;

use amber_eats_core::Tier;

/// Errors returned by the checked loyalty operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoyaltyError {
    /// A tier override asked for a tier the point balance has not reached.
    #[error("Tier {tier} requires {} points, balance is {points}", tier.threshold())]
    TierNotEarned { tier: Tier, points: u32 },

    /// A redemption asked for more cashback than is spendable.
    #[error("Cannot redeem {requested}, only {available} available")]
    InsufficientCashback { requested: u64, available: u64 },
}
