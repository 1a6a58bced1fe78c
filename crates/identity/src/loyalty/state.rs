//! The rewards aggregate.

use serde::{Deserialize, Serialize};

use amber_eats_core::{CurrencyCode, ReferralCode, RewardEventId, RewardSource, Tier};

use crate::profile::ClientProfile;

/// Perks shown to every member.
pub const MEMBER_BENEFITS: &[&str] = &[
    "Free delivery on orders over $25",
    "Priority customer support",
    "Exclusive member deals",
    "Birthday bonus points",
];

/// A client's loyalty standing.
///
/// Only [`super::engine`] functions produce new states, so `tier` always
/// matches `points` unless a checked override was accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoyaltyState {
    pub points: u32,
    pub tier: Tier,
    /// Threshold of the tier above `tier`.
    pub next_tier_points: u32,
    pub benefits: Vec<String>,
    /// Newest first, at most [`super::engine::HISTORY_LIMIT`] entries.
    pub history: Vec<RewardEvent>,
    pub referral: ReferralStats,
    pub cashback: CashbackWallet,
}

/// One awarded-points entry in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    pub id: RewardEventId,
    #[serde(rename = "type")]
    pub source: RewardSource,
    pub title: String,
    pub points: u32,
    /// Local calendar date, e.g. `Mar 4, 2026`.
    pub date: String,
}

/// Referral bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralStats {
    pub code: ReferralCode,
    pub total_referrals: u32,
    pub points_earned: u32,
}

/// Cashback balances in minor currency units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashbackWallet {
    pub balance: u64,
    /// Accrued but not yet spendable.
    pub upcoming: u64,
    pub currency: CurrencyCode,
}

impl LoyaltyState {
    /// A state holding `points` with everything else zeroed.
    #[must_use]
    pub fn new(points: u32, referral_code: ReferralCode) -> Self {
        let tier = Tier::for_points(points);
        Self {
            points,
            tier,
            next_tier_points: super::engine::next_tier_points(tier).unwrap_or(tier.threshold()),
            benefits: MEMBER_BENEFITS.iter().map(|b| (*b).to_string()).collect(),
            history: Vec::new(),
            referral: ReferralStats {
                code: referral_code,
                total_referrals: 0,
                points_earned: 0,
            },
            cashback: CashbackWallet {
                balance: 0,
                upcoming: 0,
                currency: CurrencyCode::default(),
            },
        }
    }

    /// Seed state for a client profile.
    #[must_use]
    pub fn for_client(profile: &ClientProfile) -> Self {
        Self::new(profile.loyalty_points, profile.referral_code.clone())
    }

    /// The seed values the app ships with for its demo account.
    #[must_use]
    pub fn demo_seed(referral_code: ReferralCode) -> Self {
        let mut state = Self::new(1_250, referral_code);
        state.referral.total_referrals = 3;
        state.referral.points_earned = 300;
        state.cashback.balance = 650;
        state.cashback.upcoming = 120;
        state
    }
}
