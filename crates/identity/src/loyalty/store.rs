//! Single owner of a client's loyalty state.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use amber_eats_core::Tier;

use super::engine::{self, Award};
use super::error::LoyaltyError;
use super::state::LoyaltyState;
use crate::profile::ClientProfile;

/// A tier transition caused by an award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierChange {
    pub from: Tier,
    pub to: Tier,
}

/// Result of [`LoyaltyStore::award`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwardOutcome {
    pub state: LoyaltyState,
    pub tier_change: Option<TierChange>,
}

/// Shared handle to one [`LoyaltyState`].
///
/// Writes run their transition against the latest committed state while
/// holding the write lock, so concurrent awards never lose an update.
#[derive(Debug, Clone)]
pub struct LoyaltyStore {
    state: Arc<RwLock<LoyaltyState>>,
}

impl LoyaltyStore {
    #[must_use]
    pub fn new(state: LoyaltyState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Seed a store from a client's points and referral code.
    #[must_use]
    pub fn for_client(profile: &ClientProfile) -> Self {
        Self::new(LoyaltyState::for_client(profile))
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> LoyaltyState {
        self.state.read().await.clone()
    }

    /// Replace the state with `f(previous)` and return the new state.
    pub async fn update<F>(&self, f: F) -> LoyaltyState
    where
        F: FnOnce(&LoyaltyState) -> LoyaltyState,
    {
        let mut guard = self.state.write().await;
        let next = f(&guard);
        *guard = next;
        guard.clone()
    }

    /// Like [`Self::update`] for fallible transitions; the state is left
    /// untouched on error.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns.
    pub async fn try_update<F, E>(&self, f: F) -> Result<LoyaltyState, E>
    where
        F: FnOnce(&LoyaltyState) -> Result<LoyaltyState, E>,
    {
        let mut guard = self.state.write().await;
        let next = f(&guard)?;
        *guard = next;
        Ok(guard.clone())
    }

    /// Award points and report any tier change.
    pub async fn award(&self, amount: u32, award: &Award) -> AwardOutcome {
        let mut from = Tier::default();
        let state = self
            .update(|prev| {
                from = prev.tier;
                engine::add_points(prev, amount, award)
            })
            .await;

        let tier_change = (state.tier != from).then_some(TierChange {
            from,
            to: state.tier,
        });
        match tier_change {
            Some(change) => info!(
                from = %change.from,
                to = %change.to,
                points = state.points,
                "Loyalty tier changed"
            ),
            None => debug!(amount, points = state.points, "Points awarded"),
        }

        AwardOutcome { state, tier_change }
    }

    /// Record a referral and its bonus points.
    pub async fn record_referral(&self, friend: &str, bonus_points: u32) -> LoyaltyState {
        self.update(|prev| engine::record_referral(prev, friend, bonus_points))
            .await
    }

    /// Checked tier override.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::TierNotEarned`] if the balance is below the
    /// tier's threshold.
    pub async fn update_tier(&self, tier: Tier) -> Result<LoyaltyState, LoyaltyError> {
        self.try_update(|prev| engine::update_tier(prev, tier)).await
    }

    /// Spend cashback.
    ///
    /// # Errors
    ///
    /// Returns [`LoyaltyError::InsufficientCashback`] if the balance is too
    /// small.
    pub async fn redeem_cashback(&self, amount: u64) -> Result<LoyaltyState, LoyaltyError> {
        self.try_update(|prev| engine::redeem_cashback(prev, amount))
            .await
    }
}
