//! Loyalty state transitions.
//!
//! Every operation takes the previous state by reference and returns the next
//! one; nothing here mutates in place or touches I/O. [`super::LoyaltyStore`]
//! is responsible for applying them to the latest committed state.

use chrono::{Local, NaiveDate};

use amber_eats_core::{RewardEventId, RewardSource, Tier};

use super::error::LoyaltyError;
use super::state::{LoyaltyState, RewardEvent};

/// Maximum number of history entries kept.
pub const HISTORY_LIMIT: usize = 8;

/// Share of awarded points credited to the cashback balance, in percent.
pub const CASHBACK_PERCENT: u64 = 5;

const HISTORY_DATE_FORMAT: &str = "%b %-d, %Y";

/// What a point award is for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Award {
    pub source: RewardSource,
    /// History label; defaults to the source's label.
    pub title: Option<String>,
}

impl Award {
    #[must_use]
    pub const fn new(source: RewardSource) -> Self {
        Self {
            source,
            title: None,
        }
    }

    #[must_use]
    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.source.default_title().to_string())
    }
}

/// The highest tier whose threshold does not exceed `points`.
#[must_use]
pub fn tier_for_points(points: u32) -> Tier {
    Tier::for_points(points)
}

/// Threshold of the tier above `tier`, or `None` at the top tier.
#[must_use]
pub fn next_tier_points(tier: Tier) -> Option<u32> {
    tier.next().map(Tier::threshold)
}

/// Cashback credited for an award of `points`: `floor(points * 5%)`.
#[must_use]
pub fn cashback_for(points: u32) -> u64 {
    u64::from(points) * CASHBACK_PERCENT / 100
}

/// Award `amount` points, dated today in the local timezone.
#[must_use]
pub fn add_points(state: &LoyaltyState, amount: u32, award: &Award) -> LoyaltyState {
    add_points_on(state, amount, award, Local::now().date_naive())
}

/// Award `amount` points with an explicit history date.
///
/// Recomputes the tier from the new total, prepends a history entry (keeping
/// at most [`HISTORY_LIMIT`]) and credits cashback. Point totals saturate at
/// `u32::MAX`.
#[must_use]
pub fn add_points_on(
    state: &LoyaltyState,
    amount: u32,
    award: &Award,
    date: NaiveDate,
) -> LoyaltyState {
    let points = state.points.saturating_add(amount);
    let tier = tier_for_points(points);

    let mut history = Vec::with_capacity(HISTORY_LIMIT);
    history.push(RewardEvent {
        id: RewardEventId::generate(),
        source: award.source,
        title: award.title(),
        points: amount,
        date: date.format(HISTORY_DATE_FORMAT).to_string(),
    });
    history.extend(state.history.iter().take(HISTORY_LIMIT - 1).cloned());

    let mut next = state.clone();
    next.points = points;
    next.tier = tier;
    next.next_tier_points = next_tier_points(tier).unwrap_or(state.next_tier_points);
    next.history = history;
    next.cashback.balance = state.cashback.balance.saturating_add(cashback_for(amount));
    next
}

/// Override the tier.
///
/// Accepted only when the balance has reached the tier's threshold; the
/// next-tier threshold is re-derived from the accepted tier.
///
/// # Errors
///
/// Returns [`LoyaltyError::TierNotEarned`] if `tier` needs more points than
/// the state holds.
pub fn update_tier(state: &LoyaltyState, tier: Tier) -> Result<LoyaltyState, LoyaltyError> {
    if tier.threshold() > state.points {
        return Err(LoyaltyError::TierNotEarned {
            tier,
            points: state.points,
        });
    }

    let mut next = state.clone();
    next.tier = tier;
    next.next_tier_points = next_tier_points(tier).unwrap_or(state.next_tier_points);
    Ok(next)
}

/// Credit a successful referral and award its bonus.
#[must_use]
pub fn record_referral(state: &LoyaltyState, friend: &str, bonus_points: u32) -> LoyaltyState {
    let mut next = state.clone();
    next.referral.total_referrals = next.referral.total_referrals.saturating_add(1);
    next.referral.points_earned = next.referral.points_earned.saturating_add(bonus_points);

    let award = Award::new(RewardSource::Referral).titled(format!("Referral: {friend}"));
    add_points(&next, bonus_points, &award)
}

/// Queue cashback that becomes spendable on the next settlement.
#[must_use]
pub fn schedule_cashback(state: &LoyaltyState, amount: u64) -> LoyaltyState {
    let mut next = state.clone();
    next.cashback.upcoming = next.cashback.upcoming.saturating_add(amount);
    next
}

/// Move all upcoming cashback into the spendable balance.
#[must_use]
pub fn settle_cashback(state: &LoyaltyState) -> LoyaltyState {
    let mut next = state.clone();
    next.cashback.balance = next.cashback.balance.saturating_add(next.cashback.upcoming);
    next.cashback.upcoming = 0;
    next
}

/// Spend `amount` from the cashback balance.
///
/// # Errors
///
/// Returns [`LoyaltyError::InsufficientCashback`] if the balance is smaller
/// than `amount`.
pub fn redeem_cashback(state: &LoyaltyState, amount: u64) -> Result<LoyaltyState, LoyaltyError> {
    let available = state.cashback.balance;
    let balance = available
        .checked_sub(amount)
        .ok_or(LoyaltyError::InsufficientCashback {
            requested: amount,
            available,
        })?;

    let mut next = state.clone();
    next.cashback.balance = balance;
    Ok(next)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use amber_eats_core::ReferralCode;

    fn code() -> ReferralCode {
        ReferralCode::parse("AE-ABC123").unwrap()
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 4).unwrap()
    }

    #[test]
    fn test_order_award_crosses_into_gold() {
        let seed = LoyaltyState::demo_seed(code());
        let award = Award::new(RewardSource::Order).titled("Order X");

        let next = add_points_on(&seed, 1_000, &award, date());

        assert_eq!(next.points, 2_250);
        assert_eq!(next.tier, Tier::Gold);
        assert_eq!(next.next_tier_points, 4_000);
        assert_eq!(next.cashback.balance, 700);
        assert_eq!(next.history[0].title, "Order X");
        assert_eq!(next.history[0].points, 1_000);
        assert_eq!(next.history[0].source, RewardSource::Order);
        assert_eq!(next.history[0].date, "Mar 4, 2026");
        assert_eq!(seed.points, 1_250);
    }

    #[test]
    fn test_default_title_comes_from_source() {
        let state = LoyaltyState::new(0, code());
        let next = add_points_on(&state, 10, &Award::new(RewardSource::Review), date());
        assert_eq!(next.history[0].title, "Review reward");
        assert_eq!(next.cashback.balance, 0);
    }

    #[test]
    fn test_platinum_keeps_next_tier_points() {
        let state = LoyaltyState::new(4_500, code());
        let next = add_points_on(&state, 100, &Award::default(), date());
        assert_eq!(next.tier, Tier::Platinum);
        assert_eq!(next.next_tier_points, state.next_tier_points);
    }

    #[test]
    fn test_points_saturate() {
        let state = LoyaltyState::new(u32::MAX - 1, code());
        let next = add_points_on(&state, 10, &Award::default(), date());
        assert_eq!(next.points, u32::MAX);
    }

    #[test]
    fn test_update_tier_is_checked() {
        let state = LoyaltyState::new(1_500, code());

        let err = update_tier(&state, Tier::Gold).unwrap_err();
        assert_eq!(
            err,
            LoyaltyError::TierNotEarned {
                tier: Tier::Gold,
                points: 1_500
            }
        );

        let demoted = update_tier(&state, Tier::Bronze).unwrap();
        assert_eq!(demoted.tier, Tier::Bronze);
        assert_eq!(demoted.next_tier_points, 1_000);
    }

    #[test]
    fn test_record_referral() {
        let state = LoyaltyState::new(0, code());
        let next = record_referral(&state, "Sam", 200);

        assert_eq!(next.referral.total_referrals, 1);
        assert_eq!(next.referral.points_earned, 200);
        assert_eq!(next.points, 200);
        assert_eq!(next.history[0].source, RewardSource::Referral);
        assert_eq!(next.history[0].title, "Referral: Sam");
        assert_eq!(next.referral.code, code());
    }

    #[test]
    fn test_cashback_schedule_settle_redeem() {
        let state = LoyaltyState::new(0, code());
        let state = schedule_cashback(&state, 300);
        assert_eq!(state.cashback.upcoming, 300);
        assert_eq!(state.cashback.balance, 0);

        let state = settle_cashback(&state);
        assert_eq!(state.cashback.upcoming, 0);
        assert_eq!(state.cashback.balance, 300);

        let state = redeem_cashback(&state, 120).unwrap();
        assert_eq!(state.cashback.balance, 180);

        assert_eq!(
            redeem_cashback(&state, 500),
            Err(LoyaltyError::InsufficientCashback {
                requested: 500,
                available: 180
            })
        );
    }

    #[test]
    fn test_cashback_for_floors() {
        assert_eq!(cashback_for(0), 0);
        assert_eq!(cashback_for(19), 0);
        assert_eq!(cashback_for(20), 1);
        assert_eq!(cashback_for(1_000), 50);
    }

    proptest! {
        /// Property: awarding points never lowers the tier.
        #[test]
        fn prop_tier_is_monotonic(points in any::<u32>(), extra in any::<u32>()) {
            let before = tier_for_points(points);
            let after = tier_for_points(points.saturating_add(extra));
            prop_assert!(after >= before);
        }

        /// Property: tier always matches points after an award.
        #[test]
        fn prop_tier_matches_points(start in 0u32..10_000, amount in 0u32..10_000) {
            let state = LoyaltyState::new(start, code());
            let next = add_points_on(&state, amount, &Award::default(), date());
            prop_assert_eq!(next.tier, Tier::for_points(next.points));
            prop_assert!(next.tier.threshold() <= next.points);
        }

        /// Property: history stays bounded and newest-first.
        #[test]
        fn prop_history_bounded_newest_first(amounts in prop::collection::vec(0u32..500, 0..20)) {
            let mut state = LoyaltyState::new(0, code());
            for (i, amount) in amounts.iter().enumerate() {
                let award = Award::default().titled(format!("award {i}"));
                state = add_points_on(&state, *amount, &award, date());
            }

            prop_assert!(state.history.len() <= HISTORY_LIMIT);
            prop_assert_eq!(state.history.len(), amounts.len().min(HISTORY_LIMIT));
            for (offset, event) in state.history.iter().enumerate() {
                let index = amounts.len() - 1 - offset;
                prop_assert_eq!(&event.title, &format!("award {index}"));
                prop_assert_eq!(event.points, amounts[index]);
            }
        }

        /// Property: one award credits exactly floor(amount * 5%) cashback.
        #[test]
        fn prop_cashback_arithmetic(balance in 0u64..1_000_000, amount in any::<u32>()) {
            let mut state = LoyaltyState::new(0, code());
            state.cashback.balance = balance;
            let next = add_points_on(&state, amount, &Award::default(), date());
            prop_assert_eq!(next.cashback.balance, balance + u64::from(amount) * 5 / 100);
        }
    }
}
