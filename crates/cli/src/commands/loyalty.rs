//! Loyalty commands.
//!
//! Both commands run against an in-memory state; nothing is persisted.
//!
//! # Usage
//!
//! ```bash
//! ae-cli loyalty tier 1999
//! ae-cli loyalty award --points 500 --source bonus --title "Birthday treat" --seed fresh
//! ```

use amber_eats_core::{ReferralCode, RewardSource, Tier, UnknownValueError};
use amber_eats_identity::loyalty::engine;
use amber_eats_identity::{Award, LoyaltyState, LoyaltyStore};
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;

use super::print_json;

/// Errors that can occur during loyalty commands.
#[derive(Debug, Error)]
pub enum LoyaltyCommandError {
    /// Unknown reward source.
    #[error("{0}. Valid sources: order, referral, review, bonus")]
    InvalidSource(#[from] UnknownValueError),

    /// Output could not be serialized.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Starting state for [`award`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Seed {
    /// 1250 points, silver, 650 cashback
    Demo,
    /// Empty bronze state
    Fresh,
}

impl Seed {
    fn state(self) -> LoyaltyState {
        let code = ReferralCode::generate(&mut rand::rng());
        match self {
            Self::Demo => LoyaltyState::demo_seed(code),
            Self::Fresh => LoyaltyState::new(0, code),
        }
    }
}

#[derive(Debug, Serialize)]
struct TierReport {
    points: u32,
    tier: Tier,
    /// Absent at the top tier.
    next_tier: Option<Tier>,
    next_tier_points: Option<u32>,
    points_to_next: Option<u32>,
}

fn tier_report(points: u32) -> TierReport {
    let tier = engine::tier_for_points(points);
    let next_tier_points = engine::next_tier_points(tier);
    TierReport {
        points,
        tier,
        next_tier: tier.next(),
        next_tier_points,
        points_to_next: next_tier_points.map(|next| next.saturating_sub(points)),
    }
}

/// Print the tier earned by `points` and the distance to the next one.
pub fn tier(points: u32) -> Result<(), LoyaltyCommandError> {
    print_json(&tier_report(points))?;
    Ok(())
}

/// Award `points` to a seeded state and print the result.
pub async fn award(
    points: u32,
    source: &str,
    title: Option<String>,
    seed: Seed,
) -> Result<(), LoyaltyCommandError> {
    let source: RewardSource = source.parse()?;
    let award = match title {
        Some(title) => Award::new(source).titled(title),
        None => Award::new(source),
    };

    let store = LoyaltyStore::new(seed.state());
    let outcome = store.award(points, &award).await;
    print_json(&outcome.state)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_report_counts_down_to_next_tier() {
        let report = tier_report(1_250);
        assert_eq!(report.tier, Tier::Silver);
        assert_eq!(report.next_tier, Some(Tier::Gold));
        assert_eq!(report.next_tier_points, Some(2_000));
        assert_eq!(report.points_to_next, Some(750));
    }

    #[test]
    fn test_tier_report_has_no_next_at_platinum() {
        let report = tier_report(9_000);
        assert_eq!(report.tier, Tier::Platinum);
        assert_eq!(report.next_tier, None);
        assert_eq!(report.points_to_next, None);
    }

    #[test]
    fn test_seeds() {
        assert_eq!(Seed::Demo.state().points, 1_250);
        assert_eq!(Seed::Fresh.state().points, 0);
        assert_eq!(Seed::Fresh.state().tier, Tier::Bronze);
    }

    #[tokio::test]
    async fn test_award_rejects_unknown_source() {
        let result = award(10, "lottery", None, Seed::Fresh).await;
        assert!(matches!(result, Err(LoyaltyCommandError::InvalidSource(_))));
    }
}
