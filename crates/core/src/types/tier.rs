//! Loyalty tiers and their fixed point thresholds.

use serde::{Deserialize, Serialize};

use super::role::UnknownValueError;

/// A loyalty level derived from accumulated points.
///
/// Variants are declared in ascending order, so `Ord` compares tiers by rank.
///
/// | Tier     | Threshold |
/// |----------|-----------|
/// | Bronze   | 0         |
/// | Silver   | 1000      |
/// | Gold     | 2000      |
/// | Platinum | 4000      |
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    /// Every tier in ascending order.
    pub const ALL: [Self; 4] = [Self::Bronze, Self::Silver, Self::Gold, Self::Platinum];

    /// Points needed to reach this tier.
    #[must_use]
    pub const fn threshold(self) -> u32 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1_000,
            Self::Gold => 2_000,
            Self::Platinum => 4_000,
        }
    }

    /// The highest tier whose threshold does not exceed `points`.
    ///
    /// ```
    /// use amber_eats_core::Tier;
    ///
    /// assert_eq!(Tier::for_points(999), Tier::Bronze);
    /// assert_eq!(Tier::for_points(1_000), Tier::Silver);
    /// assert_eq!(Tier::for_points(2_250), Tier::Gold);
    /// assert_eq!(Tier::for_points(u32::MAX), Tier::Platinum);
    /// ```
    #[must_use]
    pub fn for_points(points: u32) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|tier| tier.threshold() <= points)
            .unwrap_or_default()
    }

    /// The tier immediately above this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Platinum),
            Self::Platinum => None,
        }
    }

    /// The wire tag for this tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownValueError::new("tier", s))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_are_fixed() {
        let thresholds: Vec<u32> = Tier::ALL.iter().map(|t| t.threshold()).collect();
        assert_eq!(thresholds, vec![0, 1_000, 2_000, 4_000]);
    }

    #[test]
    fn test_for_points_boundaries() {
        assert_eq!(Tier::for_points(0), Tier::Bronze);
        assert_eq!(Tier::for_points(1_999), Tier::Silver);
        assert_eq!(Tier::for_points(2_000), Tier::Gold);
        assert_eq!(Tier::for_points(3_999), Tier::Gold);
        assert_eq!(Tier::for_points(4_000), Tier::Platinum);
    }

    #[test]
    fn test_tiers_are_ordered_by_rank() {
        assert!(Tier::Bronze < Tier::Silver);
        assert!(Tier::Gold < Tier::Platinum);
        assert_eq!(Tier::Platinum.next(), None);
        assert_eq!(Tier::Silver.next(), Some(Tier::Gold));
    }

    #[test]
    fn test_parse() {
        assert_eq!("gold".parse::<Tier>().unwrap(), Tier::Gold);
        assert!("diamond".parse::<Tier>().is_err());
    }
}
