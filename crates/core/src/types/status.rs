//! Small enumerations shared by profiles and the rewards ledger.

use serde::{Deserialize, Serialize};

use super::role::UnknownValueError;

/// How a courier makes deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    Bicycle,
    Scooter,
    Motorcycle,
    Car,
}

impl VehicleType {
    /// The wire tag for this vehicle type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bicycle => "bicycle",
            Self::Scooter => "scooter",
            Self::Motorcycle => "motorcycle",
            Self::Car => "car",
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VehicleType {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bicycle" | "bike" => Ok(Self::Bicycle),
            "scooter" => Ok(Self::Scooter),
            "motorcycle" => Ok(Self::Motorcycle),
            "car" => Ok(Self::Car),
            _ => Err(UnknownValueError::new("vehicle type", s)),
        }
    }
}

/// What earned the points in a loyalty history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RewardSource {
    /// Completed order (the default).
    #[default]
    Order,
    /// A referred friend placed their first order.
    Referral,
    /// Customer left a review.
    Review,
    /// Promotional or goodwill bonus.
    Bonus,
}

impl RewardSource {
    /// Label used for a history entry when the caller gives no title.
    #[must_use]
    pub const fn default_title(self) -> &'static str {
        match self {
            Self::Order => "Order reward",
            Self::Referral => "Referral bonus",
            Self::Review => "Review reward",
            Self::Bonus => "Bonus points",
        }
    }

    /// The wire tag for this source.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Referral => "referral",
            Self::Review => "review",
            Self::Bonus => "bonus",
        }
    }
}

impl std::fmt::Display for RewardSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RewardSource {
    type Err = UnknownValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(Self::Order),
            "referral" => Ok(Self::Referral),
            "review" => Ok(Self::Review),
            "bonus" => Ok(Self::Bonus),
            _ => Err(UnknownValueError::new("reward source", s)),
        }
    }
}
