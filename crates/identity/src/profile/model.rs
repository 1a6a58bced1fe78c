//! Role-polymorphic profile domain types.
//!
//! These types are always fully populated. Default-filling from loose backend
//! records happens in [`super::resolver`] and nowhere else.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use amber_eats_core::{AdminPermission, IdentityId, ReferralCode, Role, Tier, VehicleType};

/// Fields shared by every profile variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBase {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Dietary restrictions a client wants restaurants to respect.
///
/// Missing keys deserialize to the neutral value, so a partially stored
/// object still yields a complete set of preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DietaryPreferences {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    pub dairy_free: bool,
    pub nut_free: bool,
    pub halal: bool,
    pub kosher: bool,
    pub allergies: Vec<String>,
}

/// A customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientProfile {
    #[serde(flatten)]
    pub base: ProfileBase,
    pub loyalty_points: u32,
    pub vip_level: Tier,
    pub dietary_preferences: DietaryPreferences,
    pub referral_code: ReferralCode,
    pub total_orders: u32,
    pub total_spent: Decimal,
    pub favorite_restaurants: Vec<String>,
}

/// A restaurant partner account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantProfile {
    #[serde(flatten)]
    pub base: ProfileBase,
    pub restaurant_name: String,
    pub cuisine_types: Vec<String>,
    pub is_verified: bool,
    pub is_open: bool,
    pub rating: Decimal,
    pub total_reviews: u32,
    /// Platform commission as a fraction (0.15 = 15%).
    pub commission_rate: Decimal,
    pub total_orders: u32,
    pub revenue: Decimal,
}

/// A delivery courier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourierProfile {
    #[serde(flatten)]
    pub base: ProfileBase,
    pub vehicle_type: VehicleType,
    pub is_available: bool,
    pub is_verified: bool,
    pub rating: Decimal,
    pub total_deliveries: u32,
    pub earnings: Decimal,
    pub current_zone: Option<String>,
}

/// A platform administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    #[serde(flatten)]
    pub base: ProfileBase,
    pub permissions: Vec<AdminPermission>,
    pub department: String,
}

/// A user profile, tagged by role.
///
/// The variant is the single source of truth for which role-specific fields
/// exist; consumers match on it instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Profile {
    Client(ClientProfile),
    Restaurant(RestaurantProfile),
    Courier(CourierProfile),
    Admin(AdminProfile),
}

impl Profile {
    /// The role discriminant.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Client(_) => Role::Client,
            Self::Restaurant(_) => Role::Restaurant,
            Self::Courier(_) => Role::Courier,
            Self::Admin(_) => Role::Admin,
        }
    }

    /// Shared base fields.
    #[must_use]
    pub const fn base(&self) -> &ProfileBase {
        match self {
            Self::Client(p) => &p.base,
            Self::Restaurant(p) => &p.base,
            Self::Courier(p) => &p.base,
            Self::Admin(p) => &p.base,
        }
    }

    /// The owning identity.
    #[must_use]
    pub const fn id(&self) -> &IdentityId {
        &self.base().id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// The client variant, if this is a client profile.
    #[must_use]
    pub const fn as_client(&self) -> Option<&ClientProfile> {
        match self {
            Self::Client(p) => Some(p),
            _ => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> ProfileBase {
        ProfileBase {
            id: IdentityId::new("u1"),
            name: "A".to_string(),
            email: "a@b.com".to_string(),
            phone: None,
            avatar_url: None,
            created_at: DateTime::UNIX_EPOCH,
            updated_at: DateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_profile_serializes_with_role_tag_and_flat_base() {
        let profile = Profile::Admin(AdminProfile {
            base: base(),
            permissions: vec![AdminPermission::ViewAnalytics],
            department: "support".to_string(),
        });

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["id"], "u1");
        assert_eq!(json["permissions"][0], "view_analytics");

        let back: Profile = serde_json::from_value(json).unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_partial_dietary_preferences_fill_neutral_defaults() {
        let prefs: DietaryPreferences = serde_json::from_str(r#"{"vegan": true}"#).unwrap();
        assert!(prefs.vegan);
        assert!(!prefs.halal);
        assert!(prefs.allergies.is_empty());
    }

    #[test]
    fn test_role_accessor_matches_variant() {
        let profile = Profile::Courier(CourierProfile {
            base: base(),
            vehicle_type: VehicleType::Scooter,
            is_available: false,
            is_verified: false,
            rating: Decimal::ZERO,
            total_deliveries: 0,
            earnings: Decimal::ZERO,
            current_zone: None,
        });
        assert_eq!(profile.role(), Role::Courier);
        assert!(profile.as_client().is_none());
        assert_eq!(profile.id().as_str(), "u1");
    }
}
