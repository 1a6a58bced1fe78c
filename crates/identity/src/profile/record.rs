//! Loose profile records as stored by the backend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use amber_eats_core::IdentityId;

use super::model::{DietaryPreferences, Profile, ProfileBase};

/// A profile row keyed by identity id.
///
/// Every column except the id may be missing; [`super::resolve`] turns a
/// record into a fully populated [`Profile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub id: IdentityId,
    #[serde(flatten)]
    pub fields: ProfileFields,
}

impl ProfileRecord {
    /// An empty record for `id`.
    #[must_use]
    pub fn new(id: IdentityId) -> Self {
        Self {
            id,
            fields: ProfileFields::default(),
        }
    }

    /// The stored role tag, if any.
    #[must_use]
    pub fn role_tag(&self) -> Option<&str> {
        self.fields.role.as_deref()
    }
}

/// Every profile column, all optional.
///
/// Counters are signed so a corrupted negative value degrades to zero in the
/// resolver instead of failing the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    // Client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loyalty_points: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dietary_preferences: Option<DietaryPreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_orders: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_restaurants: Option<Vec<String>>,

    // Restaurant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_open: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_reviews: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Decimal>,

    // Courier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_deliveries: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_zone: Option<String>,

    // Admin
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// A partial profile update. Only `Some` fields are applied.
pub type ProfilePatch = ProfileFields;

macro_rules! overlay_fields {
    ($base:ident, $patch:ident; $($field:ident),+ $(,)?) => {
        $(
            if $patch.$field.is_some() {
                $base.$field = $patch.$field;
            }
        )+
    };
}

macro_rules! changed_fields {
    ($next:ident, $prev:ident, $out:ident; $($field:ident),+ $(,)?) => {
        $(
            if $next.$field != $prev.$field {
                $out.$field = $next.$field.clone();
            }
        )+
    };
}

impl ProfileFields {
    /// The fields of `self` that differ from `previous`; everything else is
    /// `None`.
    #[must_use]
    pub fn changed_from(&self, previous: &Self) -> Self {
        let next = self;
        let mut changed = Self::default();
        changed_fields!(next, previous, changed;
            name, email, phone, avatar_url, role, created_at, updated_at,
            loyalty_points, vip_level, dietary_preferences, referral_code,
            total_orders, total_spent, favorite_restaurants,
            restaurant_name, cuisine_types, is_verified, is_open, rating,
            total_reviews, commission_rate, revenue,
            vehicle_type, is_available, total_deliveries, earnings, current_zone,
            permissions, department,
        );
        changed
    }

    /// Copy every `Some` field of `patch` over `self`.
    pub fn overlay(&mut self, patch: Self) {
        let base = self;
        overlay_fields!(base, patch;
            name, email, phone, avatar_url, role, created_at, updated_at,
            loyalty_points, vip_level, dietary_preferences, referral_code,
            total_orders, total_spent, favorite_restaurants,
            restaurant_name, cuisine_types, is_verified, is_open, rating,
            total_reviews, commission_rate, revenue,
            vehicle_type, is_available, total_deliveries, earnings, current_zone,
            permissions, department,
        );
    }
}

fn base_fields(base: &ProfileBase, role: &str) -> ProfileFields {
    ProfileFields {
        name: Some(base.name.clone()),
        email: Some(base.email.clone()),
        phone: base.phone.clone(),
        avatar_url: base.avatar_url.clone(),
        role: Some(role.to_string()),
        created_at: Some(base.created_at),
        updated_at: Some(base.updated_at),
        ..ProfileFields::default()
    }
}

impl From<&Profile> for ProfileRecord {
    fn from(profile: &Profile) -> Self {
        let mut fields = base_fields(profile.base(), profile.role().as_str());

        match profile {
            Profile::Client(p) => {
                fields.loyalty_points = Some(i64::from(p.loyalty_points));
                fields.vip_level = Some(p.vip_level.as_str().to_string());
                fields.dietary_preferences = Some(p.dietary_preferences.clone());
                fields.referral_code = Some(p.referral_code.to_string());
                fields.total_orders = Some(i64::from(p.total_orders));
                fields.total_spent = Some(p.total_spent);
                fields.favorite_restaurants = Some(p.favorite_restaurants.clone());
            }
            Profile::Restaurant(p) => {
                fields.restaurant_name = Some(p.restaurant_name.clone());
                fields.cuisine_types = Some(p.cuisine_types.clone());
                fields.is_verified = Some(p.is_verified);
                fields.is_open = Some(p.is_open);
                fields.rating = Some(p.rating);
                fields.total_reviews = Some(i64::from(p.total_reviews));
                fields.commission_rate = Some(p.commission_rate);
                fields.total_orders = Some(i64::from(p.total_orders));
                fields.revenue = Some(p.revenue);
            }
            Profile::Courier(p) => {
                fields.vehicle_type = Some(p.vehicle_type.as_str().to_string());
                fields.is_available = Some(p.is_available);
                fields.is_verified = Some(p.is_verified);
                fields.rating = Some(p.rating);
                fields.total_deliveries = Some(i64::from(p.total_deliveries));
                fields.earnings = Some(p.earnings);
                fields.current_zone.clone_from(&p.current_zone);
            }
            Profile::Admin(p) => {
                fields.permissions = Some(
                    p.permissions
                        .iter()
                        .map(|perm| perm.as_str().to_string())
                        .collect(),
                );
                fields.department = Some(p.department.clone());
            }
        }

        Self {
            id: profile.id().clone(),
            fields,
        }
    }
}

impl Profile {
    /// Project this profile back onto a storable record.
    #[must_use]
    pub fn to_record(&self) -> ProfileRecord {
        ProfileRecord::from(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_only_applies_some_fields() {
        let mut base = ProfileFields {
            name: Some("Old".to_string()),
            phone: Some("+1".to_string()),
            ..ProfileFields::default()
        };
        base.overlay(ProfilePatch {
            name: Some("New".to_string()),
            ..ProfilePatch::default()
        });

        assert_eq!(base.name.as_deref(), Some("New"));
        assert_eq!(base.phone.as_deref(), Some("+1"));
    }

    #[test]
    fn test_changed_from_keeps_only_differences() {
        let previous = ProfileFields {
            name: Some("Maria".to_string()),
            loyalty_points: Some(100),
            vip_level: Some("bronze".to_string()),
            ..ProfileFields::default()
        };
        let next = ProfileFields {
            loyalty_points: Some(4_200),
            vip_level: Some("platinum".to_string()),
            ..previous.clone()
        };

        let changed = next.changed_from(&previous);
        assert_eq!(changed.name, None);
        assert_eq!(changed.loyalty_points, Some(4_200));
        assert_eq!(changed.vip_level.as_deref(), Some("platinum"));
        assert_eq!(next.changed_from(&next), ProfileFields::default());
    }

    #[test]
    fn test_record_deserializes_sparse_row() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id": "u1", "role": "courier", "rating": "4.8", "extra": 1}"#)
                .unwrap();

        assert_eq!(record.id.as_str(), "u1");
        assert_eq!(record.role_tag(), Some("courier"));
        assert_eq!(record.fields.rating, Some(Decimal::new(48, 1)));
        assert!(record.fields.name.is_none());
    }

    #[test]
    fn test_record_accepts_nulls() {
        let record: ProfileRecord =
            serde_json::from_str(r#"{"id": "u1", "phone": null, "dietary_preferences": null}"#)
                .unwrap();
        assert!(record.fields.phone.is_none());
        assert!(record.fields.dietary_preferences.is_none());
    }

    #[test]
    fn test_record_serialization_skips_missing_columns() {
        let json = serde_json::to_value(ProfileRecord::new(IdentityId::new("u1"))).unwrap();
        assert_eq!(json, serde_json::json!({"id": "u1"}));
    }
}
