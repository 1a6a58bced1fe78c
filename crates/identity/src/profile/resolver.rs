//! Turns loose backend records into typed profiles.
//!
//! This is the only place profile defaults are decided. Every function here
//! is pure apart from drawing a referral code from the thread RNG when a
//! client record has none.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use amber_eats_core::{AdminPermission, ReferralCode, Role, Tier, VehicleType};

use super::model::{
    AdminProfile, ClientProfile, CourierProfile, Profile, ProfileBase, RestaurantProfile,
};
use super::record::{ProfilePatch, ProfileRecord};
use crate::backend::AuthUser;

/// Platform commission for a new restaurant (15%).
pub const DEFAULT_COMMISSION_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Department assigned to admins that have none recorded.
pub const DEFAULT_DEPARTMENT: &str = "operations";

/// Name used when neither the record nor the email yields one.
const FALLBACK_NAME: &str = "AmberEats user";

/// Resolve `record` into the profile variant selected by `role_tag`.
///
/// Unknown or missing tags resolve to a client profile. Missing fields get
/// their variant's defaults, so the result is always fully populated.
#[must_use]
pub fn resolve(record: &ProfileRecord, role_tag: Option<&str>) -> Profile {
    resolve_at(record, role_tag, Utc::now())
}

fn resolve_at(record: &ProfileRecord, role_tag: Option<&str>, now: DateTime<Utc>) -> Profile {
    let role = Role::from_tag(role_tag);
    if let Some(tag) = role_tag
        && role.as_str() != tag.trim().to_ascii_lowercase()
    {
        debug!(id = %record.id, tag, "Unrecognized role tag, resolving as client");
    }

    let base = resolve_base(record, now);
    let f = &record.fields;

    match role {
        Role::Client => {
            let loyalty_points = count(f.loyalty_points);
            let vip_level = f
                .vip_level
                .as_deref()
                .and_then(|tag| tag.parse::<Tier>().ok())
                .unwrap_or_else(|| Tier::for_points(loyalty_points));

            Profile::Client(ClientProfile {
                loyalty_points,
                vip_level,
                dietary_preferences: f.dietary_preferences.clone().unwrap_or_default(),
                referral_code: resolve_referral_code(record),
                total_orders: count(f.total_orders),
                total_spent: f.total_spent.unwrap_or_default(),
                favorite_restaurants: f.favorite_restaurants.clone().unwrap_or_default(),
                base,
            })
        }
        Role::Restaurant => Profile::Restaurant(RestaurantProfile {
            restaurant_name: f
                .restaurant_name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| base.name.clone()),
            cuisine_types: f.cuisine_types.clone().unwrap_or_default(),
            is_verified: f.is_verified.unwrap_or(false),
            is_open: f.is_open.unwrap_or(true),
            rating: f.rating.unwrap_or_default(),
            total_reviews: count(f.total_reviews),
            commission_rate: f.commission_rate.unwrap_or(DEFAULT_COMMISSION_RATE),
            total_orders: count(f.total_orders),
            revenue: f.revenue.unwrap_or_default(),
            base,
        }),
        Role::Courier => Profile::Courier(CourierProfile {
            vehicle_type: f
                .vehicle_type
                .as_deref()
                .and_then(|tag| tag.parse::<VehicleType>().ok())
                .unwrap_or_default(),
            is_available: f.is_available.unwrap_or(false),
            is_verified: f.is_verified.unwrap_or(false),
            rating: f.rating.unwrap_or_default(),
            total_deliveries: count(f.total_deliveries),
            earnings: f.earnings.unwrap_or_default(),
            current_zone: f.current_zone.clone(),
            base,
        }),
        Role::Admin => Profile::Admin(AdminProfile {
            permissions: resolve_permissions(record),
            department: f
                .department
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DEPARTMENT.to_string()),
            base,
        }),
    }
}

/// A default client profile for an identity that has no stored record.
#[must_use]
pub fn synthesize_default(identity: &AuthUser) -> Profile {
    let mut record = ProfileRecord::new(identity.id.clone());
    record.fields.name = Some(identity.display_name());
    record.fields.email = Some(identity.email.as_str().to_string());
    record.fields.phone = identity.contact_phone();
    record.fields.avatar_url.clone_from(&identity.avatar_url);

    resolve(&record, Some(Role::Client.as_str()))
}

/// The record written to the backend right after sign-up.
///
/// A client starts with `welcome_points` and a fresh referral code; other
/// roles start from their variant's new-account defaults.
#[must_use]
pub fn initial_record(identity: &AuthUser, role: Role, welcome_points: u32) -> ProfileRecord {
    let mut record = ProfileRecord::new(identity.id.clone());
    record.fields.name = Some(identity.display_name());
    record.fields.email = Some(identity.email.as_str().to_string());
    record.fields.phone = identity.contact_phone();
    record.fields.avatar_url.clone_from(&identity.avatar_url);
    if role == Role::Client {
        record.fields.loyalty_points = Some(i64::from(welcome_points));
    }

    resolve(&record, Some(role.as_str())).to_record()
}

/// Apply `patch` to `profile` without changing its role.
///
/// Fields that do not belong to the profile's variant are ignored, and the
/// referral code of a client is never replaced by an invalid one.
#[must_use]
pub fn merge(profile: &Profile, patch: ProfilePatch) -> Profile {
    let role = profile.role();
    let mut record = profile.to_record();

    let mut patch = patch;
    patch.role = None;
    if patch.updated_at.is_none() {
        patch.updated_at = Some(Utc::now());
    }
    if let Some(code) = &patch.referral_code
        && ReferralCode::parse(code).is_err()
    {
        warn!(id = %record.id, "Ignoring invalid referral code in profile patch");
        patch.referral_code = None;
    }
    // New points without an explicit tier re-derive the tier.
    if patch.loyalty_points.is_some() && patch.vip_level.is_none() {
        record.fields.vip_level = None;
    }
    record.fields.overlay(patch);

    resolve(&record, Some(role.as_str()))
}

fn resolve_base(record: &ProfileRecord, now: DateTime<Utc>) -> ProfileBase {
    let f = &record.fields;
    let email = f.email.clone().unwrap_or_default();
    let name = f
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .or_else(|| {
            email
                .split_once('@')
                .map(|(local, _)| local.to_string())
                .filter(|local| !local.is_empty())
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string());
    let created_at = f.created_at.unwrap_or(now);

    ProfileBase {
        id: record.id.clone(),
        name,
        email,
        phone: f.phone.clone(),
        avatar_url: f.avatar_url.clone(),
        created_at,
        updated_at: f.updated_at.unwrap_or(created_at),
    }
}

fn resolve_referral_code(record: &ProfileRecord) -> ReferralCode {
    match record.fields.referral_code.as_deref().map(ReferralCode::parse) {
        Some(Ok(code)) => code,
        Some(Err(e)) => {
            warn!(id = %record.id, error = %e, "Stored referral code is invalid, issuing a new one");
            ReferralCode::generate(&mut rand::rng())
        }
        None => ReferralCode::generate(&mut rand::rng()),
    }
}

fn resolve_permissions(record: &ProfileRecord) -> Vec<AdminPermission> {
    let Some(raw) = &record.fields.permissions else {
        return Vec::new();
    };

    let mut permissions = Vec::with_capacity(raw.len());
    for tag in raw {
        match tag.parse::<AdminPermission>() {
            Ok(perm) if !permissions.contains(&perm) => permissions.push(perm),
            Ok(_) => {}
            Err(e) => debug!(id = %record.id, error = %e, "Dropping unknown admin permission"),
        }
    }
    permissions
}

/// Clamp a stored counter into `u32`; negatives become zero.
fn count(value: Option<i64>) -> u32 {
    value.map_or(0, |v| u32::try_from(v.max(0)).unwrap_or(u32::MAX))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::backend::UserMetadata;
    use crate::profile::ProfileFields;
    use amber_eats_core::{Email, IdentityId};

    fn identity() -> AuthUser {
        AuthUser {
            id: IdentityId::new("u1"),
            email: Email::parse("a@b.com").unwrap(),
            phone: None,
            avatar_url: Some("https://cdn.example/a.png".to_string()),
            metadata: UserMetadata::default(),
        }
    }

    fn record(fields: ProfileFields) -> ProfileRecord {
        ProfileRecord {
            id: IdentityId::new("u1"),
            fields,
        }
    }

    #[test]
    fn test_missing_and_unknown_tags_resolve_to_client() {
        let empty = record(ProfileFields::default());
        assert_eq!(resolve(&empty, None).role(), Role::Client);
        assert_eq!(resolve(&empty, Some("superuser")).role(), Role::Client);
        assert_eq!(resolve(&empty, Some(" Courier ")).role(), Role::Courier);
    }

    #[test]
    fn test_empty_record_fills_every_variant() {
        let empty = record(ProfileFields::default());

        for role in Role::ALL {
            let profile = resolve(&empty, Some(role.as_str()));
            assert_eq!(profile.role(), role);
            assert_eq!(profile.name(), FALLBACK_NAME);
        }

        let Profile::Restaurant(r) = resolve(&empty, Some("restaurant")) else {
            panic!("expected restaurant");
        };
        assert!(r.is_open);
        assert!(!r.is_verified);
        assert_eq!(r.commission_rate, Decimal::new(15, 2));

        let Profile::Courier(c) = resolve(&empty, Some("courier")) else {
            panic!("expected courier");
        };
        assert_eq!(c.vehicle_type, VehicleType::Bicycle);
        assert!(!c.is_available);

        let Profile::Admin(a) = resolve(&empty, Some("admin")) else {
            panic!("expected admin");
        };
        assert!(a.permissions.is_empty());
        assert_eq!(a.department, DEFAULT_DEPARTMENT);
    }

    #[test]
    fn test_client_defaults_and_stored_values() {
        let stored = record(ProfileFields {
            name: Some("Ana".to_string()),
            loyalty_points: Some(2_500),
            referral_code: Some("AE-ABC123".to_string()),
            total_orders: Some(-3),
            ..ProfileFields::default()
        });

        let Profile::Client(c) = resolve(&stored, Some("client")) else {
            panic!("expected client");
        };
        assert_eq!(c.base.name, "Ana");
        assert_eq!(c.loyalty_points, 2_500);
        assert_eq!(c.vip_level, Tier::Gold);
        assert_eq!(c.referral_code.as_str(), "AE-ABC123");
        assert_eq!(c.total_orders, 0);
        assert_eq!(c.dietary_preferences, crate::profile::DietaryPreferences::default());
    }

    #[test]
    fn test_invalid_referral_code_is_replaced() {
        let stored = record(ProfileFields {
            referral_code: Some("nope".to_string()),
            ..ProfileFields::default()
        });
        let Profile::Client(c) = resolve(&stored, None) else {
            panic!("expected client");
        };
        assert!(ReferralCode::parse(c.referral_code.as_str()).is_ok());
    }

    #[test]
    fn test_unknown_permissions_are_dropped() {
        let stored = record(ProfileFields {
            permissions: Some(vec![
                "manage_users".to_string(),
                "launch_rockets".to_string(),
                "manage_users".to_string(),
            ]),
            ..ProfileFields::default()
        });
        let Profile::Admin(a) = resolve(&stored, Some("admin")) else {
            panic!("expected admin");
        };
        assert_eq!(a.permissions, vec![AdminPermission::ManageUsers]);
    }

    #[test]
    fn test_synthesize_default_uses_email_prefix() {
        let Profile::Client(c) = synthesize_default(&identity()) else {
            panic!("expected client");
        };
        assert_eq!(c.base.name, "a");
        assert_eq!(c.base.email, "a@b.com");
        assert_eq!(c.base.avatar_url.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(c.loyalty_points, 0);
        assert_eq!(c.total_spent, Decimal::ZERO);
    }

    #[test]
    fn test_initial_record_grants_welcome_points_to_clients_only() {
        let client = initial_record(&identity(), Role::Client, 100);
        assert_eq!(client.fields.loyalty_points, Some(100));
        assert_eq!(client.role_tag(), Some("client"));
        assert!(ReferralCode::parse(client.fields.referral_code.as_deref().unwrap()).is_ok());

        let courier = initial_record(&identity(), Role::Courier, 100);
        assert_eq!(courier.role_tag(), Some("courier"));
        assert!(courier.fields.loyalty_points.is_none());
        assert_eq!(courier.fields.is_available, Some(false));
    }

    #[test]
    fn test_merge_keeps_role_and_referral_code() {
        let profile = synthesize_default(&identity());
        let code = profile.as_client().unwrap().referral_code.clone();

        let merged = merge(
            &profile,
            ProfilePatch {
                name: Some("Renamed".to_string()),
                role: Some("admin".to_string()),
                referral_code: Some("bogus".to_string()),
                restaurant_name: Some("Ignored".to_string()),
                ..ProfilePatch::default()
            },
        );

        assert_eq!(merged.role(), Role::Client);
        assert_eq!(merged.name(), "Renamed");
        assert_eq!(merged.as_client().unwrap().referral_code, code);
        assert_eq!(merged.id(), profile.id());
    }

    #[test]
    fn test_merge_of_points_rederives_tier() {
        let profile = synthesize_default(&identity());
        let merged = merge(
            &profile,
            ProfilePatch {
                loyalty_points: Some(4_200),
                ..ProfilePatch::default()
            },
        );
        assert_eq!(merged.as_client().unwrap().vip_level, Tier::Platinum);
    }

    #[test]
    fn test_resolve_of_to_record_is_identity() {
        let profile = synthesize_default(&identity());
        assert_eq!(resolve(&profile.to_record(), Some("client")), profile);
    }

    #[test]
    fn test_count_clamps() {
        assert_eq!(count(None), 0);
        assert_eq!(count(Some(-1)), 0);
        assert_eq!(count(Some(i64::MAX)), u32::MAX);
        assert_eq!(count(Some(42)), 42);
    }
}
