//! Demo-only role switching.
//!
//! Swaps the active profile for a representative profile of another role
//! without touching the backend, so role-specific screens can be exercised
//! from a single account. This is not an account management API and is only
//! compiled with the `demo` feature.

use chrono::Utc;
use rust_decimal::Decimal;

use amber_eats_core::{AdminPermission, ReferralCode, Role, Tier, VehicleType};

use super::model::{
    AdminProfile, ClientProfile, CourierProfile, DietaryPreferences, Profile, ProfileBase,
    RestaurantProfile,
};
use super::resolver::{DEFAULT_COMMISSION_RATE, DEFAULT_DEPARTMENT};

/// Build a seeded profile of `role` that keeps the base fields of `profile`.
///
/// Total over every role. A referral code carries over only from a client
/// profile; any other profile switching to client gets a new one.
#[must_use]
pub fn switch_role(profile: &Profile, role: Role) -> Profile {
    let base = ProfileBase {
        updated_at: Utc::now(),
        ..profile.base().clone()
    };

    match role {
        Role::Client => Profile::Client(ClientProfile {
            loyalty_points: 1_250,
            vip_level: Tier::Silver,
            dietary_preferences: DietaryPreferences {
                vegetarian: true,
                allergies: vec!["peanuts".to_string()],
                ..DietaryPreferences::default()
            },
            referral_code: profile.as_client().map_or_else(
                || ReferralCode::generate(&mut rand::rng()),
                |c| c.referral_code.clone(),
            ),
            total_orders: 24,
            total_spent: Decimal::new(48_650, 2),
            favorite_restaurants: vec!["Sakura Sushi".to_string(), "Bella Napoli".to_string()],
            base,
        }),
        Role::Restaurant => Profile::Restaurant(RestaurantProfile {
            restaurant_name: format!("{}'s Kitchen", base.name),
            cuisine_types: vec!["Italian".to_string(), "Pizza".to_string()],
            is_verified: true,
            is_open: true,
            rating: Decimal::new(47, 1),
            total_reviews: 328,
            commission_rate: DEFAULT_COMMISSION_RATE,
            total_orders: 1_540,
            revenue: Decimal::new(4_523_000, 2),
            base,
        }),
        Role::Courier => Profile::Courier(CourierProfile {
            vehicle_type: VehicleType::Scooter,
            is_available: true,
            is_verified: true,
            rating: Decimal::new(49, 1),
            total_deliveries: 342,
            earnings: Decimal::new(325_075, 2),
            current_zone: Some("Downtown".to_string()),
            base,
        }),
        Role::Admin => Profile::Admin(AdminProfile {
            permissions: AdminPermission::ALL.to_vec(),
            department: DEFAULT_DEPARTMENT.to_string(),
            base,
        }),
    }
}
