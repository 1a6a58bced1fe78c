//! Integration tests for demo role switching.
//!
//! Role switching swaps the in-memory profile only; the backend record keeps
//! the role chosen at sign-up.

#![allow(clippy::unwrap_used)]

use amber_eats_core::{IdentityId, Role};
use amber_eats_identity::profile::{self, Profile, ProfileRecord, demo};
use amber_eats_identity::{AuthState, ProfileError, ProfilePatch};
use amber_eats_integration_tests::{sign_up, test_store};

fn client_u1() -> Profile {
    let mut record = ProfileRecord::new(IdentityId::new("u1"));
    record.fields.name = Some("A".to_string());
    record.fields.email = Some("a@b.com".to_string());
    profile::resolve(&record, Some("client"))
}

#[test]
fn test_switch_to_restaurant_keeps_identity() {
    let switched = demo::switch_role(&client_u1(), Role::Restaurant);

    assert_eq!(switched.role(), Role::Restaurant);
    assert_eq!(switched.id().as_str(), "u1");
    assert_eq!(switched.base().email, "a@b.com");
    assert_eq!(switched.name(), "A");
    let Profile::Restaurant(restaurant) = &switched else {
        panic!("expected a restaurant profile");
    };
    assert!(restaurant.is_verified);
}

#[test]
fn test_client_to_client_switch_keeps_referral_code() {
    let original = client_u1();
    let code = original.as_client().unwrap().referral_code.clone();

    let same = demo::switch_role(&original, Role::Client);
    assert_eq!(same.as_client().unwrap().referral_code, code);
}

#[test]
fn test_switch_back_from_courier_issues_new_referral_code() {
    let original = client_u1();

    let back = demo::switch_role(&demo::switch_role(&original, Role::Courier), Role::Client);
    let client = back.as_client().unwrap();
    assert!(client.referral_code.as_str().starts_with("AE-"));
    assert_eq!(client.loyalty_points, 1_250);
}

#[tokio::test]
async fn test_store_switch_does_not_touch_backend() {
    let store = test_store();
    sign_up(&store, "a@b.com", "A", Role::Client).await.unwrap();
    let id = store.profile().unwrap().id().clone();

    let switched = store.switch_role_for_demo(Role::Admin).unwrap();
    assert_eq!(switched.role(), Role::Admin);
    assert_eq!(store.profile().unwrap(), switched);

    let record = store.backend().profile_record(&id).await.unwrap();
    assert_eq!(record.role_tag(), Some("client"));
}

#[tokio::test]
async fn test_store_switch_then_update_keeps_switched_role() {
    let store = test_store();
    sign_up(&store, "a@b.com", "A", Role::Client).await.unwrap();
    store.switch_role_for_demo(Role::Courier).unwrap();

    let updated = store
        .update_profile(ProfilePatch {
            name: Some("Courier A".to_string()),
            ..ProfilePatch::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.role(), Role::Courier);
    assert_eq!(updated.name(), "Courier A");
}

#[tokio::test]
async fn test_store_switch_without_profile_fails() {
    let store = test_store();

    let err = store.switch_role_for_demo(Role::Restaurant).unwrap_err();
    assert!(matches!(err, ProfileError::NoProfile));
    assert_eq!(store.state(), AuthState::Unauthenticated);
}
