//! Role-polymorphic user profiles.
//!
//! - [`model`]: the typed [`Profile`] variants
//! - [`record`]: loose backend rows and partial updates
//! - [`resolver`]: the mapping between the two, including every default

#[cfg(feature = "demo")]
pub mod demo;
pub mod model;
pub mod record;
pub mod resolver;

pub use model::{
    AdminProfile, ClientProfile, CourierProfile, DietaryPreferences, Profile, ProfileBase,
    RestaurantProfile,
};
pub use record::{ProfileFields, ProfilePatch, ProfileRecord};
pub use resolver::{initial_record, merge, resolve, synthesize_default};
