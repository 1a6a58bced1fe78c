//! AmberEats Core - Shared types library.
//!
//! This crate provides the vocabulary shared by every AmberEats component:
//! - `identity` - Session store, profile resolution and the loyalty engine
//! - `cli` - Operator and demo tooling
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no backend access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, referral codes, roles and tiers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
