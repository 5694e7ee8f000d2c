//! Recall Types - Shared domain types
//!
//! This crate contains domain types used across Recall services:
//! - User and material identifiers
//! - Subscription statuses and tiers
//! - Entitlement decisions and denial payloads
//! - Billing and checkout types

pub mod billing;
pub mod entitlement;
pub mod ids;
pub mod subscription;
pub mod tier;

pub use billing::*;
pub use entitlement::*;
pub use ids::*;
pub use subscription::*;
pub use tier::*;
