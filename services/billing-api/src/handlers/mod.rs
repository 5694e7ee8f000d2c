//! REST API handlers

pub mod entitlements;
pub mod health;
pub mod shared;
pub mod subscription;
pub mod usage;
pub mod webhook;

pub use entitlements::*;
pub use health::*;
pub use subscription::*;
pub use usage::*;
pub use webhook::*;
