//! Shared building blocks for the LightProxy provisioning crates.
//!
//! Holds the data directory layout and the platform classification that
//! decides which trust and helper strategies run.

pub mod paths;
pub mod platform;

pub use platform::PlatformKind;

/// Display name shown in the privilege prompt and embedded in the CA subject.
pub const APP_NAME: &str = "LightProxy";
