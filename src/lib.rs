//! Workspace umbrella crate.
//!
//! Exposes the `desktop-shims` feature that maps onto `core-service`, so host
//! programs can depend on `shuffle-workspace` without wiring each crate
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
