//! # securekv testkit
//!
//! Test utilities for securekv.
//!
//! This crate provides:
//! - Store fixtures sharing storage and keys across simulated relaunches
//! - Legacy-data seeding and corruption helpers
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use securekv_testkit::prelude::*;
//!
//! let fixture = TestStore::new();
//! fixture.seed_legacy_entry("token", "abc123");
//!
//! let store = fixture.store();
//! let value = store.read("token").unwrap().value().flatten();
//! assert_eq!(value.as_deref(), Some("abc123"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
