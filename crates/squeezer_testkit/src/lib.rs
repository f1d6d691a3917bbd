//! # Squeezer Testkit
//!
//! Test utilities for squeezer.
//!
//! This crate provides:
//! - [`FakePulp`], an in-memory Pulp 3 API implementing `Transport`
//! - Fixtures for engines, payloads and digests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use squeezer_testkit::prelude::*;
//!
//! #[test]
//! fn creates_remote() {
//!     let pulp = fake_pulp();
//!     let engine = engine_for(&pulp);
//!     // ... reconcile entities against the fake
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::server::*;
}

pub use fixtures::*;
pub use generators::*;
pub use server::*;
