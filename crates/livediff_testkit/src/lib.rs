//! # LiveDiff Testkit
//!
//! Test utilities for LiveDiff.
//!
//! This crate provides:
//! - A shared schema and a harness wiring an in-memory source to a notifier
//! - Recording callbacks for notifications and adapter events
//! - Property-based test generators using proptest
//! - Change set replay and verification
//! - Golden test utilities for change sets
//!
//! ## Usage
//!
//! ```rust,ignore
//! use livediff_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_harness() {
//!     with_harness(|harness| {
//!         let recorder = Recorder::new();
//!         let _token = harness.people().subscribe(recorder.callback(), None).unwrap();
//!         harness.refresh();
//!         // ... write and refresh again
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod golden;
pub mod recorder;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::golden::*;
    pub use crate::recorder::*;
}

pub use fixtures::*;
pub use generators::*;
pub use golden::*;
pub use recorder::*;
