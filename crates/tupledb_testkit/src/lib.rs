//! # tupledb testkit
//!
//! Test utilities for tupledb.
//!
//! This crate provides:
//! - Store fixtures over memory or a temporary commit log file
//! - An instrumented engine that counts calls and injects failures
//! - A reference model of the live set
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tupledb_testkit::prelude::*;
//!
//! with_temp_store(|store| {
//!     store.seed(&["document:a#viewer@user:x"]);
//!     assert_eq!(store.live(), vec!["document:a#viewer@user:x"]);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod instrumented;
pub mod model;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::instrumented::*;
    pub use crate::model::*;
}

pub use fixtures::*;
pub use generators::*;
pub use instrumented::*;
pub use model::*;
