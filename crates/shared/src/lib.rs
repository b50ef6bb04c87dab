// Allow unwrap()/expect() in tests for cleaner test code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Studyhall Shared Types and Utilities
//!
//! This crate contains types and database utilities shared across the
//! Studyhall platform.

pub mod db;
pub mod types;

pub use db::*;
pub use types::*;
