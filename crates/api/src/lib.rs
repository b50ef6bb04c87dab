// Allow unwrap()/expect() in tests for cleaner test code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! StudyHall API Library
//!
//! This crate contains the HTTP server components for StudyHall:
//! authentication, payment endpoints, and usage endpoints.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
