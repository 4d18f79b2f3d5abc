//! # warden-core
//!
//! Core crate for Warden. Contains the shared-store trait, configuration
//! schemas, the clock abstraction, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Warden crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::AppError;
pub use result::AppResult;
