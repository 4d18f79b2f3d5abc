//! # warden-cache
//!
//! Shared atomic store providers for Warden. Supports two modes:
//!
//! - **memory**: in-process store, for single-node deployments and tests
//! - **redis**: Redis-backed store using Lua scripts for multi-key atomicity
//!
//! The provider is selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::StoreManager;
