//! Role-based access control with hot-reloadable rules.

pub mod loader;
pub mod policy;

pub use policy::{PolicyEngine, RuleSet};
