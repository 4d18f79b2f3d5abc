//! In-memory shared store.

pub mod store;

pub use store::MemoryStore;
