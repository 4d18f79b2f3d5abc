//! Opaque single-use refresh tokens.

pub mod store;

pub use store::RefreshTokenStore;
