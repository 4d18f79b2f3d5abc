//! Access token issuing and validation.

pub mod claims;
pub mod keys;
pub mod service;

pub use claims::TokenClaims;
pub use keys::SigningKeySet;
pub use service::{TokenService, TokenSettings};
