//! Access token configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Signing algorithm family for access tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningAlgorithm {
    /// HMAC-SHA256 with a shared secret.
    #[default]
    Hs256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// Ed25519.
    #[serde(alias = "ed25519")]
    EdDsa,
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hs256 => write!(f, "HS256"),
            Self::Rs256 => write!(f, "RS256"),
            Self::EdDsa => write!(f, "EdDSA"),
        }
    }
}

/// Access token signing and validation configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Algorithm family used for both signing and verification.
    #[serde(default)]
    pub algorithm: SigningAlgorithm,
    /// Shared secret for HS256.
    #[serde(default)]
    pub secret: String,
    /// Key id embedded in issued token headers. Empty disables the header.
    #[serde(default)]
    pub kid: String,
    /// Path to the PEM private key (RS256 / EdDSA).
    #[serde(default)]
    pub private_key_path: String,
    /// Inline PEM private key. Takes precedence over `private_key_path`.
    #[serde(default)]
    pub private_key_pem: String,
    /// Directory of PEM public keys; each file stem is a key id.
    #[serde(default)]
    pub public_keys_dir: String,
    /// Accept a key set with no signing key (validation only).
    #[serde(default)]
    pub verify_only: bool,
    /// Access token lifetime in seconds.
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Expected and issued `iss` claim. Empty skips the check.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Expected and issued `aud` claim. Empty skips the check.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Clock skew tolerance in seconds, applied to `exp` and `nbf`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            algorithm: SigningAlgorithm::default(),
            secret: String::new(),
            kid: String::new(),
            private_key_path: String::new(),
            private_key_pem: String::new(),
            public_keys_dir: String::new(),
            verify_only: false,
            ttl_seconds: default_ttl(),
            issuer: default_issuer(),
            audience: default_audience(),
            leeway_seconds: default_leeway(),
        }
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .field("private_key_path", &self.private_key_path)
            .field("public_keys_dir", &self.public_keys_dir)
            .field("verify_only", &self.verify_only)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("leeway_seconds", &self.leeway_seconds)
            .finish_non_exhaustive()
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_issuer() -> String {
    "warden".to_string()
}

fn default_audience() -> String {
    "warden-clients".to_string()
}

fn default_leeway() -> u64 {
    30
}
