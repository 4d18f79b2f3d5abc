//! Signing and verification key material.
//!
//! Keys are loaded once at startup. The private key comes from inline PEM
//! (preferred) or a file; public keys come from a directory where each file's
//! stem is its key id. Anything unreadable, unparsable or of the wrong family
//! fails the load.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use tracing::{info, warn};

use warden_core::config::{SigningAlgorithm, TokenConfig};

use crate::error::KeyLoadError;

/// Key id used for an HMAC secret configured without one.
pub const DEFAULT_HMAC_KID: &str = "hs256-default";

/// Key material for one algorithm family.
#[derive(Clone)]
pub struct KeySlots {
    /// Key id embedded in issued tokens.
    pub(crate) kid: Option<String>,
    /// Current signing key, absent for verify-only deployments.
    pub(crate) signing: Option<EncodingKey>,
    /// Verification keys by key id.
    pub(crate) verifying: HashMap<String, DecodingKey>,
}

impl std::fmt::Debug for KeySlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kids: Vec<&String> = self.verifying.keys().collect();
        kids.sort();
        f.debug_struct("KeySlots")
            .field("kid", &self.kid)
            .field("can_sign", &self.signing.is_some())
            .field("verifying_kids", &kids)
            .finish()
    }
}

impl KeySlots {
    /// Resolve the verification key for a token header's key id.
    ///
    /// Without a kid exactly one verification key must be configured.
    pub(crate) fn resolve(&self, kid: Option<&str>) -> Result<&DecodingKey, crate::TokenError> {
        use crate::TokenError;
        match kid {
            Some(kid) => self.verifying.get(kid).ok_or(TokenError::UnknownKeyId),
            None => {
                let mut keys = self.verifying.values();
                match (keys.next(), keys.next()) {
                    (Some(key), None) => Ok(key),
                    (Some(_), Some(_)) => Err(TokenError::AmbiguousKeyId),
                    (None, _) => Err(TokenError::KeyUnavailable),
                }
            }
        }
    }
}

/// The configured algorithm family together with its key material.
#[derive(Debug, Clone)]
pub enum SigningKeySet {
    /// HS256 with a shared secret.
    Hmac(KeySlots),
    /// RS256 with an RSA key pair.
    Rsa(KeySlots),
    /// EdDSA with an Ed25519 key pair.
    EdDsa(KeySlots),
}

impl SigningKeySet {
    /// HMAC key set; the secret both signs and verifies.
    pub fn hmac(secret: &[u8], kid: Option<String>) -> Self {
        let lookup = kid.clone().unwrap_or_else(|| DEFAULT_HMAC_KID.to_string());
        let mut verifying = HashMap::new();
        verifying.insert(lookup, DecodingKey::from_secret(secret));
        Self::Hmac(KeySlots {
            kid,
            signing: Some(EncodingKey::from_secret(secret)),
            verifying,
        })
    }

    /// Asymmetric key set from PEM material.
    ///
    /// `public_keys` pairs each kid with its PEM and a label used in errors.
    pub fn asymmetric(
        algorithm: SigningAlgorithm,
        kid: Option<String>,
        private_pem: Option<(&[u8], &str)>,
        public_keys: &[(String, Vec<u8>, String)],
    ) -> Result<Self, KeyLoadError> {
        let family = algorithm.to_string();
        let invalid = |origin: &str, e: jsonwebtoken::errors::Error| KeyLoadError::InvalidKey {
            algorithm: family_name(algorithm),
            origin: origin.to_string(),
            reason: e.to_string(),
        };

        let signing = match private_pem {
            Some((pem, origin)) => Some(
                match algorithm {
                    SigningAlgorithm::Rs256 => EncodingKey::from_rsa_pem(pem),
                    SigningAlgorithm::EdDsa => EncodingKey::from_ed_pem(pem),
                    SigningAlgorithm::Hs256 => {
                        return Err(KeyLoadError::Missing(format!(
                            "{family} does not use PEM keys"
                        )));
                    }
                }
                .map_err(|e| invalid(origin, e))?,
            ),
            None => None,
        };

        let mut verifying = HashMap::with_capacity(public_keys.len());
        for (public_kid, pem, origin) in public_keys {
            let key = match algorithm {
                SigningAlgorithm::Rs256 => DecodingKey::from_rsa_pem(pem),
                _ => DecodingKey::from_ed_pem(pem),
            }
            .map_err(|e| invalid(origin.as_str(), e))?;
            verifying.insert(public_kid.clone(), key);
        }

        let slots = KeySlots {
            kid,
            signing,
            verifying,
        };
        Ok(match algorithm {
            SigningAlgorithm::Rs256 => Self::Rsa(slots),
            _ => Self::EdDsa(slots),
        })
    }

    /// Load keys as described by configuration.
    pub fn from_config(config: &TokenConfig) -> Result<Self, KeyLoadError> {
        let kid = Some(config.kid.trim())
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        if config.algorithm == SigningAlgorithm::Hs256 {
            if config.secret.is_empty() {
                return Err(KeyLoadError::Missing("token.secret is required for HS256".into()));
            }
            info!(kid = ?kid, "Loaded HS256 secret");
            return Ok(Self::hmac(config.secret.as_bytes(), kid));
        }

        let private_pem = if !config.private_key_pem.trim().is_empty() {
            Some((config.private_key_pem.as_bytes().to_vec(), "token.private_key_pem".to_string()))
        } else if !config.private_key_path.trim().is_empty() {
            let path = PathBuf::from(config.private_key_path.trim());
            let pem = fs::read(&path).map_err(|source| KeyLoadError::Io {
                path: path.clone(),
                source,
            })?;
            Some((pem, path.display().to_string()))
        } else {
            None
        };

        if private_pem.is_none() && !config.verify_only {
            return Err(KeyLoadError::Missing(format!(
                "no {} signing key configured and token.verify_only is false",
                config.algorithm
            )));
        }

        let public_keys = if config.public_keys_dir.trim().is_empty() {
            Vec::new()
        } else {
            read_public_keys(Path::new(config.public_keys_dir.trim()))?
        };

        let set = Self::asymmetric(
            config.algorithm,
            kid.clone(),
            private_pem.as_ref().map(|(pem, origin)| (pem.as_slice(), origin.as_str())),
            &public_keys,
        )?;

        let slots = set.slots();
        if slots.verifying.is_empty() {
            warn!(algorithm = %config.algorithm, "No verification keys loaded; every token will be rejected");
        }
        if let Some(kid) = &slots.kid {
            if slots.signing.is_some() && !slots.verifying.contains_key(kid) {
                warn!(kid = %kid, "Signing kid has no matching public key; issued tokens will not verify here");
            }
        }
        info!(
            algorithm = %config.algorithm,
            kid = ?kid,
            can_sign = slots.signing.is_some(),
            verification_keys = slots.verifying.len(),
            "Loaded token keys"
        );
        Ok(set)
    }

    /// The JWT algorithm this key set signs and accepts.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Hmac(_) => Algorithm::HS256,
            Self::Rsa(_) => Algorithm::RS256,
            Self::EdDsa(_) => Algorithm::EdDSA,
        }
    }

    /// The configured family.
    pub fn family(&self) -> SigningAlgorithm {
        match self {
            Self::Hmac(_) => SigningAlgorithm::Hs256,
            Self::Rsa(_) => SigningAlgorithm::Rs256,
            Self::EdDsa(_) => SigningAlgorithm::EdDsa,
        }
    }

    /// Key material of the configured family.
    pub fn slots(&self) -> &KeySlots {
        match self {
            Self::Hmac(slots) | Self::Rsa(slots) | Self::EdDsa(slots) => slots,
        }
    }

    /// Sorted ids of the verification keys.
    pub fn verification_kids(&self) -> Vec<String> {
        let mut kids: Vec<String> = self.slots().verifying.keys().cloned().collect();
        kids.sort();
        kids
    }
}

fn family_name(algorithm: SigningAlgorithm) -> &'static str {
    match algorithm {
        SigningAlgorithm::Hs256 => "HS256",
        SigningAlgorithm::Rs256 => "RS256",
        SigningAlgorithm::EdDsa => "EdDSA",
    }
}

/// Read every regular file in `dir` as `(kid, pem, origin)`, sorted by kid.
fn read_public_keys(dir: &Path) -> Result<Vec<(String, Vec<u8>, String)>, KeyLoadError> {
    if !dir.is_dir() {
        return Err(KeyLoadError::MissingDirectory(dir.to_path_buf()));
    }
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| KeyLoadError::Io { path, source }
    };

    let mut keys = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err(dir))? {
        let path = entry.map_err(io_err(dir))?.path();
        if !path.is_file() {
            continue;
        }
        let Some(kid) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let pem = fs::read(&path).map_err(io_err(&path))?;
        keys.push((kid.to_string(), pem, path.display().to_string()));
    }
    keys.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(rel: &str) -> String {
        format!("{}/tests/fixtures/{rel}", env!("CARGO_MANIFEST_DIR"))
    }

    fn rsa_config() -> TokenConfig {
        TokenConfig {
            algorithm: SigningAlgorithm::Rs256,
            kid: "2026-10".into(),
            private_key_path: fixture("rsa/current.key"),
            public_keys_dir: fixture("public/rsa"),
            ..TokenConfig::default()
        }
    }

    #[test]
    fn test_hmac_default_kid() {
        let set = SigningKeySet::hmac(b"secret", None);
        assert_eq!(set.algorithm(), Algorithm::HS256);
        assert_eq!(set.verification_kids(), vec![DEFAULT_HMAC_KID.to_string()]);
        assert!(set.slots().kid.is_none());
    }

    #[test]
    fn test_load_rsa_directory() {
        let set = SigningKeySet::from_config(&rsa_config()).unwrap();
        assert_eq!(set.family(), SigningAlgorithm::Rs256);
        assert_eq!(set.verification_kids(), vec!["2026-04", "2026-10"]);
        assert!(set.slots().signing.is_some());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let config = TokenConfig {
            public_keys_dir: fixture("public/nope"),
            ..rsa_config()
        };
        assert!(matches!(
            SigningKeySet::from_config(&config),
            Err(KeyLoadError::MissingDirectory(_))
        ));
    }

    #[test]
    fn test_invalid_pem_is_fatal() {
        let config = TokenConfig {
            public_keys_dir: fixture("public/broken"),
            ..rsa_config()
        };
        assert!(matches!(
            SigningKeySet::from_config(&config),
            Err(KeyLoadError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_wrong_family_is_fatal() {
        let config = TokenConfig {
            algorithm: SigningAlgorithm::EdDsa,
            private_key_path: fixture("rsa/current.key"),
            public_keys_dir: String::new(),
            ..rsa_config()
        };
        assert!(matches!(
            SigningKeySet::from_config(&config),
            Err(KeyLoadError::InvalidKey { .. })
        ));
    }

    #[test]
    fn test_inline_pem_preferred_over_path() {
        let pem = std::fs::read_to_string(fixture("eddsa/current.key")).unwrap();
        let config = TokenConfig {
            algorithm: SigningAlgorithm::EdDsa,
            kid: "ed-2026-10".into(),
            private_key_pem: pem,
            private_key_path: fixture("does/not/exist.key"),
            public_keys_dir: fixture("public/eddsa"),
            ..TokenConfig::default()
        };
        let set = SigningKeySet::from_config(&config).unwrap();
        assert_eq!(set.algorithm(), Algorithm::EdDSA);
    }

    #[test]
    fn test_no_signing_key_requires_verify_only() {
        let config = TokenConfig {
            private_key_path: String::new(),
            ..rsa_config()
        };
        assert!(matches!(
            SigningKeySet::from_config(&config),
            Err(KeyLoadError::Missing(_))
        ));

        let config = TokenConfig {
            verify_only: true,
            ..config
        };
        let set = SigningKeySet::from_config(&config).unwrap();
        assert!(set.slots().signing.is_none());
    }
}
