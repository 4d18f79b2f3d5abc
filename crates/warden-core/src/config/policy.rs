//! RBAC policy source configuration.

use serde::{Deserialize, Serialize};

/// Where the role → permission rules come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Policy file (YAML, TOML or JSON). Built-in defaults when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// Re-read the policy file on SIGHUP.
    #[serde(default = "default_reload")]
    pub reload_on_sighup: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            path: None,
            reload_on_sighup: default_reload(),
        }
    }
}

fn default_reload() -> bool {
    true
}
