//! Policy files.
//!
//! A policy source is YAML, TOML or JSON (chosen by extension) of the form
//! `roles: { <role>: [<pattern>, ...] }`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::PolicyError;

use super::policy::{PolicyEngine, RuleSet};

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    roles: HashMap<String, Vec<String>>,
}

/// Reads and validates a rule set from `path`.
pub fn load_rules(path: impl AsRef<Path>) -> Result<RuleSet, PolicyError> {
    let path = path.as_ref();
    let source_err = |reason: String| PolicyError::Source {
        path: path.display().to_string(),
        reason,
    };

    let file: PolicyFile = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| source_err(e.to_string()))?;

    RuleSet::new(file.roles)
}

impl PolicyEngine {
    /// Creates an engine from a policy file. Any error is fatal to the caller.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let rules = load_rules(path)?;
        info!(path = %path.display(), roles = rules.len(), "Loaded policy file");
        Ok(Self::new(rules))
    }

    /// Reloads rules from `path`. On any error the current rules stay in force.
    pub fn reload_from_file(&self, path: impl AsRef<Path>) -> Result<(), PolicyError> {
        let path = path.as_ref();
        match load_rules(path) {
            Ok(rules) => {
                info!(path = %path.display(), "Reloading policy");
                self.install(rules);
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Policy reload rejected; keeping current rules");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn temp_policy(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("warden-policy-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_yaml() {
        let path = temp_policy(
            "policy.yaml",
            "roles:\n  admin: [\"*\"]\n  support:\n    - \"ticket:*\"\n    - \"user:read\"\n",
        );
        let engine = PolicyEngine::from_file(&path).unwrap();
        assert!(engine.has_permission("support", "ticket:close"));
        assert!(engine.has_permission("support", "user:read"));
        assert!(!engine.has_permission("support", "user:write"));
    }

    #[test]
    fn test_load_json() {
        let path = temp_policy("policy.json", r#"{"roles": {"ops": ["deploy:*"]}}"#);
        let rules = load_rules(&path).unwrap();
        assert!(rules.has_permission("ops", "deploy:staging"));
    }

    #[test]
    fn test_bad_reload_keeps_rules() {
        let good = temp_policy("good.toml", "[roles]\nops = [\"deploy:*\"]\n");
        let empty = temp_policy("empty.toml", "[roles]\n");
        let engine = PolicyEngine::from_file(&good).unwrap();

        assert_eq!(engine.reload_from_file(&empty), Err(PolicyError::EmptyRuleSet));
        assert!(matches!(
            engine.reload_from_file(good.with_file_name("missing.toml")),
            Err(PolicyError::Source { .. })
        ));
        assert!(engine.has_permission("ops", "deploy:prod"));
    }
}
