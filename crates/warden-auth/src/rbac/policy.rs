//! Role to permission-pattern mapping.
//!
//! A pattern is an exact permission, a prefix wildcard `domain:*` (matching
//! `domain:...` and bare `domain`), or the universal `*`. The whole rule set
//! is swapped atomically; readers take lock-free snapshots.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::error::PolicyError;

/// Compiled permission patterns of one role.
#[derive(Debug, Clone, Default)]
struct RolePatterns {
    /// Patterns as configured (trimmed), in order.
    patterns: Vec<String>,
    exact: HashSet<String>,
    /// Prefixes of `prefix:*` patterns, without the `:*`.
    prefixes: Vec<String>,
    universal: bool,
}

impl RolePatterns {
    fn compile(patterns: Vec<String>) -> Self {
        let mut compiled = Self::default();
        for pattern in &patterns {
            if pattern == "*" {
                compiled.universal = true;
            } else if let Some(prefix) = pattern.strip_suffix(":*") {
                compiled.prefixes.push(prefix.to_string());
            } else {
                compiled.exact.insert(pattern.clone());
            }
        }
        compiled.patterns = patterns;
        compiled
    }

    fn grants(&self, permission: &str) -> bool {
        if self.exact.contains(permission) || self.universal {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            permission
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
        })
    }
}

/// A validated, immutable rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    roles: HashMap<String, RolePatterns>,
}

impl RuleSet {
    /// Validates and compiles `rules`.
    ///
    /// Role names and patterns are trimmed; an empty set, an empty role name
    /// or an empty pattern rejects the whole input.
    pub fn new<I, R, P>(rules: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (R, Vec<P>)>,
        R: AsRef<str>,
        P: AsRef<str>,
    {
        let mut roles = HashMap::new();
        for (role, patterns) in rules {
            let role = role.as_ref().trim();
            if role.is_empty() {
                return Err(PolicyError::EmptyRole);
            }
            let mut trimmed = Vec::with_capacity(patterns.len());
            for pattern in &patterns {
                let pattern = pattern.as_ref().trim();
                if pattern.is_empty() {
                    return Err(PolicyError::EmptyPattern(role.to_string()));
                }
                trimmed.push(pattern.to_string());
            }
            roles.insert(role.to_string(), RolePatterns::compile(trimmed));
        }
        if roles.is_empty() {
            return Err(PolicyError::EmptyRuleSet);
        }
        Ok(Self { roles })
    }

    /// `admin: ["*"]`, `user: ["user:read"]`, `viewer: ["user:read"]`.
    pub fn default_rules() -> Self {
        let roles = [
            ("admin", vec!["*"]),
            ("user", vec!["user:read"]),
            ("viewer", vec!["user:read"]),
        ]
        .into_iter()
        .map(|(role, patterns)| {
            let patterns = patterns.into_iter().map(str::to_string).collect();
            (role.to_string(), RolePatterns::compile(patterns))
        })
        .collect();
        Self { roles }
    }

    /// Whether `role` grants `permission`.
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .is_some_and(|patterns| patterns.grants(permission))
    }

    /// Number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether the set has no roles.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Roles and their patterns, sorted by role.
    pub fn to_map(&self) -> BTreeMap<String, Vec<String>> {
        self.roles
            .iter()
            .map(|(role, p)| (role.clone(), p.patterns.clone()))
            .collect()
    }
}

/// Answers permission checks against the current rule set.
#[derive(Debug)]
pub struct PolicyEngine {
    rules: ArcSwap<RuleSet>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(RuleSet::default_rules())
    }
}

impl PolicyEngine {
    /// Creates an engine serving `rules`.
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules: ArcSwap::from_pointee(rules),
        }
    }

    /// The built-in rule set.
    pub fn default_rules() -> RuleSet {
        RuleSet::default_rules()
    }

    /// Whether `role` grants `permission`.
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        self.rules.load().has_permission(role, permission)
    }

    /// Whether `role` is defined.
    pub fn role_exists(&self, role: &str) -> bool {
        self.rules.load().roles.contains_key(role)
    }

    /// Defined roles, sorted.
    pub fn roles(&self) -> Vec<String> {
        let mut roles: Vec<String> = self.rules.load().roles.keys().cloned().collect();
        roles.sort();
        roles
    }

    /// Patterns configured for `role`, if it exists.
    pub fn permissions_for(&self, role: &str) -> Option<Vec<String>> {
        self.rules.load().roles.get(role).map(|p| p.patterns.clone())
    }

    /// Current rule set snapshot.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.rules.load_full()
    }

    /// Validates `rules` and swaps them in; on error the previous set stays.
    pub fn replace_rules<I, R, P>(&self, rules: I) -> Result<(), PolicyError>
    where
        I: IntoIterator<Item = (R, Vec<P>)>,
        R: AsRef<str>,
        P: AsRef<str>,
    {
        let rules = RuleSet::new(rules)?;
        self.install(rules);
        Ok(())
    }

    /// Swaps in an already validated rule set.
    pub fn install(&self, rules: RuleSet) {
        let roles = rules.len();
        self.rules.store(Arc::new(rules));
        info!(roles, "Installed policy rules");
    }
}
