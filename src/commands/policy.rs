//! Policy commands.

use clap::Args;
use serde_json::json;

use warden_auth::PolicyEngine;
use warden_core::config::AppConfig;

/// Arguments for `authorize`.
#[derive(Debug, Args)]
pub struct AuthorizeArgs {
    /// Role name
    #[arg(long)]
    pub role: String,
    /// Permission to check, e.g. `user:read`
    #[arg(long)]
    pub permission: String,
    /// Policy file overriding `policy.path`
    #[arg(long)]
    pub policy: Option<String>,
}

/// Load the policy named by the arguments or configuration.
pub fn load_policy(override_path: Option<&str>, config: &AppConfig) -> anyhow::Result<PolicyEngine> {
    match override_path.or(config.policy.path.as_deref()) {
        Some(path) => Ok(PolicyEngine::from_file(path)?),
        None => Ok(PolicyEngine::default()),
    }
}

/// Print whether the role grants the permission.
pub fn authorize(args: &AuthorizeArgs, config: &AppConfig) -> anyhow::Result<()> {
    let engine = load_policy(args.policy.as_deref(), config)?;
    let out = json!({
        "role": args.role,
        "permission": args.permission,
        "role_exists": engine.role_exists(&args.role),
        "allowed": engine.has_permission(&args.role, &args.permission),
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
