//! Token commands.

use anyhow::Context;
use clap::Args;
use serde_json::json;

use warden_core::config::AppConfig;

/// Arguments for `issue`.
#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Token subject (principal id)
    #[arg(long)]
    pub subject: String,
    /// Role to embed
    #[arg(long)]
    pub role: String,
}

/// Arguments for `verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// The access token
    pub token: String,
}

/// Issue a token and print it with its expiry.
pub fn issue(args: &IssueArgs, config: &AppConfig) -> anyhow::Result<()> {
    let service = super::token_service(config)?;
    let (token, expires_at) = service
        .issue_with_expiry(&args.subject, &args.role)
        .context("cannot issue token")?;
    let out = json!({
        "access_token": token,
        "token_type": "Bearer",
        "expires_at": expires_at,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Validate a token and print its claims.
///
/// Operators get the precise rejection reason here; clients never do.
pub fn verify(args: &VerifyArgs, config: &AppConfig) -> anyhow::Result<()> {
    let service = super::token_service(config)?;
    let claims = service
        .validate(args.token.trim())
        .context("token rejected")?;
    println!("{}", serde_json::to_string_pretty(&claims)?);
    Ok(())
}
