//! CLI command definitions and dispatch.

pub mod check;
pub mod policy;
pub mod run;
pub mod token;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use warden_auth::{SigningKeySet, TokenService, TokenSettings};
use warden_core::clock::SystemClock;
use warden_core::config::AppConfig;

/// Warden: token issuing, refresh rotation, RBAC and admission control
#[derive(Debug, Parser)]
#[command(name = "warden", version, about, long_about = None)]
pub struct Cli {
    /// Base configuration file (extension optional)
    #[arg(short, long, default_value = "config/default")]
    pub config: String,

    /// Environment overlay loaded from `config/<env>`
    #[arg(short, long, env = "WARDEN_ENV", default_value = "development")]
    pub env: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Check keys and store, then reload the policy on SIGHUP until interrupted
    Run(run::RunArgs),
    /// Issue an access token
    Issue(token::IssueArgs),
    /// Validate an access token and print its claims
    Verify(token::VerifyArgs),
    /// Check whether a role grants a permission
    Authorize(policy::AuthorizeArgs),
    /// Validate configuration, keys and policy, then exit
    CheckConfig,
}

impl Cli {
    /// Execute the selected command.
    pub async fn execute(&self, config: AppConfig) -> anyhow::Result<()> {
        match &self.command {
            Commands::Run(args) => run::execute(args, config).await,
            Commands::Issue(args) => token::issue(args, &config),
            Commands::Verify(args) => token::verify(args, &config),
            Commands::Authorize(args) => policy::authorize(args, &config),
            Commands::CheckConfig => check::execute(&config).await,
        }
    }
}

/// Token service on the system clock.
pub fn token_service(config: &AppConfig) -> anyhow::Result<TokenService> {
    let keys = SigningKeySet::from_config(&config.token)?;
    Ok(TokenService::new(
        keys,
        TokenSettings::from_config(&config.token),
        Arc::new(SystemClock),
    ))
}
