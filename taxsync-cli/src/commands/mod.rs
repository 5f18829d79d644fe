pub mod connect;
pub mod disconnect;
pub mod export;
pub mod log;
pub mod projects;
pub mod status;
pub mod update;

use anyhow::{Context, Result};
use clap::Args;

use crate::ppt::PptClient;

/// Remote server flags shared by every subcommand that talks to the
/// thesaurus. Credentials fall back to environment variables and are
/// never persisted.
#[derive(Args, Debug)]
pub struct ServerArgs {
    /// Base URL of the thesaurus server (falls back to the stored
    /// connection for commands operating on one).
    #[arg(long)]
    pub server: Option<String>,

    /// Username for the remote server.
    #[arg(long, env = "TAXSYNC_USERNAME")]
    pub username: Option<String>,

    /// Password for the remote server.
    #[arg(long, env = "TAXSYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

impl ServerArgs {
    pub fn client(&self, fallback_url: Option<&str>) -> Result<PptClient> {
        let url = self
            .server
            .as_deref()
            .or(fallback_url)
            .context("no server URL; pass --server or connect the taxonomy first")?;
        Ok(PptClient::new(
            url,
            self.username.as_deref(),
            self.password.as_deref(),
        ))
    }
}

pub fn home_dir() -> Result<std::path::PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

pub fn print_summary(verb: &str, summary: &taxsync_engine::RunSummary) {
    use colored::Colorize;
    println!(
        "{} {verb} finished: {} created, {} updated, {} skipped, {} deleted, {} failed",
        "✓".green(),
        summary.created,
        summary.updated,
        summary.skipped,
        summary.deleted,
        summary.failed
    );
}
