//! `taxsync disconnect` — remove a connection and its sync state.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use taxsync_core::{config, TaxonomyId};
use taxsync_engine::state;
use taxsync_store::TaxonomyStore;

use super::home_dir;

#[derive(Args, Debug)]
pub struct DisconnectArgs {
    /// Taxonomy to disconnect.
    pub taxonomy: String,

    /// Keep the local nodes; only drop the connection, hash records, and
    /// run log.
    #[arg(long)]
    pub keep_nodes: bool,
}

impl DisconnectArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let taxonomy = TaxonomyId::from(self.taxonomy.as_str());

        config::delete_at(&home, &taxonomy)
            .with_context(|| format!("no connection for taxonomy '{taxonomy}'"))?;
        state::delete_all_at(&home, &taxonomy)
            .context("removing synchronization state failed")?;
        if !self.keep_nodes {
            TaxonomyStore::delete_at(&home, &taxonomy).context("removing local nodes failed")?;
        }

        let kept = if self.keep_nodes {
            " (local nodes kept)"
        } else {
            ""
        };
        println!("{} '{taxonomy}' disconnected{kept}", "✓".green());
        Ok(())
    }
}
