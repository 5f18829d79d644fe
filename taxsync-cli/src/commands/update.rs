//! `taxsync update` — pull the remote hierarchy into the local taxonomy.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use taxsync_core::{config, SchemaRegistry, TaxonomyId};
use taxsync_engine::{BatchSize, SyncSession};
use taxsync_store::TaxonomyStore;

use super::{home_dir, print_summary, ServerArgs};

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Taxonomy to update.
    pub taxonomy: String,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Concepts per batch (1-100).
    #[arg(long, default_value_t = 25)]
    pub batch_size: usize,
}

impl UpdateArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let taxonomy = TaxonomyId::from(self.taxonomy.as_str());
        let connection = config::load_at(&home, &taxonomy)
            .with_context(|| format!("no connection for taxonomy '{taxonomy}'"))?;
        let client = self.server.client(Some(&connection.server_url))?;
        let mut store = TaxonomyStore::open_at(&home, &taxonomy)
            .with_context(|| format!("opening the node store for '{taxonomy}' failed"))?;

        let schema = SchemaRegistry::default();
        let actor = self
            .server
            .username
            .clone()
            .unwrap_or_else(|| "local".to_string());
        let session = SyncSession::new(&connection, &schema, &client, &home, actor);
        let batch = BatchSize::new(self.batch_size)?;

        println!(
            "Updating '{taxonomy}' from {} ...",
            connection.scheme_uri.to_string().bold()
        );
        let mut run = session
            .update(&mut store, batch)
            .context("update could not start — no local data was changed")?;
        while let Some(step) = run.next() {
            let progress = step.context("update aborted")?;
            println!(
                "  {} {} (remaining: {})",
                format!("[{}]", progress.phase).cyan(),
                progress.message,
                progress.remaining
            );
        }
        print_summary("Update", run.summary());
        Ok(())
    }
}
