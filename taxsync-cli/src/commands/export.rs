//! `taxsync export` — push the local tree into the connected scheme.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use taxsync_core::{config, SchemaRegistry, TaxonomyId};
use taxsync_engine::{BatchSize, SyncSession};
use taxsync_store::TaxonomyStore;

use super::{home_dir, print_summary, ServerArgs};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Taxonomy to export.
    pub taxonomy: String,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Nodes per batch (1-100).
    #[arg(long, default_value_t = 25)]
    pub batch_size: usize,
}

impl ExportArgs {
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
            "Exporting '{taxonomy}' to {} ...",
            connection.scheme_uri.to_string().bold()
        );
        let mut run = session
            .export(&mut store, batch)
            .context("export could not start")?;
        while let Some(step) = run.next() {
            let progress = step.context("export aborted")?;
            println!(
                "  {} {} (remaining: {})",
                format!("[{}]", progress.phase).cyan(),
                progress.message,
                progress.remaining
            );
        }
        print_summary("Export", run.summary());
        Ok(())
    }
}
