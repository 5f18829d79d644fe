//! `taxsync status` — connection overview with last-run state.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use taxsync_core::config;
use taxsync_engine::state;
use taxsync_store::TaxonomyStore;

use super::home_dir;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct ConnectionStatus {
    taxonomy: String,
    scheme: String,
    server: String,
    languages: String,
    nodes: usize,
    tracked: usize,
    last_sync: Option<String>,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "taxonomy")]
    taxonomy: String,
    #[tabled(rename = "scheme")]
    scheme: String,
    #[tabled(rename = "languages")]
    languages: String,
    #[tabled(rename = "nodes")]
    nodes: usize,
    #[tabled(rename = "tracked")]
    tracked: usize,
    #[tabled(rename = "last sync")]
    last_sync: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let connections = config::list_at(&home).context("loading connections failed")?;
        if connections.is_empty() {
            println!("No connections. Run `taxsync connect` first.");
            return Ok(());
        }

        let mut statuses = Vec::new();
        for connection in &connections {
            let store = TaxonomyStore::open_at(&home, &connection.taxonomy)?;
            let recorded = state::load_at(&home, &connection.taxonomy)?;
            let logs = state::load_logs_at(&home, &connection.taxonomy)?;
            let languages = connection
                .languages
                .iter()
                .filter(|(_, remote)| !remote.is_empty())
                .map(|(local, remote)| format!("{local}={remote}"))
                .collect::<Vec<_>>()
                .join(", ");
            statuses.push(ConnectionStatus {
                taxonomy: connection.taxonomy.to_string(),
                scheme: connection.scheme_uri.to_string(),
                server: connection.server_url.clone(),
                languages,
                nodes: store.len(),
                tracked: recorded.records.len(),
                last_sync: logs
                    .last()
                    .map(|l| l.end_time.format("%Y-%m-%d %H:%M:%S").to_string()),
            });
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&statuses)?);
            return Ok(());
        }

        let rows: Vec<StatusRow> = statuses
            .into_iter()
            .map(|s| StatusRow {
                taxonomy: s.taxonomy,
                scheme: s.scheme,
                languages: s.languages,
                nodes: s.nodes,
                tracked: s.tracked,
                last_sync: match s.last_sync {
                    Some(at) => at,
                    None => "never".yellow().to_string(),
                },
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
