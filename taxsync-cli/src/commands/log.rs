//! `taxsync log` — the audit trail of one taxonomy.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use taxsync_core::TaxonomyId;
use taxsync_engine::state;

use super::home_dir;

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Taxonomy whose runs to show.
    pub taxonomy: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LogEntry {
    configuration: String,
    started: String,
    finished: String,
    duration_seconds: i64,
    actor: String,
}

#[derive(Tabled)]
struct LogRow {
    #[tabled(rename = "started")]
    started: String,
    #[tabled(rename = "finished")]
    finished: String,
    #[tabled(rename = "duration")]
    duration: String,
    #[tabled(rename = "actor")]
    actor: String,
}

impl LogArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let taxonomy = TaxonomyId::from(self.taxonomy.as_str());
        let logs = state::load_logs_at(&home, &taxonomy)
            .with_context(|| format!("loading the log for '{taxonomy}' failed"))?;
        if logs.is_empty() {
            println!("No synchronization runs recorded for '{taxonomy}'.");
            return Ok(());
        }

        let entries: Vec<LogEntry> = logs
            .iter()
            .map(|l| LogEntry {
                configuration: l.configuration.clone(),
                started: l.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                finished: l.end_time.format("%Y-%m-%d %H:%M:%S").to_string(),
                duration_seconds: (l.end_time - l.start_time).num_seconds(),
                actor: l.actor.clone(),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        let rows: Vec<LogRow> = entries
            .into_iter()
            .map(|e| LogRow {
                started: e.started,
                finished: e.finished,
                duration: format!("{}s", e.duration_seconds),
                actor: e.actor,
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}
