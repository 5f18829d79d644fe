//! Batch scheduling primitives shared by export and update runs.
//!
//! A run is an iterator of batches; the types here carry the knobs going in
//! (validated [`BatchSize`]) and the progress coming out ([`BatchProgress`]
//! per batch, [`RunSummary`] at the end).

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::SyncError;

pub const MIN_BATCH_SIZE: usize = 1;
pub const MAX_BATCH_SIZE: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Number of work units per batch, validated to 1–100 at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(usize);

impl BatchSize {
    pub fn new(size: usize) -> Result<Self, SyncError> {
        if !(MIN_BATCH_SIZE..=MAX_BATCH_SIZE).contains(&size) {
            return Err(SyncError::InvalidBatchSize { given: size });
        }
        Ok(Self(size))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(DEFAULT_BATCH_SIZE)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    // Export phases.
    CreateConcepts,
    FinalizeHashes,
    ExportTranslations,
    // Update phases.
    ReconcileContent,
    ReconcileParents,
    DeleteOrphans,
    // Shared final phase.
    WriteLog,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::CreateConcepts => "create concepts",
            Phase::FinalizeHashes => "finalize hashes",
            Phase::ExportTranslations => "export translations",
            Phase::ReconcileContent => "reconcile content",
            Phase::ReconcileParents => "reconcile parents",
            Phase::DeleteOrphans => "delete orphans",
            Phase::WriteLog => "write log",
        };
        f.write_str(name)
    }
}

/// One progress event, emitted after each committed batch.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub phase: Phase,
    /// Work units processed so far in this phase.
    pub processed: usize,
    /// Total work units in this phase.
    pub total: usize,
    /// Run-wide counters as of this batch.
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub message: String,
    /// Human-readable estimate of the remaining phase time.
    pub remaining: String,
}

/// Aggregate counters for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub deleted: usize,
    /// Work units dropped after a non-fatal per-item remote failure.
    pub failed: usize,
}

/// Estimate the remaining time from elapsed time and progress, formatted
/// as hours/minutes/seconds with zero components dropped.
pub fn remaining_time(started_at: DateTime<Utc>, processed: usize, total: usize) -> String {
    if processed >= total {
        return "Done.".to_string();
    }
    if processed == 0 {
        return "estimating".to_string();
    }
    let elapsed = (Utc::now() - started_at).num_seconds().max(0) as f64;
    let per_unit = elapsed / processed as f64;
    let remaining = (per_unit * (total - processed) as f64).round() as i64;
    format_duration(remaining)
}

fn format_duration(mut seconds: i64) -> String {
    if seconds < 1 {
        return "< 1 second".to_string();
    }
    let hours = seconds / 3600;
    seconds %= 3600;
    let minutes = seconds / 60;
    seconds %= 60;

    let mut parts = Vec::new();
    for (count, unit) in [(hours, "hour"), (minutes, "minute"), (seconds, "second")] {
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            parts.push(format!("{count} {unit}{plural}"));
        }
    }
    parts.join(" ")
}
