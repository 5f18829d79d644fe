//! Persistent synchronization state: hash records and run logs.
//!
//! # Storage layout
//!
//! ```text
//! ~/.taxsync/
//!   state/
//!     <taxonomy_id>.json       (hash records — mode 0600)
//!     <taxonomy_id>.log.json   (append-only run log — mode 0600)
//! ```
//!
//! The hash file is rewritten at every batch boundary, so a cancelled run
//! keeps the records of all completed batches. A run that has records newer
//! than the last log entry was aborted mid-way.
//!
//! Every path-touching function has an `_at(home, …)` form for tests; the
//! no-arg wrappers derive home from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taxsync_core::{ConceptUri, HashRecord, LangTag, NodeId, SyncLog, TaxonomyId};

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// State file
// ---------------------------------------------------------------------------

/// The hash records of one taxonomy, one entry per (node, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    /// When the records were last committed.
    pub synced_at: DateTime<Utc>,
    #[serde(default)]
    pub records: Vec<HashRecord>,
}

impl StateFile {
    pub fn empty() -> Self {
        Self {
            synced_at: Utc::now(),
            records: Vec::new(),
        }
    }

    /// Record for a (node, language) pair, if any.
    pub fn get(&self, node: NodeId, language: &LangTag) -> Option<&HashRecord> {
        self.records
            .iter()
            .find(|r| r.node == node && r.language == *language)
    }

    /// Record for a (uri, language) pair, if any. Used by updates, where the
    /// remote side only knows URIs.
    pub fn find_by_uri(&self, uri: &ConceptUri, language: &LangTag) -> Option<&HashRecord> {
        self.records
            .iter()
            .find(|r| r.uri == *uri && r.language == *language)
    }

    /// Insert or replace the record for `record`'s (node, language) pair.
    pub fn upsert(&mut self, record: HashRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.node == record.node && r.language == record.language)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Drop all records for `node` (every language). Returns how many were
    /// removed.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.node != node);
        before - self.records.len()
    }

    /// All node ids with at least one record, deduplicated and sorted.
    pub fn tracked_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.records.iter().map(|r| r.node).collect();
        nodes.sort();
        nodes.dedup();
        nodes
    }
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// `<home>/.taxsync/state/<taxonomy>.json` — pure, no I/O.
pub fn state_path_at(home: &Path, taxonomy: &TaxonomyId) -> PathBuf {
    state_dir(home).join(format!("{}.json", taxonomy.0))
}

/// `<home>/.taxsync/state/<taxonomy>.log.json` — pure, no I/O.
pub fn log_path_at(home: &Path, taxonomy: &TaxonomyId) -> PathBuf {
    state_dir(home).join(format!("{}.log.json", taxonomy.0))
}

fn state_dir(home: &Path) -> PathBuf {
    home.join(".taxsync").join("state")
}

fn ensure_state_dir(home: &Path) -> Result<PathBuf, SyncError> {
    let dir = state_dir(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        set_dir_permissions(&dir)?;
    }
    Ok(dir)
}

// ---------------------------------------------------------------------------
// Hash records
// ---------------------------------------------------------------------------

/// Load the hash records for `taxonomy`; an absent file is an empty state,
/// not an error.
pub fn load_at(home: &Path, taxonomy: &TaxonomyId) -> Result<StateFile, SyncError> {
    let path = state_path_at(home, taxonomy);
    if !path.exists() {
        return Ok(StateFile::empty());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Atomically save the hash records for `taxonomy`.
///
/// Write flow: serialize → `.json.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, taxonomy: &TaxonomyId, state: &StateFile) -> Result<(), SyncError> {
    ensure_state_dir(home)?;
    let path = state_path_at(home, taxonomy);
    let tmp = path.with_file_name(format!("{}.json.tmp", taxonomy.0));

    let mut stamped = state.clone();
    stamped.synced_at = Utc::now();
    let json = serde_json::to_string_pretty(&stamped)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Run logs
// ---------------------------------------------------------------------------

/// Append one completed run to the log file.
pub fn append_log_at(home: &Path, taxonomy: &TaxonomyId, entry: SyncLog) -> Result<(), SyncError> {
    let mut logs = load_logs_at(home, taxonomy)?;
    logs.push(entry);

    ensure_state_dir(home)?;
    let path = log_path_at(home, taxonomy);
    let tmp = path.with_file_name(format!("{}.log.json.tmp", taxonomy.0));
    let json = serde_json::to_string_pretty(&logs)?;
    std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// All run log entries for `taxonomy`, oldest first; empty when absent.
pub fn load_logs_at(home: &Path, taxonomy: &TaxonomyId) -> Result<Vec<SyncLog>, SyncError> {
    let path = log_path_at(home, taxonomy);
    if !path.exists() {
        return Ok(vec![]);
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

/// `load_logs_at` convenience wrapper.
pub fn load_logs(taxonomy: &TaxonomyId) -> Result<Vec<SyncLog>, SyncError> {
    load_logs_at(&home()?, taxonomy)
}

/// `load_at` convenience wrapper.
pub fn load(taxonomy: &TaxonomyId) -> Result<StateFile, SyncError> {
    load_at(&home()?, taxonomy)
}

/// Remove both state files of `taxonomy`; absent files are fine. Used when
/// a connection is deleted.
pub fn delete_all_at(home: &Path, taxonomy: &TaxonomyId) -> Result<(), SyncError> {
    for path in [state_path_at(home, taxonomy), log_path_at(home, taxonomy)] {
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, SyncError> {
    Ok(dirs::home_dir().ok_or(taxsync_core::ConfigError::HomeNotFound)?)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), SyncError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), SyncError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
