//! Domain types for taxonomy synchronization.
//!
//! All timestamps are `DateTime<Utc>`; all types are serializable via
//! serde + serde_yaml so the store and configuration layers can persist
//! them directly.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed identifier for a local taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaxonomyId(pub String);

impl TaxonomyId {
    /// Derive a machine-readable taxonomy id from a human-readable title:
    /// lowercase, non-alphanumeric runs collapsed to `_`, capped at 32 chars.
    pub fn from_title(title: &str) -> Self {
        let mut out = String::new();
        let mut last_underscore = false;
        for c in title.to_lowercase().chars() {
            if c.is_ascii_alphanumeric() {
                out.push(c);
                last_underscore = false;
            } else if !last_underscore {
                out.push('_');
                last_underscore = true;
            }
            if out.len() >= 32 {
                break;
            }
        }
        Self(out)
    }
}

impl fmt::Display for TaxonomyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for TaxonomyId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaxonomyId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A local node identifier. Id `0` is reserved for the virtual root of the
/// hierarchy and never refers to a stored node.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub u64);

impl NodeId {
    /// The virtual root of a taxonomy tree.
    pub const ROOT: NodeId = NodeId(0);

    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The URI of a remote concept or concept scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConceptUri(pub String);

impl fmt::Display for ConceptUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ConceptUri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConceptUri {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A language tag, either local (e.g. `en`) or remote project-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LangTag(pub String);

impl LangTag {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for LangTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for LangTag {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LangTag {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A language variant of a local node, for every configured language other
/// than the default one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Translation {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub alt_labels: Vec<String>,
    #[serde(default)]
    pub hidden_labels: Vec<String>,
    /// Custom field values keyed by field id.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
}

/// A node in the local hierarchical store.
///
/// Parent links form a DAG: a node may carry more than one parent id, and
/// [`NodeId::ROOT`] marks a top-level placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Back-reference to the remote concept, set once the node has been
    /// exported or imported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<ConceptUri>,
    #[serde(default)]
    pub alt_labels: Vec<String>,
    #[serde(default)]
    pub hidden_labels: Vec<String>,
    /// Custom field values keyed by field id.
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
    #[serde(default)]
    pub parents: Vec<NodeId>,
    /// Per-language variants, keyed by local language tag.
    #[serde(default)]
    pub translations: BTreeMap<LangTag, Translation>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalNode {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: String::new(),
            uri: None,
            alt_labels: Vec::new(),
            hidden_labels: Vec::new(),
            custom: BTreeMap::new(),
            parents: Vec::new(),
            translations: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A connection between a local taxonomy and a remote concept scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfiguration {
    /// Configuration id, referenced from [`SyncLog`] rows.
    pub id: String,
    pub taxonomy: TaxonomyId,
    pub scheme_uri: ConceptUri,
    /// Remote project the scheme lives in.
    pub project_id: String,
    /// Base URL of the remote thesaurus server.
    pub server_url: String,
    /// Language map: local language -> remote project language. Entries with
    /// an empty remote tag are ignored by [`crate::config::ordered_languages`].
    pub languages: BTreeMap<LangTag, LangTag>,
    pub default_language: LangTag,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Last-synchronized hash state for one (node, language) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub node: NodeId,
    /// Remote language tag the content was synced under.
    pub language: LangTag,
    pub uri: ConceptUri,
    pub hash: String,
    pub synced: DateTime<Utc>,
}

/// One completed synchronization run, append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncLog {
    pub configuration: String,
    pub taxonomy: TaxonomyId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub actor: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
