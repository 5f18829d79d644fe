//! Remote concept service contract and remote-side data model.
//!
//! The transport is out of scope here: the CLI carries an HTTP client and
//! the engine tests carry an in-memory fake, both implementing
//! [`ConceptService`]. Remote data is fetched fresh each run and never
//! persisted as-is.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ConceptUri, LangTag};

// ---------------------------------------------------------------------------
// Remote data model
// ---------------------------------------------------------------------------

/// A single remote concept as fetched for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConcept {
    pub uri: ConceptUri,
    pub pref_label: String,
    #[serde(default)]
    pub alt_labels: Vec<String>,
    #[serde(default)]
    pub hidden_labels: Vec<String>,
    #[serde(default)]
    pub definitions: Vec<String>,
    /// Custom property values keyed by remote property (e.g. `skos:exactMatch`).
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Parent concept URIs; more than one entry is legal.
    #[serde(default)]
    pub broaders: Vec<ConceptUri>,
}

impl RemoteConcept {
    pub fn new(uri: impl Into<ConceptUri>, pref_label: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            pref_label: pref_label.into(),
            alt_labels: Vec::new(),
            hidden_labels: Vec::new(),
            definitions: Vec::new(),
            properties: BTreeMap::new(),
            broaders: Vec::new(),
        }
    }
}

/// A nested concept hierarchy as returned by the remote subtree call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptTree {
    pub concept: RemoteConcept,
    #[serde(default)]
    pub narrowers: Vec<ConceptTree>,
}

impl ConceptTree {
    pub fn leaf(concept: RemoteConcept) -> Self {
        Self {
            concept,
            narrowers: Vec::new(),
        }
    }
}

/// A remote project (the container concept schemes live in).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub available_languages: Vec<LangTag>,
}

/// A remote concept scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeInfo {
    pub uri: ConceptUri,
    pub title: String,
    #[serde(default)]
    pub descriptions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`ConceptService`] implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The service cannot be reached or rejected the credentials. Aborts
    /// the whole run.
    #[error("remote service unavailable: {message}")]
    Unavailable { message: String },

    /// Invalid project, scheme, or language. Aborts before any batch is
    /// scheduled.
    #[error("remote validation failed: {message}")]
    Validation { message: String },

    /// One node's write failed; the batch continues without it.
    #[error("remote operation '{operation}' failed: {message}")]
    Item { operation: String, message: String },
}

impl RemoteError {
    /// Whether this error must abort all remaining phases of a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Validation { .. })
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn item(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Item {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service trait
// ---------------------------------------------------------------------------

/// Operations the synchronization engine consumes from the remote
/// thesaurus service.
///
/// All calls are blocking; the engine issues them strictly sequentially
/// because relation writes are order-sensitive.
pub trait ConceptService {
    fn list_projects(&self) -> Result<Vec<ProjectInfo>, RemoteError>;

    fn list_concept_schemes(&self, project: &str) -> Result<Vec<SchemeInfo>, RemoteError>;

    fn create_concept_scheme(
        &self,
        project: &str,
        title: &str,
        description: &str,
    ) -> Result<ConceptUri, RemoteError>;

    fn get_top_concepts(
        &self,
        project: &str,
        scheme: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<Vec<ConceptUri>, RemoteError>;

    fn get_sub_tree(
        &self,
        project: &str,
        scheme: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<Vec<ConceptTree>, RemoteError>;

    fn get_concept(
        &self,
        project: &str,
        uri: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<RemoteConcept, RemoteError>;

    /// Create a concept under `parent` (which may be the scheme URI for a
    /// top concept) and return its URI.
    fn create_concept(
        &self,
        project: &str,
        label: &str,
        parent: &ConceptUri,
    ) -> Result<ConceptUri, RemoteError>;

    fn add_literal(
        &self,
        project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError>;

    fn add_custom_attribute(
        &self,
        project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError>;

    /// Add an additional broader relation from `child` to `parent`.
    fn add_relation(
        &self,
        project: &str,
        child: &ConceptUri,
        parent: &ConceptUri,
    ) -> Result<(), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(RemoteError::unavailable("down").is_fatal());
        assert!(RemoteError::validation("bad scheme").is_fatal());
        assert!(!RemoteError::item("createConcept", "409").is_fatal());
    }

    #[test]
    fn concept_tree_serde_roundtrip() {
        let tree = ConceptTree {
            concept: RemoteConcept::new("http://x/a", "A"),
            narrowers: vec![ConceptTree::leaf(RemoteConcept::new("http://x/b", "B"))],
        };
        let yaml = serde_yaml::to_string(&tree).expect("serialize");
        let back: ConceptTree = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(back, tree);
    }
}
