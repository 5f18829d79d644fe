//! YAML-backed taxonomy node store.
//!
//! # Storage layout
//!
//! ```text
//! ~/.taxsync/
//!   nodes/
//!     <taxonomy_id>.yaml   (all nodes of one taxonomy — mode 0600)
//! ```
//!
//! Opening a store for a taxonomy that has no file yet yields an empty
//! store; the file appears on the first [`TaxonomyStore::save`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taxsync_core::types::{ConceptUri, LangTag, LocalNode, NodeId, TaxonomyId, Translation};

use crate::error::StoreError;

/// On-disk node store payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeDocument {
    updated_at: DateTime<Utc>,
    /// Next node id to hand out; id 0 is the virtual root.
    next_id: u64,
    nodes: BTreeMap<NodeId, LocalNode>,
}

impl Default for NodeDocument {
    fn default() -> Self {
        Self {
            updated_at: Utc::now(),
            next_id: 1,
            nodes: BTreeMap::new(),
        }
    }
}

/// One branch of the nested tree view: a node id plus its child branches,
/// in discovery (node id) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBranch {
    pub id: NodeId,
    pub children: Vec<NodeBranch>,
}

/// An open node store for a single taxonomy.
///
/// Mutations happen in memory; [`TaxonomyStore::save`] commits the whole
/// document atomically. The engine calls `save` at batch boundaries so an
/// interrupted run keeps all fully processed batches.
pub struct TaxonomyStore {
    path: PathBuf,
    taxonomy: TaxonomyId,
    doc: NodeDocument,
}

impl TaxonomyStore {
    /// `<home>/.taxsync/nodes/<taxonomy>.yaml` — pure, no I/O.
    pub fn path_at(home: &Path, taxonomy: &TaxonomyId) -> PathBuf {
        home.join(".taxsync")
            .join("nodes")
            .join(format!("{}.yaml", taxonomy.0))
    }

    /// Open (or create empty in memory) the store for `taxonomy`.
    pub fn open_at(home: &Path, taxonomy: &TaxonomyId) -> Result<Self, StoreError> {
        let path = Self::path_at(home, taxonomy);
        let doc = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&contents).map_err(|e| StoreError::Parse {
                path: path.clone(),
                source: e,
            })?
        } else {
            NodeDocument::default()
        };
        Ok(Self {
            path,
            taxonomy: taxonomy.clone(),
            doc,
        })
    }

    /// `open_at` convenience wrapper.
    pub fn open(taxonomy: &TaxonomyId) -> Result<Self, StoreError> {
        let home = dirs::home_dir().ok_or(StoreError::HomeNotFound)?;
        Self::open_at(&home, taxonomy)
    }

    pub fn taxonomy(&self) -> &TaxonomyId {
        &self.taxonomy
    }

    /// Atomically persist the whole document (`.yaml.tmp` + rename).
    pub fn save(&mut self) -> Result<(), StoreError> {
        let Some(dir) = self.path.parent() else {
            return Err(StoreError::Io(std::io::Error::other(
                "invalid node store path",
            )));
        };
        std::fs::create_dir_all(dir)?;
        set_dir_permissions(dir)?;

        self.doc.updated_at = Utc::now();
        let yaml = serde_yaml::to_string(&self.doc)?;
        let tmp = self.path.with_extension("yaml.tmp");
        std::fs::write(&tmp, yaml)?;
        set_file_permissions(&tmp)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Delete the backing file (used when a connection is removed along
    /// with its taxonomy data). Missing file is not an error.
    pub fn delete_at(home: &Path, taxonomy: &TaxonomyId) -> Result<(), StoreError> {
        let path = Self::path_at(home, taxonomy);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    // -----------------------------------------------------------------------
    // Node CRUD
    // -----------------------------------------------------------------------

    /// Create a node with the next free id and no parents.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.doc.next_id);
        self.doc.next_id += 1;
        self.doc.nodes.insert(id, LocalNode::new(id, name));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&LocalNode> {
        self.doc.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut LocalNode> {
        let node = self.doc.nodes.get_mut(&id)?;
        node.updated_at = Utc::now();
        Some(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.doc.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.doc.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.nodes.is_empty()
    }

    /// All nodes in id order.
    pub fn iter(&self) -> impl Iterator<Item = &LocalNode> {
        self.doc.nodes.values()
    }

    /// Remove a node and every edge pointing at it.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), StoreError> {
        if self.doc.nodes.remove(&id).is_none() {
            return Err(StoreError::NodeNotFound { id });
        }
        for node in self.doc.nodes.values_mut() {
            node.parents.retain(|p| *p != id);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Hierarchy
    // -----------------------------------------------------------------------

    /// Replace — not merge — a node's parent set (full overwrite per run).
    pub fn set_parents(&mut self, id: NodeId, parents: Vec<NodeId>) -> Result<(), StoreError> {
        let node = self
            .doc
            .nodes
            .get_mut(&id)
            .ok_or(StoreError::NodeNotFound { id })?;
        node.parents = parents;
        node.updated_at = Utc::now();
        Ok(())
    }

    /// A node's parent ids; empty when the node sits at the top level
    /// without an explicit root edge.
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.doc
            .nodes
            .get(&id)
            .map(|n| n.parents.clone())
            .unwrap_or_default()
    }

    /// First node (in id order) carrying this remote URI, if any.
    pub fn find_by_uri(&self, uri: &ConceptUri) -> Option<NodeId> {
        self.doc
            .nodes
            .values()
            .find(|n| n.uri.as_ref() == Some(uri))
            .map(|n| n.id)
    }

    /// The nested tree view: roots are nodes with no parents or an explicit
    /// root edge; children appear in id order.
    pub fn load_tree(&self) -> Vec<NodeBranch> {
        let mut children_of: BTreeMap<NodeId, Vec<NodeId>> = BTreeMap::new();
        let mut roots: Vec<NodeId> = Vec::new();
        for node in self.doc.nodes.values() {
            if node.parents.is_empty() || node.parents.contains(&NodeId::ROOT) {
                roots.push(node.id);
            }
            for parent in &node.parents {
                if !parent.is_root() {
                    children_of.entry(*parent).or_default().push(node.id);
                }
            }
        }
        roots
            .into_iter()
            .map(|id| self.build_branch(id, &children_of))
            .collect()
    }

    fn build_branch(&self, id: NodeId, children_of: &BTreeMap<NodeId, Vec<NodeId>>) -> NodeBranch {
        let children = children_of
            .get(&id)
            .map(|ids| {
                ids.iter()
                    .map(|child| self.build_branch(*child, children_of))
                    .collect()
            })
            .unwrap_or_default();
        NodeBranch { id, children }
    }

    /// Flat depth-first traversal in parent-first order: every node appears
    /// after all of its ancestors. Nodes with multiple parents appear once,
    /// at their first discovery.
    pub fn flat_tree(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack: Vec<NodeBranch> = self.load_tree();
        stack.reverse();
        while let Some(branch) = stack.pop() {
            if seen.insert(branch.id) {
                order.push(branch.id);
            }
            for child in branch.children.into_iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    // -----------------------------------------------------------------------
    // Translations
    // -----------------------------------------------------------------------

    /// Set or replace a node's variant for a local language.
    pub fn set_translation(
        &mut self,
        id: NodeId,
        lang: LangTag,
        translation: Translation,
    ) -> Result<(), StoreError> {
        let node = self
            .doc
            .nodes
            .get_mut(&id)
            .ok_or(StoreError::NodeNotFound { id })?;
        node.translations.insert(lang, translation);
        node.updated_at = Utc::now();
        Ok(())
    }

    pub fn translation(&self, id: NodeId, lang: &LangTag) -> Option<&Translation> {
        self.doc.nodes.get(&id)?.translations.get(lang)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
