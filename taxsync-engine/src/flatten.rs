//! Flattening of nested concept trees into a batch-ready work list.
//!
//! The remote subtree call returns nested [`ConceptTree`] values; batching
//! wants a flat, parent-first list. Flattening is pure: it never touches
//! the store or the remote service.

use std::collections::BTreeSet;

use taxsync_core::{ConceptTree, ConceptUri, LangTag, RemoteConcept};

/// One unit of update work: a concept as fetched for one language pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatConcept {
    pub concept: RemoteConcept,
    /// Local language the content belongs to.
    pub local_lang: LangTag,
    /// Remote project language the content was fetched under.
    pub remote_lang: LangTag,
}

impl FlatConcept {
    /// The composite identity of this work unit.
    pub fn key(&self) -> String {
        composite_key(&self.concept.uri, &self.remote_lang)
    }
}

/// Composite `uri@lang` key distinguishing per-language occurrences of a
/// concept. URIs never contain `@` followed by a bare language tag at the
/// end, so the form is unambiguous in practice.
pub fn composite_key(uri: &ConceptUri, lang: &LangTag) -> String {
    format!("{}@{}", uri.0, lang.0)
}

/// Flatten nested trees into a depth-first, parent-first work list.
///
/// A concept reachable through several parents appears once, at its first
/// (shallowest-first-encountered) position. Depth-0 concepts that are not
/// known top concepts are entry points into the middle of the hierarchy;
/// their broader links point outside the fetched forest and are dropped so
/// they root cleanly.
pub fn flatten_concept_trees(
    trees: &[ConceptTree],
    local_lang: &LangTag,
    remote_lang: &LangTag,
    top_concepts: &BTreeSet<ConceptUri>,
) -> Vec<FlatConcept> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for tree in trees {
        walk(tree, 0, local_lang, remote_lang, top_concepts, &mut seen, &mut out);
    }
    out
}

fn walk(
    tree: &ConceptTree,
    depth: usize,
    local_lang: &LangTag,
    remote_lang: &LangTag,
    top_concepts: &BTreeSet<ConceptUri>,
    seen: &mut BTreeSet<ConceptUri>,
    out: &mut Vec<FlatConcept>,
) {
    if seen.insert(tree.concept.uri.clone()) {
        let mut concept = tree.concept.clone();
        if depth == 0 && !top_concepts.contains(&concept.uri) {
            concept.broaders.clear();
        }
        out.push(FlatConcept {
            concept,
            local_lang: local_lang.clone(),
            remote_lang: remote_lang.clone(),
        });
    }
    for narrower in &tree.narrowers {
        walk(narrower, depth + 1, local_lang, remote_lang, top_concepts, seen, out);
    }
}
