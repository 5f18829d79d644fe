//! Canonical content hashing for change detection.
//!
//! Every (concept, language) pair is reduced to a canonical byte string and
//! digested with SHA-256. Updates compare the stored hash against the hash
//! of freshly fetched remote content; equal hashes skip the node without
//! touching the store.
//!
//! Canonical form rules:
//! - list-valued fields (labels, definitions, broaders) are sorted, so the
//!   hash is independent of remote response ordering
//! - every value is whitespace-normalized (interior runs collapsed to one
//!   space, ends trimmed)
//! - each field is emitted as its own `name\tvalue\n` line, so values
//!   cannot bleed into each other

use sha2::{Digest, Sha256};

use taxsync_core::{LangTag, RemoteConcept};

/// Hash one concept's content as fetched for `lang`.
///
/// The language is part of the canonical form: the same concept synced
/// under two languages yields two independent hashes.
pub fn concept_hash(concept: &RemoteConcept, lang: &LangTag) -> String {
    let mut canonical = String::new();
    push_line(&mut canonical, "lang", &lang.0);
    push_line(&mut canonical, "prefLabel", &concept.pref_label);

    for value in sorted(&concept.definitions) {
        push_line(&mut canonical, "definition", &value);
    }
    for value in sorted(&concept.alt_labels) {
        push_line(&mut canonical, "altLabel", &value);
    }
    for value in sorted(&concept.hidden_labels) {
        push_line(&mut canonical, "hiddenLabel", &value);
    }
    // BTreeMap iteration is already key-ordered.
    for (property, value) in &concept.properties {
        push_line(&mut canonical, property, value);
    }
    let mut broaders: Vec<String> = concept.broaders.iter().map(|u| u.0.clone()).collect();
    broaders.sort();
    for value in &broaders {
        push_line(&mut canonical, "broader", value);
    }

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Collapse interior whitespace runs to a single space and trim the ends.
pub fn normalize_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn push_line(out: &mut String, field: &str, value: &str) {
    out.push_str(field);
    out.push('\t');
    out.push_str(&normalize_whitespace(value));
    out.push('\n');
}

fn sorted(values: &[String]) -> Vec<String> {
    let mut out = values.to_vec();
    out.sort();
    out
}
