//! Local hierarchical node store.
//!
//! One YAML document per taxonomy holds every node, its multi-parent edge
//! list, and its per-language translation variants. The synchronization
//! engine mutates nodes in memory and commits at batch boundaries via
//! [`TaxonomyStore::save`].

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{NodeBranch, TaxonomyStore};
