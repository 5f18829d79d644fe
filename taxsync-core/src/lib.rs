//! Taxsync core library — domain types, connection configuration, field
//! schema registry, and the remote concept service contract.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`remote`] — [`ConceptService`] trait, remote data model, [`RemoteError`]
//! - [`config`] — connection configuration load / save / list / delete
//! - [`schema`] — custom-attribute field schema registry
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod remote;
pub mod schema;
pub mod types;

pub use error::ConfigError;
pub use remote::{ConceptService, ConceptTree, ProjectInfo, RemoteConcept, RemoteError, SchemeInfo};
pub use schema::{Cardinality, FieldSchema, SchemaRegistry, ValueType};
pub use types::{
    ConceptUri, HashRecord, LangTag, LocalNode, NodeId, SyncConfiguration, SyncLog, TaxonomyId,
    Translation,
};
