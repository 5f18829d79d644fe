//! Per-run synchronization session.
//!
//! A [`SyncSession`] borrows everything one run needs — the connection
//! configuration, the field schema, the remote service — and hands out
//! run iterators. Nothing is shared between sessions; two taxonomies sync
//! through two independent sessions.

use std::path::PathBuf;

use taxsync_core::{config, ConceptService, RemoteError, SchemaRegistry, SyncConfiguration};
use taxsync_store::TaxonomyStore;

use crate::error::SyncError;
use crate::export::ExportRun;
use crate::import::UpdateRun;
use crate::scheduler::BatchSize;

pub struct SyncSession<'a, S: ConceptService> {
    pub(crate) config: &'a SyncConfiguration,
    pub(crate) schema: &'a SchemaRegistry,
    pub(crate) service: &'a S,
    pub(crate) home: PathBuf,
    pub(crate) actor: String,
}

impl<'a, S: ConceptService> SyncSession<'a, S> {
    pub fn new(
        config: &'a SyncConfiguration,
        schema: &'a SchemaRegistry,
        service: &'a S,
        home: impl Into<PathBuf>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            config,
            schema,
            service,
            home: home.into(),
            actor: actor.into(),
        }
    }

    /// Check that the configured project, scheme, and languages exist on
    /// the remote side. Runs this before scheduling any batch, so a stale
    /// configuration fails fast without touching local data.
    pub fn validate_remote(&self) -> Result<(), SyncError> {
        let projects = self.service.list_projects()?;
        let project = projects
            .iter()
            .find(|p| p.id == self.config.project_id)
            .ok_or_else(|| {
                RemoteError::validation(format!(
                    "project '{}' not found on {}",
                    self.config.project_id, self.config.server_url
                ))
            })?;

        let schemes = self.service.list_concept_schemes(&self.config.project_id)?;
        if !schemes.iter().any(|s| s.uri == self.config.scheme_uri) {
            return Err(RemoteError::validation(format!(
                "concept scheme '{}' not found in project '{}'",
                self.config.scheme_uri, self.config.project_id
            ))
            .into());
        }

        // An empty language list means the project does not advertise one.
        if !project.available_languages.is_empty() {
            for (_, remote) in config::ordered_languages(self.config)? {
                if !project.available_languages.contains(&remote) {
                    return Err(RemoteError::validation(format!(
                        "language '{remote}' is not available in project '{}'",
                        self.config.project_id
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Start an export run: push the local tree into the remote scheme.
    pub fn export<'s>(
        &'s self,
        store: &'s mut TaxonomyStore,
        batch: BatchSize,
    ) -> Result<ExportRun<'s, 'a, S>, SyncError> {
        ExportRun::start(self, store, batch)
    }

    /// Start an update run: reconcile the remote hierarchy into the local
    /// store. All remote content is fetched up front, so a dead remote
    /// aborts here with the store untouched.
    pub fn update<'s>(
        &'s self,
        store: &'s mut TaxonomyStore,
        batch: BatchSize,
    ) -> Result<UpdateRun<'s, 'a, S>, SyncError> {
        UpdateRun::start(self, store, batch)
    }
}
