//! Update pipeline: reconcile the remote hierarchy into the local store.
//!
//! All remote content is fetched up front (every configured language), so
//! an unreachable remote aborts before any local mutation. Phases, each
//! batched over the flat work list:
//!
//! 1. reconcile content — hash-gate every (concept, language) unit:
//!    unchanged hash skips, changed hash updates, unknown URI creates
//! 2. reconcile parents — rebuild the parent set of every created or
//!    updated node from its broader links
//! 3. delete orphans — drop nodes tracked in the hash state that the
//!    remote no longer returned
//! 4. write log

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use taxsync_core::{
    ConceptService, HashRecord, NodeId, SyncLog, Translation,
};
use taxsync_store::{StoreError, TaxonomyStore};

use crate::error::SyncError;
use crate::flatten::{composite_key, flatten_concept_trees, FlatConcept};
use crate::hash::concept_hash;
use crate::scheduler::{remaining_time, BatchProgress, BatchSize, Phase, RunSummary};
use crate::session::SyncSession;
use crate::state::{self, StateFile};

enum UpdatePhase {
    ReconcileContent,
    ReconcileParents,
    DeleteOrphans,
    WriteLog,
}

/// A running update. Iterate to drive it; each item is one committed batch.
pub struct UpdateRun<'s, 'a, S: ConceptService> {
    session: &'s SyncSession<'a, S>,
    store: &'s mut TaxonomyStore,
    state: StateFile,
    batch: usize,
    /// Flat parent-first work list across all languages, default first.
    work: Vec<FlatConcept>,
    /// Composite keys of top concepts (children of the scheme itself).
    top_keys: BTreeSet<String>,
    /// Composite key -> node id, per outcome of the content phase.
    created: HashMap<String, NodeId>,
    updated: HashMap<String, NodeId>,
    skipped: HashMap<String, NodeId>,
    phase: UpdatePhase,
    cursor: usize,
    started_at: DateTime<Utc>,
    phase_started_at: DateTime<Utc>,
    summary: RunSummary,
    done: bool,
}

impl<'s, 'a, S: ConceptService> UpdateRun<'s, 'a, S> {
    pub(crate) fn start(
        session: &'s SyncSession<'a, S>,
        store: &'s mut TaxonomyStore,
        batch: BatchSize,
    ) -> Result<Self, SyncError> {
        session.validate_remote()?;
        let state = state::load_at(&session.home, &session.config.taxonomy)?;
        let languages = taxsync_core::config::ordered_languages(session.config)?;
        let properties = session.schema.skos_properties();

        let mut work = Vec::new();
        let mut top_keys = BTreeSet::new();
        for (local, remote) in &languages {
            let tops = session.service.get_top_concepts(
                &session.config.project_id,
                &session.config.scheme_uri,
                &properties,
                remote,
            )?;
            let top_set: BTreeSet<_> = tops.into_iter().collect();
            for uri in &top_set {
                top_keys.insert(composite_key(uri, remote));
            }
            let trees = session.service.get_sub_tree(
                &session.config.project_id,
                &session.config.scheme_uri,
                &properties,
                remote,
            )?;
            work.extend(flatten_concept_trees(&trees, local, remote, &top_set));
        }

        let now = Utc::now();
        Ok(Self {
            session,
            store,
            state,
            batch: batch.get(),
            work,
            top_keys,
            created: HashMap::new(),
            updated: HashMap::new(),
            skipped: HashMap::new(),
            phase: UpdatePhase::ReconcileContent,
            cursor: 0,
            started_at: now,
            phase_started_at: now,
            summary: RunSummary::default(),
            done: false,
        })
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    fn progress(&self, phase: Phase, processed: usize, total: usize, message: String) -> BatchProgress {
        BatchProgress {
            phase,
            processed,
            total,
            created: self.summary.created,
            updated: self.summary.updated,
            skipped: self.summary.skipped,
            deleted: self.summary.deleted,
            message,
            remaining: remaining_time(self.phase_started_at, processed, total),
        }
    }

    /// Drive the run to the end and return its summary.
    pub fn complete(mut self) -> Result<RunSummary, SyncError> {
        while let Some(step) = self.next() {
            step?;
        }
        Ok(self.summary)
    }

    // -----------------------------------------------------------------------
    // Phase 1: reconcile content
    // -----------------------------------------------------------------------

    fn step_content(&mut self) -> Result<BatchProgress, SyncError> {
        let total = self.work.len();
        let end = (self.cursor + self.batch).min(total);
        for i in self.cursor..end {
            let flat = self.work[i].clone();
            self.reconcile_unit(&flat)?;
        }
        self.cursor = end;
        self.store.save()?;
        state::save_at(&self.session.home, &self.session.config.taxonomy, &self.state)?;

        let progress = self.progress(
            Phase::ReconcileContent,
            end,
            total,
            format!(
                "Processed concepts for creating and updating terms: {end} of {total} \
                 (created {}, updated {}, skipped {}).",
                self.summary.created, self.summary.updated, self.summary.skipped
            ),
        );
        if end >= total {
            self.enter_phase(UpdatePhase::ReconcileParents);
        }
        Ok(progress)
    }

    fn reconcile_unit(&mut self, flat: &FlatConcept) -> Result<(), SyncError> {
        let key = flat.key();
        let hash = concept_hash(&flat.concept, &flat.remote_lang);
        let is_default = flat.local_lang == self.session.config.default_language;

        let known = self
            .state
            .find_by_uri(&flat.concept.uri, &flat.remote_lang)
            .cloned()
            .filter(|record| self.store.contains(record.node));

        match known {
            Some(record) if record.hash == hash => {
                self.skipped.insert(key, record.node);
                self.summary.skipped += 1;
            }
            Some(record) => {
                self.apply_content(record.node, flat, is_default)?;
                self.state.upsert(HashRecord {
                    node: record.node,
                    language: flat.remote_lang.clone(),
                    uri: flat.concept.uri.clone(),
                    hash,
                    synced: self.started_at,
                });
                self.updated.insert(key, record.node);
                self.summary.updated += 1;
                tracing::info!("updated node {} from {}", record.node, flat.concept.uri);
            }
            None => {
                // A node created by the default-language pass (or an earlier
                // export) is reused rather than duplicated.
                let id = match self.store.find_by_uri(&flat.concept.uri) {
                    Some(id) => id,
                    None => self.store.create_node(flat.concept.pref_label.clone()),
                };
                self.apply_content(id, flat, is_default)?;
                self.state.upsert(HashRecord {
                    node: id,
                    language: flat.remote_lang.clone(),
                    uri: flat.concept.uri.clone(),
                    hash,
                    synced: self.started_at,
                });
                self.created.insert(key, id);
                self.summary.created += 1;
                tracing::info!("created node {id} from {}", flat.concept.uri);
            }
        }
        self.summary.processed += 1;
        Ok(())
    }

    fn apply_content(
        &mut self,
        id: NodeId,
        flat: &FlatConcept,
        is_default: bool,
    ) -> Result<(), SyncError> {
        let description = flat.concept.definitions.join(" ");
        if is_default {
            let node = self
                .store
                .get_mut(id)
                .ok_or(StoreError::NodeNotFound { id })?;
            node.name = flat.concept.pref_label.clone();
            node.description = description;
            node.uri = Some(flat.concept.uri.clone());
            node.alt_labels = flat.concept.alt_labels.clone();
            node.hidden_labels = flat.concept.hidden_labels.clone();
            for field in self.session.schema.custom_fields() {
                if let Some(value) = flat.concept.properties.get(&field.remote_property) {
                    node.custom.insert(field.field_id.clone(), value.clone());
                }
            }
        } else {
            if let Some(node) = self.store.get_mut(id) {
                if node.uri.is_none() {
                    node.uri = Some(flat.concept.uri.clone());
                }
            }
            let mut custom = std::collections::BTreeMap::new();
            for field in self.session.schema.custom_fields() {
                if let Some(value) = flat.concept.properties.get(&field.remote_property) {
                    custom.insert(field.field_id.clone(), value.clone());
                }
            }
            self.store.set_translation(
                id,
                flat.local_lang.clone(),
                Translation {
                    name: flat.concept.pref_label.clone(),
                    description,
                    alt_labels: flat.concept.alt_labels.clone(),
                    hidden_labels: flat.concept.hidden_labels.clone(),
                    custom,
                },
            )?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 2: reconcile parents
    // -----------------------------------------------------------------------

    fn step_parents(&mut self) -> Result<BatchProgress, SyncError> {
        let total = self.work.len();
        let end = (self.cursor + self.batch).min(total);
        for i in self.cursor..end {
            let flat = self.work[i].clone();
            let key = flat.key();
            // Skipped units keep their current parent set.
            let Some(id) = self
                .created
                .get(&key)
                .or_else(|| self.updated.get(&key))
                .copied()
            else {
                continue;
            };

            let mut parents: Vec<NodeId> = Vec::new();
            if self.top_keys.contains(&key) {
                parents.push(NodeId::ROOT);
            }
            for broader in &flat.concept.broaders {
                let broader_key = composite_key(broader, &flat.remote_lang);
                match self.lookup(&broader_key) {
                    Some(parent) if !parents.contains(&parent) => parents.push(parent),
                    Some(_) => {}
                    None => {
                        tracing::warn!(
                            "broader {broader} of {} not part of this run",
                            flat.concept.uri
                        );
                    }
                }
            }
            if parents.is_empty() {
                tracing::warn!("no resolvable parent for {}, rooting it", flat.concept.uri);
                parents.push(NodeId::ROOT);
            }
            self.store.set_parents(id, parents)?;
        }
        self.cursor = end;
        self.store.save()?;

        let progress = self.progress(
            Phase::ReconcileParents,
            end,
            total,
            format!("Processed concepts for building the tree: {end} of {total}."),
        );
        if end >= total {
            self.enter_phase(UpdatePhase::DeleteOrphans);
        }
        Ok(progress)
    }

    fn lookup(&self, key: &str) -> Option<NodeId> {
        self.created
            .get(key)
            .or_else(|| self.updated.get(key))
            .or_else(|| self.skipped.get(key))
            .copied()
    }

    // -----------------------------------------------------------------------
    // Phase 3: delete orphans
    // -----------------------------------------------------------------------

    fn step_orphans(&mut self) -> Result<BatchProgress, SyncError> {
        let touched: BTreeSet<NodeId> = self
            .created
            .values()
            .chain(self.updated.values())
            .chain(self.skipped.values())
            .copied()
            .collect();

        for node in self.state.tracked_nodes() {
            if touched.contains(&node) {
                continue;
            }
            if self.store.contains(node) {
                self.store.delete_node(node)?;
            }
            self.state.remove_node(node);
            self.summary.deleted += 1;
            tracing::info!("deleted node {node}, no longer present remotely");
        }
        self.store.save()?;
        state::save_at(&self.session.home, &self.session.config.taxonomy, &self.state)?;

        let deleted = self.summary.deleted;
        self.enter_phase(UpdatePhase::WriteLog);
        Ok(self.progress(
            Phase::DeleteOrphans,
            deleted,
            deleted,
            format!("Removed {deleted} terms for deleted concepts."),
        ))
    }

    // -----------------------------------------------------------------------
    // Phase 4: write log
    // -----------------------------------------------------------------------

    fn step_log(&mut self) -> Result<BatchProgress, SyncError> {
        state::append_log_at(
            &self.session.home,
            &self.session.config.taxonomy,
            SyncLog {
                configuration: self.session.config.id.clone(),
                taxonomy: self.session.config.taxonomy.clone(),
                start_time: self.started_at,
                end_time: Utc::now(),
                actor: self.session.actor.clone(),
            },
        )?;
        self.done = true;
        Ok(self.progress(
            Phase::WriteLog,
            1,
            1,
            "Synchronization log written.".to_string(),
        ))
    }

    fn enter_phase(&mut self, phase: UpdatePhase) {
        self.phase = phase;
        self.cursor = 0;
        self.phase_started_at = Utc::now();
    }
}

impl<S: ConceptService> Iterator for UpdateRun<'_, '_, S> {
    type Item = Result<BatchProgress, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = match self.phase {
            UpdatePhase::ReconcileContent => self.step_content(),
            UpdatePhase::ReconcileParents => self.step_parents(),
            UpdatePhase::DeleteOrphans => self.step_orphans(),
            UpdatePhase::WriteLog => self.step_log(),
        };
        if step.is_err() {
            self.done = true;
        }
        Some(step)
    }
}
