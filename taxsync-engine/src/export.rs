//! Export pipeline: push the local taxonomy tree into a remote scheme.
//!
//! Phases, each batched over the flat parent-first node order:
//!
//! 1. create concepts — create every not-yet-exported node remotely under
//!    its first exported parent, then add relations for the extra parents
//! 2. finalize hashes — re-fetch each created concept and record its
//!    baseline hash, so the next update skips unchanged nodes
//! 3. export translations — one pass per non-default language
//! 4. write log
//!
//! The store and the hash state are committed at every batch boundary;
//! dropping the iterator mid-run keeps all completed batches.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use taxsync_core::{
    ConceptService, ConceptUri, HashRecord, LangTag, LocalNode, NodeId, RemoteError, SyncLog,
};
use taxsync_store::TaxonomyStore;

use crate::error::SyncError;
use crate::hash::concept_hash;
use crate::scheduler::{remaining_time, BatchProgress, BatchSize, Phase, RunSummary};
use crate::session::SyncSession;
use crate::state::{self, StateFile};

/// What the run knows about a node's remote counterpart.
struct ExportedConcept {
    uri: ConceptUri,
    /// Parent ids already linked remotely during this run.
    linked: Vec<NodeId>,
    hashed: bool,
}

enum ExportPhase {
    CreateConcepts,
    FinalizeHashes,
    ExportTranslations,
    WriteLog,
}

/// A running export. Iterate to drive it; each item is one committed batch.
pub struct ExportRun<'s, 'a, S: ConceptService> {
    session: &'s SyncSession<'a, S>,
    store: &'s mut TaxonomyStore,
    state: StateFile,
    batch: usize,
    /// Flat parent-first node order, fixed at start.
    order: Vec<NodeId>,
    /// (local, remote) language pairs, default first.
    languages: Vec<(LangTag, LangTag)>,
    exported: HashMap<NodeId, ExportedConcept>,
    phase: ExportPhase,
    cursor: usize,
    /// Index into `languages` during the translation phase (starts at 1).
    lang_index: usize,
    started_at: DateTime<Utc>,
    phase_started_at: DateTime<Utc>,
    summary: RunSummary,
    done: bool,
}

impl<'s, 'a, S: ConceptService> ExportRun<'s, 'a, S> {
    pub(crate) fn start(
        session: &'s SyncSession<'a, S>,
        store: &'s mut TaxonomyStore,
        batch: BatchSize,
    ) -> Result<Self, SyncError> {
        session.validate_remote()?;
        let state = state::load_at(&session.home, &session.config.taxonomy)?;
        let languages = taxsync_core::config::ordered_languages(session.config)?;
        let order = store.flat_tree();

        // The virtual root exports to the scheme itself; nodes already
        // carrying a hash record were exported by an earlier run and only
        // get missing parent relations.
        let mut exported = HashMap::new();
        exported.insert(
            NodeId::ROOT,
            ExportedConcept {
                uri: session.config.scheme_uri.clone(),
                linked: Vec::new(),
                hashed: true,
            },
        );
        let default_remote = &languages[0].1;
        for record in &state.records {
            if record.language == *default_remote {
                exported.insert(
                    record.node,
                    ExportedConcept {
                        uri: record.uri.clone(),
                        linked: Vec::new(),
                        hashed: true,
                    },
                );
            }
        }

        let now = Utc::now();
        Ok(Self {
            session,
            store,
            state,
            batch: batch.get(),
            order,
            languages,
            exported,
            phase: ExportPhase::CreateConcepts,
            cursor: 0,
            lang_index: 1,
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
    // Phase 1: create concepts
    // -----------------------------------------------------------------------

    fn step_create(&mut self) -> Result<BatchProgress, SyncError> {
        let total = self.order.len();
        let end = (self.cursor + self.batch).min(total);
        for i in self.cursor..end {
            let id = self.order[i];
            self.export_node(id)?;
        }
        self.cursor = end;
        self.store.save()?;

        let progress = self.progress(
            Phase::CreateConcepts,
            end,
            total,
            format!("Processed terms for creating concepts: {end} of {total}."),
        );
        if end >= total {
            self.enter_phase(ExportPhase::FinalizeHashes);
        }
        Ok(progress)
    }

    fn export_node(&mut self, id: NodeId) -> Result<(), SyncError> {
        let Some(node) = self.store.get(id).cloned() else {
            return Ok(());
        };
        let mut parent_ids = self.store.parents(id);
        if parent_ids.is_empty() {
            parent_ids.push(NodeId::ROOT);
        }

        if !self.exported.contains_key(&id) {
            // Parent-first order guarantees an exported parent unless that
            // parent itself failed earlier in the run.
            let Some(first_parent) = parent_ids
                .iter()
                .copied()
                .find(|p| self.exported.contains_key(p))
            else {
                tracing::warn!("node {id} ('{}') has no exported parent, skipping", node.name);
                self.summary.failed += 1;
                self.summary.processed += 1;
                return Ok(());
            };
            let parent_uri = self.exported[&first_parent].uri.clone();
            let uri = match self.push_new_concept(&node, &parent_uri) {
                Ok(uri) => uri,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("creating concept for node {id} ('{}') failed: {e}", node.name);
                    self.summary.failed += 1;
                    self.summary.processed += 1;
                    return Ok(());
                }
            };
            tracing::info!("created concept {uri} for node {id} ('{}')", node.name);
            if let Some(stored) = self.store.get_mut(id) {
                stored.uri = Some(uri.clone());
            }
            self.exported.insert(
                id,
                ExportedConcept {
                    uri,
                    linked: vec![first_parent],
                    hashed: false,
                },
            );
            self.summary.created += 1;
        }

        // Additional parents become extra broader relations.
        let (child_uri, linked) = {
            let entry = &self.exported[&id];
            (entry.uri.clone(), entry.linked.clone())
        };
        for parent_id in parent_ids {
            if linked.contains(&parent_id) {
                continue;
            }
            let Some(parent) = self.exported.get(&parent_id) else {
                continue;
            };
            let parent_uri = parent.uri.clone();
            match self.session.service.add_relation(
                &self.session.config.project_id,
                &child_uri,
                &parent_uri,
            ) {
                Ok(()) => {
                    if let Some(entry) = self.exported.get_mut(&id) {
                        entry.linked.push(parent_id);
                    }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("relation {child_uri} -> {parent_uri} failed: {e}");
                }
            }
        }
        self.summary.processed += 1;
        Ok(())
    }

    fn push_new_concept(
        &self,
        node: &LocalNode,
        parent_uri: &ConceptUri,
    ) -> Result<ConceptUri, RemoteError> {
        let uri = self.session.service.create_concept(
            &self.session.config.project_id,
            &node.name,
            parent_uri,
        )?;
        let remote_lang = &self.languages[0].1;
        self.push_literals(
            &uri,
            remote_lang,
            None,
            &node.description,
            &node.alt_labels,
            &node.hidden_labels,
            &node.custom,
        )?;
        Ok(uri)
    }

    /// Push all literal and custom-attribute values of one language variant.
    /// Per-value failures are logged and skipped; only fatal errors return.
    #[allow(clippy::too_many_arguments)]
    fn push_literals(
        &self,
        uri: &ConceptUri,
        lang: &LangTag,
        pref_label: Option<&str>,
        description: &str,
        alt_labels: &[String],
        hidden_labels: &[String],
        custom: &std::collections::BTreeMap<String, String>,
    ) -> Result<(), RemoteError> {
        let project = &self.session.config.project_id;
        let service = self.session.service;

        let mut literals: Vec<(&str, &str)> = Vec::new();
        if let Some(label) = pref_label {
            literals.push(("preferredLabel", label));
        }
        if !description.is_empty() {
            literals.push(("definition", description));
        }
        for label in alt_labels {
            literals.push(("alternativeLabel", label));
        }
        for label in hidden_labels {
            literals.push(("hiddenLabel", label));
        }
        for (property, value) in literals {
            match service.add_literal(project, uri, property, value, lang) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!("literal {property} on {uri} failed: {e}"),
            }
        }

        for field in self.session.schema.custom_fields() {
            let Some(value) = custom.get(&field.field_id) else {
                continue;
            };
            match service.add_custom_attribute(project, uri, &field.remote_property, value, lang) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!("attribute {} on {uri} failed: {e}", field.remote_property);
                }
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Phase 2: finalize baseline hashes
    // -----------------------------------------------------------------------

    fn step_finalize(&mut self) -> Result<BatchProgress, SyncError> {
        let total = self.order.len();
        let end = (self.cursor + self.batch).min(total);
        let properties = self.session.schema.skos_properties();
        let remote_lang = self.languages[0].1.clone();

        for i in self.cursor..end {
            let id = self.order[i];
            let uri = match self.exported.get(&id) {
                Some(entry) if !entry.hashed => entry.uri.clone(),
                _ => continue,
            };
            match self.session.service.get_concept(
                &self.session.config.project_id,
                &uri,
                &properties,
                &remote_lang,
            ) {
                Ok(concept) => {
                    let hash = concept_hash(&concept, &remote_lang);
                    self.state.upsert(HashRecord {
                        node: id,
                        language: remote_lang.clone(),
                        uri,
                        hash,
                        synced: self.started_at,
                    });
                    if let Some(entry) = self.exported.get_mut(&id) {
                        entry.hashed = true;
                    }
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("fetching {uri} for baseline hash failed: {e}");
                    self.summary.failed += 1;
                }
            }
        }
        self.cursor = end;
        state::save_at(&self.session.home, &self.session.config.taxonomy, &self.state)?;

        let progress = self.progress(
            Phase::FinalizeHashes,
            end,
            total,
            format!("Processed terms for recording baseline hashes: {end} of {total}."),
        );
        if end >= total {
            if self.languages.len() > 1 {
                self.enter_phase(ExportPhase::ExportTranslations);
            } else {
                self.enter_phase(ExportPhase::WriteLog);
            }
        }
        Ok(progress)
    }

    // -----------------------------------------------------------------------
    // Phase 3: export translations
    // -----------------------------------------------------------------------

    fn step_translations(&mut self) -> Result<BatchProgress, SyncError> {
        let total = self.order.len();
        let end = (self.cursor + self.batch).min(total);
        let (local_lang, remote_lang) = self.languages[self.lang_index].clone();
        let properties = self.session.schema.skos_properties();

        for i in self.cursor..end {
            let id = self.order[i];
            let Some(translation) = self.store.translation(id, &local_lang).cloned() else {
                continue;
            };
            let uri = match self.exported.get(&id) {
                Some(entry) => entry.uri.clone(),
                None => continue,
            };
            let pushed = self.push_literals(
                &uri,
                &remote_lang,
                (!translation.name.is_empty()).then_some(translation.name.as_str()),
                &translation.description,
                &translation.alt_labels,
                &translation.hidden_labels,
                &translation.custom,
            );
            if let Err(e) = pushed {
                return Err(e.into());
            }
            match self.session.service.get_concept(
                &self.session.config.project_id,
                &uri,
                &properties,
                &remote_lang,
            ) {
                Ok(concept) => {
                    let hash = concept_hash(&concept, &remote_lang);
                    self.state.upsert(HashRecord {
                        node: id,
                        language: remote_lang.clone(),
                        uri,
                        hash,
                        synced: self.started_at,
                    });
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!("fetching {uri} ({remote_lang}) for hash failed: {e}");
                    self.summary.failed += 1;
                }
            }
        }
        self.cursor = end;
        state::save_at(&self.session.home, &self.session.config.taxonomy, &self.state)?;

        let progress = self.progress(
            Phase::ExportTranslations,
            end,
            total,
            format!("Processed terms for exporting '{local_lang}' translations: {end} of {total}."),
        );
        if end >= total {
            self.lang_index += 1;
            if self.lang_index >= self.languages.len() {
                self.enter_phase(ExportPhase::WriteLog);
            } else {
                self.cursor = 0;
                self.phase_started_at = Utc::now();
            }
        }
        Ok(progress)
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

    fn enter_phase(&mut self, phase: ExportPhase) {
        self.phase = phase;
        self.cursor = 0;
        self.phase_started_at = Utc::now();
    }
}

impl<S: ConceptService> Iterator for ExportRun<'_, '_, S> {
    type Item = Result<BatchProgress, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let step = match self.phase {
            ExportPhase::CreateConcepts => self.step_create(),
            ExportPhase::FinalizeHashes => self.step_finalize(),
            ExportPhase::ExportTranslations => self.step_translations(),
            ExportPhase::WriteLog => self.step_log(),
        };
        if step.is_err() {
            self.done = true;
        }
        Some(step)
    }
}
