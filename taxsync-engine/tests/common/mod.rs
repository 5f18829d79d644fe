//! In-memory fake of the remote thesaurus service, with failure injection.

use std::cell::RefCell;
use std::collections::BTreeMap;

use taxsync_core::{
    ConceptService, ConceptTree, ConceptUri, LangTag, ProjectInfo, RemoteConcept, RemoteError,
    SchemeInfo,
};

pub const PROJECT: &str = "proj1";

/// A connection configuration pointing at the mock service.
#[allow(dead_code)]
pub fn connection(
    taxonomy: &str,
    scheme: &ConceptUri,
    languages: &[(&str, &str)],
    default: &str,
) -> taxsync_core::SyncConfiguration {
    let now = chrono::Utc::now();
    taxsync_core::SyncConfiguration {
        id: format!("{taxonomy}_conn"),
        taxonomy: taxsync_core::TaxonomyId::from(taxonomy),
        scheme_uri: scheme.clone(),
        project_id: PROJECT.to_string(),
        server_url: "http://mock".to_string(),
        languages: languages
            .iter()
            .map(|(local, remote)| (LangTag::from(*local), LangTag::from(*remote)))
            .collect(),
        default_language: LangTag::from(default),
        created_at: now,
        updated_at: now,
    }
}

#[derive(Debug, Clone, Default)]
struct Bundle {
    pref_label: String,
    alt_labels: Vec<String>,
    hidden_labels: Vec<String>,
    definitions: Vec<String>,
    properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct StoredConcept {
    uri: ConceptUri,
    scheme: ConceptUri,
    top: bool,
    broaders: Vec<ConceptUri>,
    bundles: BTreeMap<LangTag, Bundle>,
}

#[derive(Debug, Default)]
struct Inner {
    next_id: usize,
    languages: Vec<LangTag>,
    schemes: Vec<SchemeInfo>,
    /// Concepts in insertion order, which fixes subtree ordering.
    concepts: Vec<StoredConcept>,
    unavailable: bool,
    fail_create_labels: Vec<String>,
}

pub struct MockThesaurus {
    inner: RefCell<Inner>,
    default_lang: LangTag,
}

#[allow(dead_code)]
impl MockThesaurus {
    pub fn new(languages: &[&str]) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self {
            inner: RefCell::new(Inner {
                languages: languages.iter().map(|l| LangTag::from(*l)).collect(),
                ..Inner::default()
            }),
            default_lang: LangTag::from(languages[0]),
        }
    }

    // -- test setup -----------------------------------------------------

    pub fn add_scheme(&self, title: &str) -> ConceptUri {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let uri = ConceptUri::from(format!("http://mock/scheme/{}", inner.next_id));
        inner.schemes.push(SchemeInfo {
            uri: uri.clone(),
            title: title.to_string(),
            descriptions: vec![],
        });
        uri
    }

    /// Seed a concept as if it already existed remotely.
    pub fn seed(
        &self,
        scheme: &ConceptUri,
        uri: &str,
        lang: &str,
        pref_label: &str,
        broaders: &[&str],
        top: bool,
    ) {
        let mut inner = self.inner.borrow_mut();
        let mut bundles = BTreeMap::new();
        bundles.insert(
            LangTag::from(lang),
            Bundle {
                pref_label: pref_label.to_string(),
                ..Bundle::default()
            },
        );
        inner.concepts.push(StoredConcept {
            uri: ConceptUri::from(uri),
            scheme: scheme.clone(),
            top,
            broaders: broaders.iter().map(|b| ConceptUri::from(*b)).collect(),
            bundles,
        });
    }

    /// Add or replace one language variant of a seeded concept.
    pub fn seed_label(&self, uri: &str, lang: &str, pref_label: &str) {
        let mut inner = self.inner.borrow_mut();
        let concept = inner
            .concepts
            .iter_mut()
            .find(|c| c.uri.0 == uri)
            .expect("seeded concept");
        concept.bundles.entry(LangTag::from(lang)).or_default().pref_label =
            pref_label.to_string();
    }

    pub fn set_definition(&self, uri: &str, lang: &str, definition: &str) {
        let mut inner = self.inner.borrow_mut();
        let concept = inner
            .concepts
            .iter_mut()
            .find(|c| c.uri.0 == uri)
            .expect("seeded concept");
        concept
            .bundles
            .entry(LangTag::from(lang))
            .or_default()
            .definitions = vec![definition.to_string()];
    }

    /// Remove a concept and every broader edge pointing at it.
    pub fn remove_concept(&self, uri: &str) {
        let mut inner = self.inner.borrow_mut();
        inner.concepts.retain(|c| c.uri.0 != uri);
        for concept in &mut inner.concepts {
            concept.broaders.retain(|b| b.0 != uri);
        }
    }

    pub fn set_unavailable(&self) {
        self.inner.borrow_mut().unavailable = true;
    }

    /// Make `create_concept` fail (per-item) for this label.
    pub fn fail_create(&self, label: &str) {
        self.inner
            .borrow_mut()
            .fail_create_labels
            .push(label.to_string());
    }

    // -- assertions -----------------------------------------------------

    pub fn concept_count(&self) -> usize {
        self.inner.borrow().concepts.len()
    }

    pub fn broaders_of(&self, uri: &ConceptUri) -> Vec<String> {
        self.inner
            .borrow()
            .concepts
            .iter()
            .find(|c| c.uri == *uri)
            .map(|c| c.broaders.iter().map(|b| b.0.clone()).collect())
            .unwrap_or_default()
    }

    pub fn pref_label(&self, uri: &ConceptUri, lang: &str) -> Option<String> {
        self.inner
            .borrow()
            .concepts
            .iter()
            .find(|c| c.uri == *uri)
            .and_then(|c| c.bundles.get(&LangTag::from(lang)))
            .map(|b| b.pref_label.clone())
    }

    pub fn uri_by_label(&self, lang: &str, label: &str) -> Option<ConceptUri> {
        self.inner
            .borrow()
            .concepts
            .iter()
            .find(|c| {
                c.bundles
                    .get(&LangTag::from(lang))
                    .is_some_and(|b| b.pref_label == label)
            })
            .map(|c| c.uri.clone())
    }

    // -- internals ------------------------------------------------------

    fn guard(&self) -> Result<(), RemoteError> {
        if self.inner.borrow().unavailable {
            return Err(RemoteError::unavailable("connection refused"));
        }
        Ok(())
    }

    fn to_remote(&self, stored: &StoredConcept, lang: &LangTag) -> RemoteConcept {
        let fallback = Bundle::default();
        let bundle = stored
            .bundles
            .get(lang)
            .or_else(|| stored.bundles.get(&self.default_lang))
            .unwrap_or(&fallback);
        RemoteConcept {
            uri: stored.uri.clone(),
            pref_label: bundle.pref_label.clone(),
            alt_labels: bundle.alt_labels.clone(),
            hidden_labels: bundle.hidden_labels.clone(),
            definitions: bundle.definitions.clone(),
            properties: bundle.properties.clone(),
            broaders: stored.broaders.clone(),
        }
    }

    fn build_tree(&self, inner: &Inner, uri: &ConceptUri, lang: &LangTag) -> ConceptTree {
        let stored = inner
            .concepts
            .iter()
            .find(|c| c.uri == *uri)
            .expect("tree node");
        let narrowers = inner
            .concepts
            .iter()
            .filter(|c| c.broaders.contains(uri))
            .map(|c| self.build_tree(inner, &c.uri, lang))
            .collect();
        ConceptTree {
            concept: self.to_remote(stored, lang),
            narrowers,
        }
    }
}

impl ConceptService for MockThesaurus {
    fn list_projects(&self) -> Result<Vec<ProjectInfo>, RemoteError> {
        self.guard()?;
        Ok(vec![ProjectInfo {
            id: PROJECT.to_string(),
            title: "Mock Project".to_string(),
            available_languages: self.inner.borrow().languages.clone(),
        }])
    }

    fn list_concept_schemes(&self, _project: &str) -> Result<Vec<SchemeInfo>, RemoteError> {
        self.guard()?;
        Ok(self.inner.borrow().schemes.clone())
    }

    fn create_concept_scheme(
        &self,
        _project: &str,
        title: &str,
        _description: &str,
    ) -> Result<ConceptUri, RemoteError> {
        self.guard()?;
        Ok(self.add_scheme(title))
    }

    fn get_top_concepts(
        &self,
        _project: &str,
        scheme: &ConceptUri,
        _properties: &[String],
        _lang: &LangTag,
    ) -> Result<Vec<ConceptUri>, RemoteError> {
        self.guard()?;
        Ok(self
            .inner
            .borrow()
            .concepts
            .iter()
            .filter(|c| c.scheme == *scheme && c.top)
            .map(|c| c.uri.clone())
            .collect())
    }

    fn get_sub_tree(
        &self,
        _project: &str,
        scheme: &ConceptUri,
        _properties: &[String],
        lang: &LangTag,
    ) -> Result<Vec<ConceptTree>, RemoteError> {
        self.guard()?;
        let inner = self.inner.borrow();
        let tops: Vec<ConceptUri> = inner
            .concepts
            .iter()
            .filter(|c| c.scheme == *scheme && c.top)
            .map(|c| c.uri.clone())
            .collect();
        Ok(tops
            .iter()
            .map(|uri| self.build_tree(&inner, uri, lang))
            .collect())
    }

    fn get_concept(
        &self,
        _project: &str,
        uri: &ConceptUri,
        _properties: &[String],
        lang: &LangTag,
    ) -> Result<RemoteConcept, RemoteError> {
        self.guard()?;
        let inner = self.inner.borrow();
        inner
            .concepts
            .iter()
            .find(|c| c.uri == *uri)
            .map(|c| self.to_remote(c, lang))
            .ok_or_else(|| RemoteError::item("getConcept", format!("{uri} not found")))
    }

    fn create_concept(
        &self,
        _project: &str,
        label: &str,
        parent: &ConceptUri,
    ) -> Result<ConceptUri, RemoteError> {
        self.guard()?;
        let mut inner = self.inner.borrow_mut();
        if inner.fail_create_labels.iter().any(|l| l == label) {
            return Err(RemoteError::item("createConcept", format!("rejected '{label}'")));
        }
        let is_scheme = inner.schemes.iter().any(|s| s.uri == *parent);
        let (scheme, top, broaders) = if is_scheme {
            (parent.clone(), true, vec![])
        } else {
            let parent_concept = inner
                .concepts
                .iter()
                .find(|c| c.uri == *parent)
                .ok_or_else(|| {
                    RemoteError::item("createConcept", format!("parent {parent} not found"))
                })?;
            (parent_concept.scheme.clone(), false, vec![parent.clone()])
        };
        inner.next_id += 1;
        let uri = ConceptUri::from(format!("http://mock/concept/{}", inner.next_id));
        let mut bundles = BTreeMap::new();
        bundles.insert(
            self.default_lang.clone(),
            Bundle {
                pref_label: label.to_string(),
                ..Bundle::default()
            },
        );
        inner.concepts.push(StoredConcept {
            uri: uri.clone(),
            scheme,
            top,
            broaders,
            bundles,
        });
        Ok(uri)
    }

    fn add_literal(
        &self,
        _project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError> {
        self.guard()?;
        let mut inner = self.inner.borrow_mut();
        let concept = inner
            .concepts
            .iter_mut()
            .find(|c| c.uri == *uri)
            .ok_or_else(|| RemoteError::item("addLiteral", format!("{uri} not found")))?;
        let bundle = concept.bundles.entry(lang.clone()).or_default();
        match property {
            "preferredLabel" => bundle.pref_label = value.to_string(),
            "definition" => bundle.definitions.push(value.to_string()),
            "alternativeLabel" => bundle.alt_labels.push(value.to_string()),
            "hiddenLabel" => bundle.hidden_labels.push(value.to_string()),
            other => {
                return Err(RemoteError::item(
                    "addLiteral",
                    format!("unsupported property '{other}'"),
                ))
            }
        }
        Ok(())
    }

    fn add_custom_attribute(
        &self,
        _project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError> {
        self.guard()?;
        let mut inner = self.inner.borrow_mut();
        let concept = inner
            .concepts
            .iter_mut()
            .find(|c| c.uri == *uri)
            .ok_or_else(|| RemoteError::item("addCustomAttribute", format!("{uri} not found")))?;
        concept
            .bundles
            .entry(lang.clone())
            .or_default()
            .properties
            .insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn add_relation(
        &self,
        _project: &str,
        child: &ConceptUri,
        parent: &ConceptUri,
    ) -> Result<(), RemoteError> {
        self.guard()?;
        let mut inner = self.inner.borrow_mut();
        let is_scheme = inner.schemes.iter().any(|s| s.uri == *parent);
        let concept = inner
            .concepts
            .iter_mut()
            .find(|c| c.uri == *child)
            .ok_or_else(|| RemoteError::item("addRelation", format!("{child} not found")))?;
        if is_scheme {
            concept.top = true;
        } else if !concept.broaders.contains(parent) {
            concept.broaders.push(parent.clone());
        }
        Ok(())
    }
}
