//! HTTP client for the PoolParty Thesaurus (PPT) REST API.
//!
//! Implements [`ConceptService`] over `ureq`. Transport failures and auth
//! rejections map to `RemoteError::Unavailable` (fatal); other non-2xx
//! responses map to per-item errors carrying the operation name.

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use taxsync_core::{
    ConceptService, ConceptTree, ConceptUri, LangTag, ProjectInfo, RemoteConcept, RemoteError,
    SchemeInfo,
};

pub struct PptClient {
    agent: ureq::Agent,
    base_url: String,
    auth_header: Option<String>,
}

impl PptClient {
    pub fn new(base_url: &str, username: Option<&str>, password: Option<&str>) -> Self {
        let auth_header = username.map(|user| {
            let credentials = format!("{user}:{}", password.unwrap_or(""));
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(credentials)
            )
        });
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(30))
                .build(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
        }
    }

    fn get(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ureq::Response, RemoteError> {
        let mut request = self.agent.get(&format!("{}{path}", self.base_url));
        if let Some(auth) = &self.auth_header {
            request = request.set("Authorization", auth);
        }
        for (key, value) in query {
            request = request.query(key, value);
        }
        map_response(operation, request.call())
    }

    fn post(
        &self,
        operation: &str,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<ureq::Response, RemoteError> {
        let mut request = self.agent.post(&format!("{}{path}", self.base_url));
        if let Some(auth) = &self.auth_header {
            request = request.set("Authorization", auth);
        }
        map_response(operation, request.send_form(form))
    }
}

fn map_response(
    operation: &str,
    result: Result<ureq::Response, ureq::Error>,
) -> Result<ureq::Response, RemoteError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(code, response)) => {
            let body = response.into_string().unwrap_or_default();
            if code == 401 || code == 403 {
                Err(RemoteError::unavailable(format!(
                    "authentication rejected (HTTP {code})"
                )))
            } else if code >= 500 {
                Err(RemoteError::unavailable(format!("HTTP {code}: {body}")))
            } else {
                Err(RemoteError::item(operation, format!("HTTP {code}: {body}")))
            }
        }
        Err(transport) => Err(RemoteError::unavailable(transport.to_string())),
    }
}

fn parse_json<T: DeserializeOwned>(
    operation: &str,
    response: ureq::Response,
) -> Result<T, RemoteError> {
    response
        .into_json()
        .map_err(|e| RemoteError::item(operation, format!("invalid response: {e}")))
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectDto {
    id: String,
    title: String,
    #[serde(default)]
    available_languages: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SchemeDto {
    uri: String,
    title: String,
    #[serde(default)]
    descriptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConceptDto {
    uri: String,
    #[serde(default)]
    pref_label: String,
    #[serde(default)]
    alt_labels: Vec<String>,
    #[serde(default)]
    hidden_labels: Vec<String>,
    #[serde(default)]
    definitions: Vec<String>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    #[serde(default)]
    broaders: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TreeDto {
    concept: ConceptDto,
    #[serde(default)]
    narrowers: Vec<TreeDto>,
}

impl From<ConceptDto> for RemoteConcept {
    fn from(dto: ConceptDto) -> Self {
        Self {
            uri: ConceptUri(dto.uri),
            pref_label: dto.pref_label,
            alt_labels: dto.alt_labels,
            hidden_labels: dto.hidden_labels,
            definitions: dto.definitions,
            properties: dto.properties,
            broaders: dto.broaders.into_iter().map(ConceptUri).collect(),
        }
    }
}

impl From<TreeDto> for ConceptTree {
    fn from(dto: TreeDto) -> Self {
        Self {
            concept: dto.concept.into(),
            narrowers: dto.narrowers.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// ConceptService
// ---------------------------------------------------------------------------

impl ConceptService for PptClient {
    fn list_projects(&self) -> Result<Vec<ProjectInfo>, RemoteError> {
        let response = self.get("getProjects", "/api/projects", &[])?;
        let projects: Vec<ProjectDto> = parse_json("getProjects", response)?;
        Ok(projects
            .into_iter()
            .map(|p| ProjectInfo {
                id: p.id,
                title: p.title,
                available_languages: p.available_languages.into_iter().map(LangTag).collect(),
            })
            .collect())
    }

    fn list_concept_schemes(&self, project: &str) -> Result<Vec<SchemeInfo>, RemoteError> {
        let response = self.get(
            "getConceptSchemes",
            &format!("/api/thesaurus/{project}/schemes"),
            &[],
        )?;
        let schemes: Vec<SchemeDto> = parse_json("getConceptSchemes", response)?;
        Ok(schemes
            .into_iter()
            .map(|s| SchemeInfo {
                uri: ConceptUri(s.uri),
                title: s.title,
                descriptions: s.descriptions,
            })
            .collect())
    }

    fn create_concept_scheme(
        &self,
        project: &str,
        title: &str,
        description: &str,
    ) -> Result<ConceptUri, RemoteError> {
        let response = self.post(
            "createConceptScheme",
            &format!("/api/thesaurus/{project}/createConceptScheme"),
            &[("title", title), ("description", description)],
        )?;
        let uri: String = parse_json("createConceptScheme", response)?;
        Ok(ConceptUri(uri))
    }

    fn get_top_concepts(
        &self,
        project: &str,
        scheme: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<Vec<ConceptUri>, RemoteError> {
        let properties = properties.join(",");
        let response = self.get(
            "getTopConcepts",
            &format!("/api/thesaurus/{project}/topconcepts"),
            &[
                ("conceptScheme", scheme.0.as_str()),
                ("properties", properties.as_str()),
                ("language", lang.0.as_str()),
            ],
        )?;
        let concepts: Vec<ConceptDto> = parse_json("getTopConcepts", response)?;
        Ok(concepts.into_iter().map(|c| ConceptUri(c.uri)).collect())
    }

    fn get_sub_tree(
        &self,
        project: &str,
        scheme: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<Vec<ConceptTree>, RemoteError> {
        let properties = properties.join(",");
        let response = self.get(
            "getSubTree",
            &format!("/api/thesaurus/{project}/subtree"),
            &[
                ("root", scheme.0.as_str()),
                ("properties", properties.as_str()),
                ("language", lang.0.as_str()),
            ],
        )?;
        let trees: Vec<TreeDto> = parse_json("getSubTree", response)?;
        Ok(trees.into_iter().map(Into::into).collect())
    }

    fn get_concept(
        &self,
        project: &str,
        uri: &ConceptUri,
        properties: &[String],
        lang: &LangTag,
    ) -> Result<RemoteConcept, RemoteError> {
        let properties = properties.join(",");
        let response = self.get(
            "getConcept",
            &format!("/api/thesaurus/{project}/concept"),
            &[
                ("concept", uri.0.as_str()),
                ("properties", properties.as_str()),
                ("language", lang.0.as_str()),
            ],
        )?;
        let concept: ConceptDto = parse_json("getConcept", response)?;
        Ok(concept.into())
    }

    fn create_concept(
        &self,
        project: &str,
        label: &str,
        parent: &ConceptUri,
    ) -> Result<ConceptUri, RemoteError> {
        let response = self.post(
            "createConcept",
            &format!("/api/thesaurus/{project}/createConcept"),
            &[("prefLabel", label), ("parent", parent.0.as_str())],
        )?;
        let uri: String = parse_json("createConcept", response)?;
        Ok(ConceptUri(uri))
    }

    fn add_literal(
        &self,
        project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError> {
        self.post(
            "addLiteral",
            &format!("/api/thesaurus/{project}/addLiteral"),
            &[
                ("concept", uri.0.as_str()),
                ("property", property),
                ("label", value),
                ("language", lang.0.as_str()),
            ],
        )?;
        Ok(())
    }

    fn add_custom_attribute(
        &self,
        project: &str,
        uri: &ConceptUri,
        property: &str,
        value: &str,
        lang: &LangTag,
    ) -> Result<(), RemoteError> {
        self.post(
            "addCustomAttribute",
            &format!("/api/thesaurus/{project}/addCustomAttribute"),
            &[
                ("resource", uri.0.as_str()),
                ("property", property),
                ("value", value),
                ("language", lang.0.as_str()),
            ],
        )?;
        Ok(())
    }

    fn add_relation(
        &self,
        project: &str,
        child: &ConceptUri,
        parent: &ConceptUri,
    ) -> Result<(), RemoteError> {
        self.post(
            "addRelation",
            &format!("/api/thesaurus/{project}/addRelation"),
            &[
                ("sourceConcept", child.0.as_str()),
                ("targetConcept", parent.0.as_str()),
                ("property", "broader"),
            ],
        )?;
        Ok(())
    }
}
