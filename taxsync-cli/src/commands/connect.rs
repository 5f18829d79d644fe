//! `taxsync connect` — wire a taxonomy to a remote concept scheme.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use taxsync_core::{config, ConceptService, ConceptUri, LangTag, TaxonomyId};

use super::{home_dir, ServerArgs};

#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Taxonomy id (derived from --title when omitted).
    pub taxonomy: Option<String>,

    /// Human-readable title; the taxonomy id is derived from it.
    #[arg(long)]
    pub title: Option<String>,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Remote project id.
    #[arg(long)]
    pub project: String,

    /// URI of an existing concept scheme to connect to.
    #[arg(long, conflicts_with = "create_scheme")]
    pub scheme: Option<String>,

    /// Create a new concept scheme with this title and connect to it.
    #[arg(long)]
    pub create_scheme: Option<String>,

    /// Language mapping `local=remote`; repeat for additional languages.
    #[arg(long = "language", value_parser = parse_language_pair)]
    pub languages: Vec<(String, String)>,

    /// Local default language.
    #[arg(long, default_value = "en")]
    pub default_language: String,
}

impl ConnectArgs {
    pub fn run(self) -> Result<()> {
        let home = home_dir()?;
        let server_url = self
            .server
            .server
            .clone()
            .context("connect requires --server")?;
        let client = self.server.client(Some(&server_url))?;

        let taxonomy = match (&self.taxonomy, &self.title) {
            (Some(id), _) => TaxonomyId::from(id.as_str()),
            (None, Some(title)) => TaxonomyId::from_title(title),
            (None, None) => bail!("provide a taxonomy id or --title"),
        };

        let projects = client.list_projects().context("listing projects failed")?;
        if !projects.iter().any(|p| p.id == self.project) {
            bail!("project '{}' not found on {server_url}", self.project);
        }

        let scheme_uri = match (&self.scheme, &self.create_scheme) {
            (Some(uri), _) => {
                let schemes = client
                    .list_concept_schemes(&self.project)
                    .context("listing concept schemes failed")?;
                let uri = ConceptUri::from(uri.as_str());
                if !schemes.iter().any(|s| s.uri == uri) {
                    bail!("concept scheme '{uri}' not found in project '{}'", self.project);
                }
                uri
            }
            (None, Some(title)) => client
                .create_concept_scheme(
                    &self.project,
                    title,
                    &format!("Automatically created for the '{taxonomy}' taxonomy."),
                )
                .context("creating the concept scheme failed")?,
            (None, None) => bail!("provide --scheme or --create-scheme"),
        };

        let mut languages: BTreeMap<LangTag, LangTag> = self
            .languages
            .iter()
            .map(|(local, remote)| (LangTag::from(local.as_str()), LangTag::from(remote.as_str())))
            .collect();
        let default_language = LangTag::from(self.default_language.as_str());
        languages
            .entry(default_language.clone())
            .or_insert_with(|| default_language.clone());

        let connection = config::connect_at(
            &home,
            format!("{taxonomy}_{}", self.project),
            taxonomy,
            scheme_uri,
            self.project.clone(),
            server_url,
            languages,
            default_language,
        )
        .context("saving the connection failed")?;

        println!(
            "{} '{}' connected to {} (project '{}')",
            "✓".green(),
            connection.taxonomy,
            connection.scheme_uri,
            connection.project_id
        );
        Ok(())
    }
}

fn parse_language_pair(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((local, remote)) if !local.is_empty() => {
            Ok((local.to_string(), remote.to_string()))
        }
        _ => Err(format!("expected 'local=remote', got '{raw}'")),
    }
}
