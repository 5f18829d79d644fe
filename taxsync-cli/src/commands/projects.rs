//! `taxsync projects` — browse the remote catalog.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use taxsync_core::ConceptService;

use super::ServerArgs;

#[derive(Args, Debug)]
pub struct ProjectsArgs {
    #[command(flatten)]
    pub server: ServerArgs,
}

impl ProjectsArgs {
    pub fn run(self) -> Result<()> {
        let client = self.server.client(None)?;
        let projects = client.list_projects().context("listing projects failed")?;
        if projects.is_empty() {
            println!("No projects on this server.");
            return Ok(());
        }

        for project in projects {
            let languages = project
                .available_languages
                .iter()
                .map(|l| l.0.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "{} ({}) [{languages}]",
                project.title.bold(),
                project.id
            );
            match client.list_concept_schemes(&project.id) {
                Ok(schemes) if schemes.is_empty() => println!("  no concept schemes"),
                Ok(schemes) => {
                    for scheme in schemes {
                        println!("  {}  {}", scheme.uri, scheme.title);
                    }
                }
                Err(e) => println!("  {}", format!("schemes unavailable: {e}").yellow()),
            }
        }
        Ok(())
    }
}
