//! Taxsync — taxonomy ⇄ thesaurus synchronization CLI.
//!
//! # Usage
//!
//! ```text
//! taxsync projects --server <url>
//! taxsync connect <taxonomy> --server <url> --project <id> [--scheme <uri> | --create-scheme <title>]
//!                 [--language local=remote ...] [--default-language <tag>]
//! taxsync disconnect <taxonomy> [--keep-nodes]
//! taxsync export <taxonomy> [--batch-size <n>]
//! taxsync update <taxonomy> [--batch-size <n>]
//! taxsync status [--json]
//! taxsync log <taxonomy> [--json]
//! ```
//!
//! Credentials for the remote server come from `--username`/`--password`
//! or the `TAXSYNC_USERNAME`/`TAXSYNC_PASSWORD` environment variables;
//! they are never written to disk.

mod commands;
mod ppt;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    connect::ConnectArgs, disconnect::DisconnectArgs, export::ExportArgs, log::LogArgs,
    projects::ProjectsArgs, status::StatusArgs, update::UpdateArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "taxsync",
    version,
    about = "Synchronize local taxonomies with a remote SKOS thesaurus server",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List remote projects and their concept schemes.
    Projects(ProjectsArgs),

    /// Connect a taxonomy to a remote concept scheme.
    Connect(ConnectArgs),

    /// Remove a connection and its synchronization state.
    Disconnect(DisconnectArgs),

    /// Push the local taxonomy tree into the connected scheme.
    Export(ExportArgs),

    /// Pull the remote hierarchy into the local taxonomy.
    Update(UpdateArgs),

    /// Show all connections with their last-run state.
    Status(StatusArgs),

    /// Show the synchronization log of one taxonomy.
    Log(LogArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Projects(args) => args.run(),
        Commands::Connect(args) => args.run(),
        Commands::Disconnect(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Update(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Log(args) => args.run(),
    }
}
