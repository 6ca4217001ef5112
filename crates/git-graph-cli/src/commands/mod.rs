pub mod branches;
pub mod show;
pub mod watch;

use std::sync::Arc;

use anyhow::Result;
use clap::Subcommand;
use git_backend::CliBackend;
use git_session::{GraphConfig, RepoContext, Session};

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Build the graph once and print its cells, newest first
    Show(show::ShowArgs),
    /// List local and remote-tracking branches
    Branches(branches::BranchesArgs),
    /// Poll the repository and report every change to the graph
    Watch(watch::WatchArgs),
}

/// Session settings from `--config`, or the defaults.
pub fn load_config(cli: &Cli) -> Result<GraphConfig> {
    match &cli.config {
        Some(path) => Ok(GraphConfig::load(path)?),
        None => Ok(GraphConfig::default()),
    }
}

/// Open the repository containing the current directory.
pub fn open_context(session: &Session) -> Result<Arc<RepoContext>> {
    let backend = CliBackend::open(".")?;
    Ok(session.open(Arc::new(backend)))
}

pub fn run(cli: Cli) -> Result<i32> {
    let session = Session::new(load_config(&cli)?);
    match &cli.command {
        Commands::Show(args) => show::run(args, &session),
        Commands::Branches(args) => branches::run(args, &session),
        Commands::Watch(args) => watch::run(args, &session),
    }
}
