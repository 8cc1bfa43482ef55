mod fetch;
mod index;
mod summarize;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;

#[derive(Parser, Debug)]
#[command(
    name = "sentinel-stream",
    version,
    about = "Threat-intel ingestion: summarize documents and index their IOCs."
)]
pub struct Cli {
    /// Config file; defaults to `sentinel.*` in the working directory if present.
    #[arg(long, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// The requested stage, `run` when none is given.
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

/// Pipeline stages runnable from the command line.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Download new files from the configured GitHub repositories.
    FetchGithub,
    /// Summarize unseen and previously failed documents.
    Summarize,
    /// Rebuild the IOC index from the summary store.
    Index,
    /// Summarize, then index.
    Run,
}

pub async fn dispatch(command: Command, config: &PipelineConfig) -> Result<()> {
    match command {
        Command::FetchGithub => fetch::fetch_github(config).await,
        Command::Summarize => summarize::summarize(config).await,
        Command::Index => index::index(config),
        Command::Run => {
            summarize::summarize(config).await?;
            index::index(config)
        }
    }
}
