mod commands;
mod config;
mod docs;
mod error;
mod ioc;
mod llm;
mod pipeline;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;
use crate::config::PipelineConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let command = cli.command();

    let config = PipelineConfig::load(cli.config.as_deref())?;
    info!(
        ?command,
        sources = config.document_sources.len(),
        classifiers = config.raw_dump_classifiers.len(),
        "SentinelStream starting"
    );

    if let Err(e) = commands::dispatch(command, &config).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
