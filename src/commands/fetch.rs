use anyhow::Result;
use tracing::info;

use crate::config::PipelineConfig;
use crate::docs::ingest::ingest_github;

/// Collect new files from the configured GitHub repositories
pub async fn fetch_github(config: &PipelineConfig) -> Result<()> {
    info!(
        repositories = config.github.repositories.len(),
        "Fetching GitHub threat intel files"
    );
    let added = ingest_github(&config.github).await?;
    info!(added, "GitHub fetch complete");
    Ok(())
}
