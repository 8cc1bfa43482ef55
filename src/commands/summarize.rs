use anyhow::Result;
use tracing::info;

use crate::config::PipelineConfig;
use crate::docs::{load_collection, load_summaries, merge};
use crate::llm::LlmClient;
use crate::pipeline::{pending, SummaryPipeline};

/// Merge the document collections and summarize whatever is new or failed
pub async fn summarize(config: &PipelineConfig) -> Result<()> {
    let merged = merge::merge(
        config
            .document_sources
            .iter()
            .map(|source| (source.name.as_str(), load_collection(&source.path))),
    );

    let todo = pending(&merged, &load_summaries(&config.storage.summaries));
    info!(documents = merged.len(), pending = todo, "Summarization starting");
    if todo == 0 {
        return Ok(());
    }

    let llm = LlmClient::from_env()?;
    SummaryPipeline::new(config, &llm).run(&merged).await?;
    Ok(())
}
