use anyhow::{Context, Result};

use crate::config::PipelineConfig;
use crate::pipeline::index::generate_index;

/// Rebuild the IOC index from the summary store
pub fn index(config: &PipelineConfig) -> Result<()> {
    generate_index(&config.storage.summaries, &config.storage.ioc_index)
        .context("IOC index generation failed")?;
    Ok(())
}
