pub mod index;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::docs::types::{
    Collection, Document, LlmMeta, SummaryRecord, SummaryStatus, SummaryStore, SKIPPED_SUMMARY,
};
use crate::docs::{load_summaries, write_json};
use crate::ioc;
use crate::llm::{SummaryOutcome, SummaryRequest, Summarizer};

/// Where a document stands relative to the summary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocState {
    Unseen,
    /// Summarized or intentionally skipped; left alone.
    Done,
    /// Last attempt failed; dropped and reprocessed once per run.
    Failed,
}

impl DocState {
    pub fn of(existing: Option<&SummaryRecord>) -> Self {
        match existing.map(SummaryRecord::status) {
            None => DocState::Unseen,
            Some(SummaryStatus::Failed) => DocState::Failed,
            Some(SummaryStatus::Ok | SummaryStatus::Skipped) => DocState::Done,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub total: usize,
    pub already_done: usize,
    pub summarized: usize,
    pub raw_dumps: usize,
    /// Skipped by the summarizer itself (no content, empty reply).
    pub skipped: usize,
    pub retried: usize,
    pub failed: usize,
}

/// Drives every document through summarization and IOC extraction,
/// persisting the summary store after each one.
pub struct SummaryPipeline<'a, S> {
    config: &'a PipelineConfig,
    summarizer: &'a S,
}

impl<'a, S: Summarizer> SummaryPipeline<'a, S> {
    pub fn new(config: &'a PipelineConfig, summarizer: &'a S) -> Self {
        Self { config, summarizer }
    }

    /// Process `docs` against the summary store on disk.
    ///
    /// Documents are handled one at a time in URL order. The whole store is
    /// rewritten after each processed document, so an interrupted run only
    /// loses the document in flight.
    pub async fn run(&self, docs: &Collection) -> Result<RunReport> {
        let path = &self.config.storage.summaries;
        let mut store = load_summaries(path);
        let mut report = RunReport {
            total: docs.len(),
            ..Default::default()
        };

        for (n, (url, doc)) in docs.iter().enumerate() {
            let progress = format!("{}/{}", n + 1, report.total);
            match DocState::of(store.get(url)) {
                DocState::Done => {
                    debug!(progress = %progress, url = %url, "already summarized");
                    report.already_done += 1;
                    continue;
                }
                DocState::Failed => {
                    info!(progress = %progress, title = %doc.title, "retrying previously failed summary");
                    store.remove(url);
                    report.retried += 1;
                }
                DocState::Unseen => {}
            }

            let record = self.process(doc).await;
            match record.status() {
                SummaryStatus::Ok => report.summarized += 1,
                SummaryStatus::Failed => report.failed += 1,
                SummaryStatus::Skipped if record.summary == SKIPPED_SUMMARY => {
                    report.raw_dumps += 1
                }
                SummaryStatus::Skipped => report.skipped += 1,
            }

            info!(
                progress = %progress,
                title = %doc.title,
                status = ?record.status(),
                iocs = record.iocs.total(),
                risk = ioc::score::score(&record.iocs),
                "document processed"
            );

            store.insert(url.clone(), record);
            write_json(path, &store)
                .with_context(|| format!("Failed to persist summaries after {}", url))?;
        }

        info!(
            total = report.total,
            already_done = report.already_done,
            summarized = report.summarized,
            raw_dumps = report.raw_dumps,
            skipped = report.skipped,
            retried = report.retried,
            failed = report.failed,
            "summarization run complete"
        );
        if report.failed > 0 {
            warn!(failed = report.failed, "failed summaries will be retried next run");
        }

        Ok(report)
    }

    /// Build the summary record for one document. Never fails: summarizer
    /// errors come back as a `Failed` record.
    pub async fn process(&self, doc: &Document) -> SummaryRecord {
        let outcome = if self.config.is_raw_dump(&doc.origin, &doc.title) {
            SummaryOutcome::skipped(SKIPPED_SUMMARY)
        } else {
            self.summarizer
                .summarize(SummaryRequest {
                    content: &doc.content,
                    title: &doc.title,
                    url: &doc.url,
                })
                .await
        };

        // Extraction runs for skipped and failed documents too.
        let iocs = ioc::extract(&doc.content);

        SummaryRecord {
            title: doc.title.clone(),
            link: doc.url.clone(),
            summary: outcome.text,
            status: Some(outcome.status),
            iocs,
            llm_meta: LlmMeta {
                model: self.summarizer.model().to_string(),
                prompt_version: self.config.prompt_version.clone(),
                generated_on: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

/// Documents the next run would process (unseen or previously failed).
pub fn pending(docs: &Collection, store: &SummaryStore) -> usize {
    docs.keys()
        .filter(|url| DocState::of(store.get(*url)) != DocState::Done)
        .count()
}
