use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Document URL, the primary key of every collection.
pub type DocUrl = String;

/// URL-keyed document collection (feed or repository origin, or merged).
pub type Collection = BTreeMap<DocUrl, Document>;

/// URL-keyed summary store.
pub type SummaryStore = BTreeMap<DocUrl, SummaryRecord>;

/// URL-keyed IOC index, derived from the summary store.
pub type IocIndex = BTreeMap<DocUrl, IocIndexEntry>;

/// Failure marker the summarizer prefixes onto the error detail.
pub const FAILED_PREFIX: &str = "❌ API request failed";
/// Summary text for raw indicator dumps that bypass the LLM.
pub const SKIPPED_SUMMARY: &str = "⚠️ Skipped LLM summarization — IOC dump file";
pub const NO_CONTENT_SUMMARY: &str = "⚠️ No content to summarize.";
pub const EMPTY_REPLY_SUMMARY: &str = "⚠️ No valid summary generated.";

fn untitled() -> String {
    "Untitled".to_string()
}

/// A content unit to be summarized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Overwritten with the collection key on load; the key is authoritative.
    #[serde(rename = "link", default)]
    pub url: DocUrl,
    #[serde(default = "untitled")]
    pub title: String,
    #[serde(default)]
    pub published: String,
    #[serde(default)]
    pub content: String,
    /// e.g. a feed URL or "github:owner/repo"
    #[serde(rename = "source", alias = "origin", default)]
    pub origin: String,
}

/// Indicators extracted from a document, in match order, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorSet {
    #[serde(default)]
    pub ipv4: Vec<String>,
    #[serde(default)]
    pub url: Vec<String>,
    #[serde(default)]
    pub hash: Vec<String>,
}

impl IndicatorSet {
    pub fn total(&self) -> usize {
        self.ipv4.len() + self.url.len() + self.hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// `Ok` and `Skipped` records are final; `Failed` ones are retried next run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Ok,
    Skipped,
    Failed,
}

impl SummaryStatus {
    /// Classify a summary written before the status field existed.
    pub fn infer(summary: &str) -> Self {
        if summary.starts_with(FAILED_PREFIX) {
            SummaryStatus::Failed
        } else if [SKIPPED_SUMMARY, NO_CONTENT_SUMMARY, EMPTY_REPLY_SUMMARY]
            .iter()
            .any(|notice| summary.starts_with(notice))
        {
            SummaryStatus::Skipped
        } else {
            SummaryStatus::Ok
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMeta {
    pub model: String,
    pub prompt_version: String,
    /// RFC 3339; older stores hold naive ISO-8601 strings.
    pub generated_on: String,
}

/// Derived record, one per document URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub link: DocUrl,
    pub summary: String,
    /// Absent in stores written before statuses were tracked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SummaryStatus>,
    #[serde(default)]
    pub iocs: IndicatorSet,
    pub llm_meta: LlmMeta,
}

impl SummaryRecord {
    pub fn status(&self) -> SummaryStatus {
        self.status
            .unwrap_or_else(|| SummaryStatus::infer(&self.summary))
    }

    /// True when `summary` is LLM prose rather than a skip or failure notice.
    pub fn is_generated(&self) -> bool {
        self.status() == SummaryStatus::Ok
    }
}

/// Index entry: the indicator sets of one summarized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IocIndexEntry {
    pub ipv4: Vec<String>,
    pub url: Vec<String>,
    pub hash: Vec<String>,
}

impl From<&IndicatorSet> for IocIndexEntry {
    fn from(iocs: &IndicatorSet) -> Self {
        Self {
            ipv4: iocs.ipv4.clone(),
            url: iocs.url.clone(),
            hash: iocs.hash.clone(),
        }
    }
}
