use std::path::Path;

use tracing::{info, warn};

use crate::docs::types::{IocIndex, IocIndexEntry, SummaryStore};
use crate::docs::{read_map, write_json};
use crate::error::StoreError;

/// Project the summary store onto URL → indicators, omitting records with no
/// indicators at all.
pub fn build_index(store: &SummaryStore) -> IocIndex {
    store
        .iter()
        .filter(|(_, record)| !record.iocs.is_empty())
        .map(|(url, record)| (url.clone(), IocIndexEntry::from(&record.iocs)))
        .collect()
}

/// Rebuild the index file from the summary store, overwriting any previous
/// index. Returns the number of entries written.
pub fn generate_index(summaries: &Path, output: &Path) -> Result<usize, StoreError> {
    let store: SummaryStore = match read_map(summaries) {
        Ok(store) => store,
        Err(e @ StoreError::MissingArtifact(_)) => return Err(e),
        Err(e) => {
            warn!("{}; indexing an empty store", e);
            SummaryStore::new()
        }
    };
    let index = build_index(&store);
    write_json(output, &index)?;

    info!(
        path = %output.display(),
        entries = index.len(),
        records = store.len(),
        generated = store.values().filter(|r| r.is_generated()).count(),
        "IOC index written"
    );
    Ok(index.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::types::{IndicatorSet, LlmMeta, SummaryRecord, SummaryStatus};

    fn record(url: &str, iocs: IndicatorSet) -> SummaryRecord {
        SummaryRecord {
            title: "t".to_string(),
            link: url.to_string(),
            summary: "- summary".to_string(),
            status: Some(SummaryStatus::Ok),
            iocs,
            llm_meta: LlmMeta {
                model: "llama2".to_string(),
                prompt_version: "v1.0".to_string(),
                generated_on: "2024-05-01T10:00:00Z".to_string(),
            },
        }
    }

    fn store() -> SummaryStore {
        let mut store = SummaryStore::new();
        store.insert("https://empty".to_string(), record("https://empty", IndicatorSet::default()));
        store.insert(
            "https://hash-only".to_string(),
            record(
                "https://hash-only",
                IndicatorSet {
                    hash: vec!["d41d8cd98f00b204e9800998ecf8427e".to_string()],
                    ..Default::default()
                },
            ),
        );
        store
    }

    #[test]
    fn test_omits_records_without_indicators() {
        let index = build_index(&store());
        assert_eq!(index.len(), 1);
        assert!(!index.contains_key("https://empty"));
        let entry = &index["https://hash-only"];
        assert!(entry.ipv4.is_empty());
        assert!(entry.url.is_empty());
        assert_eq!(entry.hash, vec!["d41d8cd98f00b204e9800998ecf8427e"]);
    }

    #[test]
    fn test_missing_store_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = generate_index(
            &dir.path().join("summaries.json"),
            &dir.path().join("ioc_index.json"),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::MissingArtifact(_)));
        assert!(!dir.path().join("ioc_index.json").exists());
    }

    #[test]
    fn test_rebuild_overwrites_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let summaries = dir.path().join("summaries.json");
        let output = dir.path().join("ioc_index.json");
        std::fs::write(&output, r#"{"https://stale": {"ipv4": ["1.1.1.1"], "url": [], "hash": []}}"#)
            .unwrap();
        write_json(&summaries, &store()).unwrap();

        assert_eq!(generate_index(&summaries, &output).unwrap(), 1);
        let written: IocIndex = read_map(&output).unwrap();
        assert_eq!(written.keys().collect::<Vec<_>>(), vec!["https://hash-only"]);
    }

    #[test]
    fn test_malformed_store_yields_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let summaries = dir.path().join("summaries.json");
        let output = dir.path().join("ioc_index.json");
        std::fs::write(&summaries, "[1, 2, 3]").unwrap();

        assert_eq!(generate_index(&summaries, &output).unwrap(), 0);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");
    }
}
