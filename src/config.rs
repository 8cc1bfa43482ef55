use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Looked up as `sentinel.json`, `sentinel.toml`, ... in the working directory.
const DEFAULT_CONFIG_NAME: &str = "sentinel";
/// Field overrides, e.g. `SENTINEL__STORAGE__SUMMARIES=out/summaries.json`.
const ENV_PREFIX: &str = "SENTINEL";

/// A document collection to merge, in priority order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSource {
    pub name: String,
    pub path: PathBuf,
}

/// Marks documents that are raw indicator lists rather than prose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDumpClassifier {
    pub origin_prefix: String,
    pub extension: String,
}

impl RawDumpClassifier {
    pub fn matches(&self, origin: &str, title: &str) -> bool {
        origin.starts_with(&self.origin_prefix) && title.ends_with(&self.extension)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoragePaths {
    pub summaries: PathBuf,
    pub ioc_index: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self {
            summaries: PathBuf::from("data/summaries.json"),
            ioc_index: PathBuf::from("data/ioc_index.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    /// "owner/name"
    pub repo: String,
    pub branch: String,
    /// Only paths under one of these are collected; empty means all.
    #[serde(default)]
    pub path_prefixes: Vec<String>,
}

impl Repository {
    fn new(repo: &str, branch: &str, path_prefixes: &[&str]) -> Self {
        Self {
            repo: repo.to_string(),
            branch: branch.to_string(),
            path_prefixes: path_prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Repository-origin collection written by `fetch-github`.
    pub output: PathBuf,
    pub api_url: String,
    pub raw_url: String,
    pub allowed_extensions: Vec<String>,
    pub repositories: Vec<Repository>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("data/github_articles.json"),
            api_url: "https://api.github.com".to_string(),
            raw_url: "https://raw.githubusercontent.com".to_string(),
            allowed_extensions: vec![".md".into(), ".txt".into(), ".json".into()],
            repositories: vec![
                Repository::new("MISP/misp-galaxy", "main", &["clusters/"]),
                Repository::new("stamparm/maltrail", "master", &["blacklists/", "trails/"]),
                Repository::new("executemalware/Malware-IOCs", "main", &[]),
                Repository::new("Neo23x0/signature-base", "master", &[]),
            ],
        }
    }
}

/// Everything the pipeline stages need, injected at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub document_sources: Vec<DocumentSource>,
    pub raw_dump_classifiers: Vec<RawDumpClassifier>,
    pub storage: StoragePaths,
    pub github: GithubConfig,
    pub prompt_version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let github = GithubConfig::default();
        Self {
            document_sources: vec![
                DocumentSource {
                    name: "feeds".to_string(),
                    path: PathBuf::from("data/raw_articles.json"),
                },
                DocumentSource {
                    name: "github".to_string(),
                    path: github.output.clone(),
                },
            ],
            raw_dump_classifiers: vec![RawDumpClassifier {
                origin_prefix: "github:stamparm/maltrail".to_string(),
                extension: ".txt".to_string(),
            }],
            storage: StoragePaths::default(),
            github,
            prompt_version: "v1.0".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Layer defaults, then a config file, then `SENTINEL__*` environment
    /// overrides. An explicitly named file must exist; the default
    /// `sentinel.*` file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = match explicit {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let config: Self = Config::builder()
            .add_source(Config::try_from(&Self::default()).context("Failed to seed config defaults")?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .with_context(|| match explicit {
                Some(path) => format!("Failed to load config {}", path.display()),
                None => "Failed to load config".to_string(),
            })?;

        info!(
            file = %explicit.map(|p| p.display().to_string()).unwrap_or_else(|| DEFAULT_CONFIG_NAME.to_string()),
            "Config loaded"
        );
        Ok(config)
    }

    pub fn is_raw_dump(&self, origin: &str, title: &str) -> bool {
        self.raw_dump_classifiers
            .iter()
            .any(|c| c.matches(origin, title))
    }
}
