use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info, warn};

use super::types::{Collection, Document};
use super::{load_collection, write_json};
use crate::config::{GithubConfig, Repository};

const USER_AGENT: &str = "SentinelStream";

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Whether a repository path should be collected: allowed extension, and
/// under one of the repository's prefixes when it lists any.
fn wanted(path: &str, repo: &Repository, extensions: &[String]) -> bool {
    let ext_ok = extensions.iter().any(|ext| path.ends_with(ext.as_str()));
    let prefix_ok = repo.path_prefixes.is_empty()
        || repo.path_prefixes.iter().any(|p| path.starts_with(p.as_str()));
    ext_ok && prefix_ok
}

fn raw_url(base: &str, repo: &Repository, path: &str) -> String {
    format!(
        "{}/{}/{}/{}",
        base.trim_end_matches('/'),
        repo.repo,
        repo.branch,
        path
    )
}

fn blob_paths(tree: TreeResponse) -> Vec<String> {
    tree.tree
        .into_iter()
        .filter(|e| e.kind == "blob")
        .map(|e| e.path)
        .collect()
}

/// Wanted files whose raw URL is not in `docs` yet, as `(path, url)`.
fn new_files<'p>(
    files: &'p [String],
    repo: &Repository,
    config: &GithubConfig,
    docs: &Collection,
) -> Vec<(&'p str, String)> {
    files
        .iter()
        .filter(|p| wanted(p, repo, &config.allowed_extensions))
        .map(|p| (p.as_str(), raw_url(&config.raw_url, repo, p)))
        .filter(|(_, url)| !docs.contains_key(url))
        .collect()
}

fn document(url: String, path: &str, repo: &Repository, content: String) -> Document {
    let title = path.rsplit('/').next().unwrap_or(path).to_string();
    Document {
        url,
        title,
        published: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        content,
        origin: format!("github:{}", repo.repo),
    }
}

/// Pulls threat-intel files out of GitHub repositories.
pub struct GithubFetcher<'a> {
    client: reqwest::Client,
    config: &'a GithubConfig,
    token: Option<String>,
}

impl<'a> GithubFetcher<'a> {
    pub fn new(config: &'a GithubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;
        let token = dotenv::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self {
            client,
            config,
            token,
        })
    }

    /// Blob paths of the repository's tree at its configured branch.
    async fn list_files(&self, repo: &Repository) -> Result<Vec<String>> {
        let url = format!(
            "{}/repos/{}/git/trees/{}?recursive=1",
            self.config.api_url.trim_end_matches('/'),
            repo.repo,
            repo.branch
        );
        let mut req = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            req = req.header("Authorization", format!("Bearer {}", token));
        }

        let resp = req.send().await.context("GitHub tree request failed")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("listing {} returned {}", repo.repo, status);
        }
        let tree: TreeResponse = resp.json().await.context("Failed to parse GitHub tree")?;
        if tree.truncated {
            warn!(repo = %repo.repo, "GitHub tree listing truncated");
        }

        Ok(blob_paths(tree))
    }

    async fn fetch_raw(&self, url: &str) -> Result<Option<String>> {
        let resp = self.client.get(url).send().await.context("raw fetch failed")?;
        let status = resp.status();
        if !status.is_success() {
            warn!(url, %status, "skipped file");
            return Ok(None);
        }
        let text = resp.text().await.context("Failed to read raw file")?;
        Ok(Some(text).filter(|t| !t.is_empty()))
    }

    /// Add every wanted file not already in `docs`. Existing entries are
    /// never re-fetched or replaced. Returns the number of new documents.
    pub async fn fetch_into(&self, docs: &mut Collection) -> usize {
        let mut added = 0;

        for repo in &self.config.repositories {
            info!(repo = %repo.repo, branch = %repo.branch, "Scanning repository");
            let files = match self.list_files(repo).await {
                Ok(files) => files,
                Err(e) => {
                    error!(repo = %repo.repo, "Failed to list repository: {:#}", e);
                    continue;
                }
            };

            let mut repo_added = 0;
            for (path, url) in new_files(&files, repo, self.config, docs) {
                match self.fetch_raw(&url).await {
                    Ok(Some(content)) => {
                        docs.insert(url.clone(), document(url, path, repo, content));
                        repo_added += 1;
                    }
                    Ok(None) => {}
                    Err(e) => warn!(url = %url, "{:#}", e),
                }
            }

            info!(repo = %repo.repo, added = repo_added, "Repository scanned");
            added += repo_added;
        }

        added
    }
}

/// Load the repository-origin collection, fetch new files into it and save
/// it back. Returns the number of new documents.
pub async fn ingest_github(config: &GithubConfig) -> Result<usize> {
    let mut docs = load_collection(&config.output);
    let fetcher = GithubFetcher::new(config)?;
    let added = fetcher.fetch_into(&mut docs).await;

    write_json(&config.output, &docs)?;
    info!(
        added,
        total = docs.len(),
        path = %config.output.display(),
        "GitHub articles saved"
    );
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(prefixes: &[&str]) -> Repository {
        Repository {
            repo: "stamparm/maltrail".to_string(),
            branch: "master".to_string(),
            path_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn exts() -> Vec<String> {
        vec![".md".into(), ".txt".into(), ".json".into()]
    }

    #[test]
    fn test_wanted_respects_prefixes() {
        let r = repo(&["blacklists/", "trails/"]);
        assert!(wanted("trails/static/malware/emotet.txt", &r, &exts()));
        assert!(!wanted("docs/README.md", &r, &exts()));
        assert!(!wanted("trails/static/malware/emotet.py", &r, &exts()));
    }

    #[test]
    fn test_wanted_without_prefixes() {
        let r = repo(&[]);
        assert!(wanted("2024/03/iocs.txt", &r, &exts()));
        assert!(!wanted("image.png", &r, &exts()));
    }

    #[test]
    fn test_document_fields() {
        let r = repo(&[]);
        let url = "https://raw.githubusercontent.com/stamparm/maltrail/master/trails/x/emotet.txt";
        let doc = document(url.to_string(), "trails/x/emotet.txt", &r, "1.2.3.4".to_string());
        assert_eq!(doc.url, url);
        assert_eq!(doc.title, "emotet.txt");
        assert_eq!(doc.origin, "github:stamparm/maltrail");
        assert!(doc.published.ends_with('Z'));
    }

    #[test]
    fn test_raw_url() {
        assert_eq!(
            raw_url("https://raw.githubusercontent.com/", &repo(&[]), "trails/a.txt"),
            "https://raw.githubusercontent.com/stamparm/maltrail/master/trails/a.txt"
        );
    }

    #[test]
    fn test_blob_paths_drops_directories() {
        let tree: TreeResponse = serde_json::from_str(
            r#"{"sha": "abc", "tree": [
                {"path": "trails", "type": "tree"},
                {"path": "trails/a.txt", "type": "blob", "size": 10},
                {"path": "vendor/lib", "type": "commit"}
            ], "truncated": false}"#,
        )
        .unwrap();
        assert_eq!(blob_paths(tree), vec!["trails/a.txt"]);
    }

    #[test]
    fn test_new_files_skips_known_urls() {
        let mut config = GithubConfig::default();
        config.raw_url = "https://raw.example".to_string();
        let r = repo(&["trails/"]);
        let known = "https://raw.example/stamparm/maltrail/master/trails/old.txt";

        let mut docs = Collection::new();
        docs.insert(
            known.to_string(),
            document(known.to_string(), "trails/old.txt", &r, "198.51.100.1".to_string()),
        );

        let files = vec![
            "trails/old.txt".to_string(),
            "trails/new.txt".to_string(),
            "trails/tool.py".to_string(),
            "README.md".to_string(),
        ];
        let selected = new_files(&files, &r, &config, &docs);

        assert_eq!(
            selected,
            vec![(
                "trails/new.txt",
                "https://raw.example/stamparm/maltrail/master/trails/new.txt".to_string()
            )]
        );
        assert_eq!(docs[known].content, "198.51.100.1");
    }
}
