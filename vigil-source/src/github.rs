//! GitHub implementation of [`SourceProvider`].
//!
//! Wire contract:
//!   `GET /repos/{owner}/{repo}/commits/{branch}` → `{ sha }`
//!   `GET /repos/{owner}/{repo}/git/trees/{branch}?recursive=1`
//!     → `{ tree: [ { path, type } ] }`, filtered to `type == "blob"`
//!   `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}`
//!     with `Accept: application/vnd.github.v3.raw` → raw bytes
//!
//! Non-2xx responses carry the error body back as diagnostic text.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;

use vigil_core::types::{CommitId, FileEntry};

use crate::error::FetchError;
use crate::provider::SourceProvider;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const ACCEPT_JSON: &str = "application/vnd.github.v3+json";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";
const USER_AGENT: &str = "vigil";

/// [`SourceProvider`] backed by the GitHub REST API.
pub struct GitHubProvider {
    client: reqwest::Client,
    api_base: String,
    owner: String,
    repo: String,
    branch: String,
    token: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct CommitResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeNode>,
}

#[derive(Debug, Deserialize)]
struct TreeNode {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Keep only blob paths, preserving listing order.
fn blob_paths(tree: Vec<TreeNode>) -> Vec<String> {
    tree.into_iter()
        .filter(|node| node.kind == "blob")
        .map(|node| node.path)
        .collect()
}

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

impl GitHubProvider {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            branch: branch.into(),
            token: token.into(),
        }
    }

    /// Point the provider at a different API host (test servers).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn get(&self, url: &str, accept: &'static str) -> reqwest::RequestBuilder {
        self.client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", accept)
    }

    /// Issue a GET and classify any non-2xx response into [`FetchError`],
    /// preserving the error body as diagnostic text.
    async fn get_checked(
        &self,
        url: &str,
        accept: &'static str,
    ) -> Result<reqwest::Response, FetchError> {
        let response = self
            .get(url, accept)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(FetchError::from_status(status.as_u16(), body))
    }

    async fn fetch_blob(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base, self.owner, self.repo, path, self.branch
        );
        let response = self.get_checked(&url, ACCEPT_RAW).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SourceProvider for GitHubProvider {
    async fn resolve_commit(&self) -> Result<CommitId, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/commits/{}",
            self.api_base, self.owner, self.repo, self.branch
        );
        let response = self.get_checked(&url, ACCEPT_JSON).await?;
        let commit: CommitResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;
        Ok(CommitId::from(commit.sha))
    }

    async fn list_files(&self) -> Result<Vec<FileEntry>, FetchError> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, self.owner, self.repo, self.branch
        );
        let response = self.get_checked(&url, ACCEPT_JSON).await?;
        let listing: TreeResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        let paths = blob_paths(listing.tree);
        tracing::debug!(blobs = paths.len(), branch = %self.branch, "resolved remote tree");

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let content = self.fetch_blob(&path).await?;
            entries.push(FileEntry {
                path: PathBuf::from(path),
                content,
            });
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_listing_parses_and_filters_blobs() {
        let json = r#"{
            "sha": "abc123",
            "tree": [
                { "path": "package.json", "type": "blob", "sha": "1" },
                { "path": "src", "type": "tree", "sha": "2" },
                { "path": "src/index.js", "type": "blob", "sha": "3" },
                { "path": "vendor", "type": "commit", "sha": "4" }
            ]
        }"#;
        let listing: TreeResponse = serde_json::from_str(json).expect("parse");
        let paths = blob_paths(listing.tree);
        assert_eq!(paths, vec!["package.json", "src/index.js"]);
    }

    #[test]
    fn commit_response_parses_sha() {
        let json = r#"{ "sha": "def456", "commit": { "message": "wip" } }"#;
        let commit: CommitResponse = serde_json::from_str(json).expect("parse");
        assert_eq!(commit.sha, "def456");
    }

    #[test]
    fn request_urls_follow_wire_contract() {
        let provider = GitHubProvider::new("lux-jsx", "kiwi", "main", "t0k3n")
            .with_api_base("http://127.0.0.1:9999");
        assert_eq!(provider.api_base, "http://127.0.0.1:9999");
        assert_eq!(provider.owner, "lux-jsx");
        assert_eq!(provider.repo, "kiwi");
        assert_eq!(provider.branch, "main");
    }
}
