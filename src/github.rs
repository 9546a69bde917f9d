// Repository contents client: GitHub contents API behind a listing cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::{header, Client, Url};
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, ContentCache};
use crate::metrics;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "coders-dungeon/v1.0.0";

// ── Entries ──────────────────────────────────────────────────────────

/// One node reported by the contents API, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RepoEntry {
    File(FileEntry),
    Dir(EntryMeta),
    Symlink(EntryMeta),
    Submodule(EntryMeta),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    /// Base64 body, only present when a single file was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

impl RepoEntry {
    pub fn name(&self) -> &str {
        match self {
            RepoEntry::File(f) => &f.name,
            RepoEntry::Dir(m) | RepoEntry::Symlink(m) | RepoEntry::Submodule(m) => &m.name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            RepoEntry::File(f) => &f.path,
            RepoEntry::Dir(m) | RepoEntry::Symlink(m) | RepoEntry::Submodule(m) => &m.path,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, RepoEntry::Dir(_))
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            RepoEntry::File(f) => Some(f),
            _ => None,
        }
    }

    /// The `type` tag as the contents API spells it.
    pub fn kind(&self) -> &'static str {
        match self {
            RepoEntry::File(_) => "file",
            RepoEntry::Dir(_) => "dir",
            RepoEntry::Symlink(_) => "symlink",
            RepoEntry::Submodule(_) => "submodule",
        }
    }
}

/// Raw upstream response: a directory yields an array, a file a single object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing {
    Many(Vec<RepoEntry>),
    One(RepoEntry),
}

impl Listing {
    pub fn into_entries(self) -> Vec<RepoEntry> {
        match self {
            Listing::Many(entries) => entries,
            Listing::One(entry) => vec![entry],
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Failed to fetch repository contents: {0}")]
    RemoteFetch(String),
    #[error("Invalid repository identifier: {0}")]
    InvalidRepository(String),
    #[error("Invalid repository path: {0}")]
    InvalidPath(String),
    #[error("Failed to decode file content: {0}")]
    Decode(String),
}

/// Reject owner/repo names the contents API could never resolve.
pub fn validate_repo_component(value: &str) -> Result<(), RepoError> {
    let valid_chars = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if value.is_empty() || value == "." || value == ".." || !valid_chars {
        return Err(RepoError::InvalidRepository(value.to_string()));
    }
    Ok(())
}

/// Strip surrounding slashes and reject `.`/`..` segments.
pub fn normalize_path(path: &str) -> Result<String, RepoError> {
    let trimmed = path.trim().trim_matches('/');
    if trimmed
        .split('/')
        .any(|segment| segment == "." || segment == ".." || (segment.is_empty() && !trimmed.is_empty()))
    {
        return Err(RepoError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Decode a file's base64 body. The API wraps lines, so whitespace is dropped first.
pub fn decode_content(file: &FileEntry) -> Result<String, RepoError> {
    if let Some(encoding) = file.encoding.as_deref() {
        if encoding != "base64" {
            return Err(RepoError::Decode(format!(
                "{} has unsupported encoding '{encoding}'",
                file.path
            )));
        }
    }
    let Some(content) = file.content.as_deref() else {
        return Err(RepoError::Decode(format!("{} has no content", file.path)));
    };
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| RepoError::Decode(e.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ── Upstream source ──────────────────────────────────────────────────

/// Anything that can answer "what is at this path in this repository".
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get_contents(&self, owner: &str, repo: &str, path: &str)
        -> Result<Listing, RepoError>;
}

/// GitHub REST contents API.
pub struct GithubSource {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

#[derive(Deserialize)]
struct GithubErrorBody {
    message: String,
}

impl GithubSource {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, RepoError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| RepoError::RemoteFetch(format!("invalid API URL {base_url}: {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RepoError::RemoteFetch(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Result<Url, RepoError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoError::RemoteFetch(format!("invalid API URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["repos", owner, repo, "contents"])
            .extend(path.split('/').filter(|s| !s.is_empty()));
        Ok(url)
    }
}

#[async_trait]
impl ContentSource for GithubSource {
    async fn get_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Listing, RepoError> {
        let url = self.contents_url(owner, repo, path)?;
        let mut request = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RepoError::RemoteFetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GithubErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or(body);
            return Err(RepoError::RemoteFetch(format!("{status}: {message}")));
        }

        response
            .json::<Listing>()
            .await
            .map_err(|e| RepoError::RemoteFetch(format!("unexpected response: {e}")))
    }
}

// ── Cached client ────────────────────────────────────────────────────

/// Repository client that consults the listing cache before going upstream.
#[derive(Clone)]
pub struct RepoClient {
    source: Arc<dyn ContentSource>,
    cache: ContentCache,
}

impl RepoClient {
    pub fn new(source: Arc<dyn ContentSource>, cache: ContentCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    /// List `path` in `owner/repo`. A single file comes back as a one-element vector.
    ///
    /// Fresh cache hits never touch upstream. Concurrent misses on the same key
    /// wait for the first caller and then read its result from the cache.
    /// Upstream failures are not cached.
    pub async fn fetch_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Vec<RepoEntry>, RepoError> {
        validate_repo_component(owner)?;
        validate_repo_component(repo)?;
        let path = normalize_path(path)?;
        let key = CacheKey::new(owner, repo, &path);

        if let Some(hit) = self.cache.get(&key) {
            metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
            return Ok(hit);
        }

        let _flight = self.cache.flight_guard(&key).await;
        if let Some(hit) = self.cache.get(&key) {
            metrics::CACHE_LOOKUPS_TOTAL
                .with_label_values(&["coalesced"])
                .inc();
            return Ok(hit);
        }
        metrics::CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();

        match self.source.get_contents(owner, repo, &path).await {
            Ok(listing) => {
                metrics::UPSTREAM_REQUESTS_TOTAL
                    .with_label_values(&["github", "ok"])
                    .inc();
                let entries = listing.into_entries();
                tracing::debug!("Fetched {} entries for {key}", entries.len());
                self.cache.insert(key, entries.clone());
                Ok(entries)
            }
            Err(e) => {
                metrics::UPSTREAM_REQUESTS_TOTAL
                    .with_label_values(&["github", "error"])
                    .inc();
                tracing::error!("Error fetching repo contents for {key}: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_deserializes_by_type_tag() {
        let json = r#"[
            {"name": "src", "path": "src", "type": "dir", "sha": "abc", "size": 0,
             "url": "https://api.github.com/x", "_links": {"self": "x"}},
            {"name": "README.md", "path": "README.md", "type": "file", "size": 42},
            {"name": "vendor", "path": "vendor", "type": "submodule"}
        ]"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        let entries = listing.into_entries();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_dir());
        assert_eq!(entries[1].as_file().unwrap().size, 42);
        assert_eq!(entries[2].kind(), "submodule");
    }

    #[test]
    fn test_single_object_normalizes_to_one_element() {
        let json = r#"{"name": "a.rs", "path": "src/a.rs", "type": "file",
                       "content": "Zm4gbWFpbigpIHt9\n", "encoding": "base64"}"#;
        let listing: Listing = serde_json::from_str(json).unwrap();
        assert!(matches!(listing, Listing::One(_)));
        let entries = listing.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path(), "src/a.rs");
    }

    #[test]
    fn test_entry_serializes_with_type_tag() {
        let entry = RepoEntry::Dir(EntryMeta {
            name: "docs".into(),
            path: "docs".into(),
            ..EntryMeta::default()
        });
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["type"], "dir");
        assert_eq!(json["name"], "docs");
    }

    #[test]
    fn test_decode_content_ignores_line_breaks() {
        let file = FileEntry {
            name: "a.rs".into(),
            path: "a.rs".into(),
            content: Some("Zm4gbWFp\nbigpIHt9\n".into()),
            encoding: Some("base64".into()),
            ..FileEntry::default()
        };
        assert_eq!(decode_content(&file).unwrap(), "fn main() {}");
    }

    #[test]
    fn test_decode_content_rejects_missing_body() {
        let file = FileEntry {
            name: "big.bin".into(),
            path: "big.bin".into(),
            encoding: Some("none".into()),
            ..FileEntry::default()
        };
        assert!(matches!(decode_content(&file), Err(RepoError::Decode(_))));
    }

    #[test]
    fn test_validate_repo_component() {
        assert!(validate_repo_component("hello-world").is_ok());
        assert!(validate_repo_component("my.repo_1").is_ok());
        assert!(validate_repo_component("").is_err());
        assert!(validate_repo_component("..").is_err());
        assert!(validate_repo_component("a b").is_err());
        assert!(validate_repo_component("a/b").is_err());
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("").unwrap(), "");
        assert_eq!(normalize_path("/src/lib/").unwrap(), "src/lib");
        assert!(normalize_path("src/../etc").is_err());
        assert!(normalize_path("src//lib").is_err());
    }

    #[test]
    fn test_contents_url_escapes_segments() {
        let source = GithubSource::new(DEFAULT_API_URL, None).unwrap();
        let url = source
            .contents_url("octocat", "hello-world", "docs/my file.md")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octocat/hello-world/contents/docs/my%20file.md"
        );

        let root = source.contents_url("octocat", "hello-world", "").unwrap();
        assert_eq!(
            root.as_str(),
            "https://api.github.com/repos/octocat/hello-world/contents"
        );
    }
}
