// HTTP client for the dungeon backend, used by the console session.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::api::{ContentResponse, DescribeResponse, StructureResponse};
use crate::describe::DescriptionKind;
use crate::github::RepoEntry;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with its `{error}` envelope.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Calls the session makes against the backend.
#[async_trait]
pub trait DungeonApi: Send + Sync {
    /// `GET /api/repo/{owner}/{repo}`
    async fn repo_root(&self, owner: &str, repo: &str) -> Result<Vec<RepoEntry>, ClientError>;

    /// `GET /api/file/{owner}/{repo}/{path}`
    async fn contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<ContentResponse, ClientError>;

    /// `GET /api/repo/{owner}/{repo}/structure`
    async fn structure(&self, owner: &str, repo: &str) -> Result<String, ClientError>;

    /// `POST /api/ai/describe`
    async fn describe(
        &self,
        code: &str,
        kind: DescriptionKind,
        file_name: Option<&str>,
    ) -> Result<String, ClientError>;
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// [`DungeonApi`] over HTTP.
pub struct HttpDungeonApi {
    client: Client,
    base_url: Url,
}

impl HttpDungeonApi {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint<'s>(&self, segments: impl IntoIterator<Item = &'s str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(segments.into_iter().filter(|s| !s.is_empty()));
        }
        url
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or_else(|_| format!("{status}"));
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        tracing::debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl DungeonApi for HttpDungeonApi {
    async fn repo_root(&self, owner: &str, repo: &str) -> Result<Vec<RepoEntry>, ClientError> {
        self.get_json(self.endpoint(["api", "repo", owner, repo]))
            .await
    }

    async fn contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<ContentResponse, ClientError> {
        let segments = ["api", "file", owner, repo]
            .into_iter()
            .chain(path.split('/'));
        self.get_json(self.endpoint(segments)).await
    }

    async fn structure(&self, owner: &str, repo: &str) -> Result<String, ClientError> {
        let body: StructureResponse = self
            .get_json(self.endpoint(["api", "repo", owner, repo, "structure"]))
            .await?;
        Ok(body.tree)
    }

    async fn describe(
        &self,
        code: &str,
        kind: DescriptionKind,
        file_name: Option<&str>,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(["api", "ai", "describe"]);
        let response = self
            .client
            .post(url)
            .json(&json!({
                "code": code,
                "type": kind.as_hint(),
                "fileName": file_name,
            }))
            .send()
            .await?;
        let body: DescribeResponse = Self::read_json(response).await?;
        Ok(body.description)
    }
}
