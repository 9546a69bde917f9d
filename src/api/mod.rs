// HTTP API routes: repository listings, file descriptions, dungeon maps.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Json, MatchedPath, Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::describe::{DescriptionKind, DescriptionService};
use crate::github::{self, FileEntry, RepoClient, RepoEntry, RepoError};
use crate::metrics;
use crate::tree::{self, TreeError, TreeLimits};

// ── Request / response types ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DescribeRequest {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeResponse {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureResponse {
    pub tree: String,
}

/// A single file record with its decoded body and generated description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    #[serde(flatten)]
    pub file: FileEntry,
    #[serde(rename = "type", default = "file_tag")]
    pub entry_type: String,
    pub ai_description: String,
    pub decoded_content: String,
}

fn file_tag() -> String {
    "file".to_string()
}

/// Body of `GET /api/file/...`: a directory listing or one described file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentResponse {
    Listing(Vec<RepoEntry>),
    File(FileView),
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub repo: RepoClient,
    pub describer: DescriptionService,
    pub tree_limits: TreeLimits,
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("{0}")]
    BadRequest(String),
}

fn json_error(status: StatusCode, msg: &str) -> Response {
    (status, Json(json!({ "error": msg }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Repo(_) | ApiError::Tree(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        json_error(status, &self.to_string())
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/repo/{owner}/{repo}", get(get_repo))
        .route("/api/repo/{owner}/{repo}/structure", get(get_structure))
        .route("/api/file/{owner}/{repo}/{*path}", get(get_file))
        .route("/api/ai/describe", post(describe_code))
        .route_layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record request count and latency per matched route.
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, &status])
        .inc();
    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[&endpoint])
        .observe(started.elapsed().as_secs_f64());
    response
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn get_repo(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Vec<RepoEntry>>, ApiError> {
    let entries = state
        .repo
        .fetch_contents(&owner, &repo, "")
        .await
        .inspect_err(|e| tracing::error!("Error in /api/repo: {e}"))?;
    Ok(Json(entries))
}

async fn get_structure(
    State(state): State<AppState>,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<StructureResponse>, ApiError> {
    let tree = tree::build_tree(&state.repo, &owner, &repo, "", state.tree_limits)
        .await
        .inspect_err(|e| tracing::error!("Error in /api/repo/structure: {e}"))?;
    tracing::info!(
        "Mapped {owner}/{repo}: {} chambers and artifacts",
        tree.node_count()
    );
    Ok(Json(StructureResponse {
        tree: tree.render(),
    }))
}

async fn get_file(
    State(state): State<AppState>,
    Path((owner, repo, path)): Path<(String, String, String)>,
) -> Result<Json<ContentResponse>, ApiError> {
    let entries = state
        .repo
        .fetch_contents(&owner, &repo, &path)
        .await
        .inspect_err(|e| tracing::error!("Error in /api/file: {e}"))?;

    let file = match single_file(&entries, &path) {
        Some(file) => file.clone(),
        None => return Ok(Json(ContentResponse::Listing(entries))),
    };

    let decoded_content = github::decode_content(&file)
        .inspect_err(|e| tracing::error!("Error in /api/file: {e}"))?;
    let ai_description = state
        .describer
        .describe(&decoded_content, DescriptionKind::File, Some(&file.name))
        .await;

    Ok(Json(ContentResponse::File(FileView {
        file,
        entry_type: file_tag(),
        ai_description,
        decoded_content,
    })))
}

async fn describe_code(
    State(state): State<AppState>,
    body: Result<Json<DescribeRequest>, JsonRejection>,
) -> Result<Json<DescribeResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let code = match req.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => return Err(ApiError::BadRequest("code is required".to_string())),
    };
    let kind = DescriptionKind::from_hint(req.kind.as_deref());
    let description = state
        .describer
        .describe(code, kind, req.file_name.as_deref())
        .await;
    Ok(Json(DescribeResponse { description }))
}

/// The listing is a file record when it holds one file that does not live
/// under the requested path. A symlinked file reports its target's path.
fn single_file<'a>(entries: &'a [RepoEntry], requested: &str) -> Option<&'a FileEntry> {
    let requested = requested.trim_matches('/');
    if requested.is_empty() {
        return None;
    }
    match entries {
        [RepoEntry::File(file)] if !file.path.starts_with(&format!("{requested}/")) => Some(file),
        _ => None,
    }
}
