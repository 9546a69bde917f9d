use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use dungeon_backend::api::{self, AppState};
use dungeon_backend::cache::ContentCache;
use dungeon_backend::config::{self, Config};
use dungeon_backend::describe::{DescriptionService, GeminiGenerator};
use dungeon_backend::github::{GithubSource, RepoClient};
use dungeon_backend::metrics;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "dungeon-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

fn describer(config: &Config) -> DescriptionService {
    let Some(key) = config.gemini_api_key.clone() else {
        tracing::warn!("GEMINI_API_KEY is not set; descriptions will use the fallback text");
        return DescriptionService::disabled();
    };
    match GeminiGenerator::new(&config.gemini_api_url, &config.gemini_model, key) {
        Ok(generator) => DescriptionService::new(Arc::new(generator)),
        Err(e) => {
            tracing::error!("Failed to set up the description model: {e}");
            DescriptionService::disabled()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    config::load_env_file();
    metrics::register_metrics();

    let config = Config::load();

    let source = GithubSource::new(&config.github_api_url, config.github_token.clone())
        .expect("Failed to create GitHub client");
    if config.github_token.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set; unauthenticated requests are heavily rate limited");
    }
    let repo = RepoClient::new(Arc::new(source), ContentCache::with_ttl(config.cache_ttl));

    let state = AppState {
        repo,
        describer: describer(&config),
        tree_limits: config.tree_limits,
    };

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(api::router(state))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {}: {e}", config.port));

    tracing::info!("Dungeon backend listening on port {}", config.port);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
