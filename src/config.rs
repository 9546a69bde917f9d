// Application configuration, loaded from environment variables and CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::tree::TreeLimits;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Base URL of the repository contents API.
    pub github_api_url: String,
    /// Token passed through to the contents API, if any.
    pub github_token: Option<String>,
    /// Base URL of the generative-text API.
    pub gemini_api_url: String,
    /// Without a key every description is the fallback text.
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    /// How long fetched listings stay fresh.
    pub cache_ttl: Duration,
    pub tree_limits: TreeLimits,
}

impl Config {
    /// Load configuration from environment variables and CLI arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 3001)
    /// - `GITHUB_TOKEN` - token for the contents API (optional)
    /// - `GITHUB_API_URL` - contents API base (default: `https://api.github.com`)
    /// - `GEMINI_API_KEY` - generative model key (optional)
    /// - `GEMINI_API_URL` - generative API base
    /// - `GEMINI_MODEL` - model name (default: `gemini-pro`)
    /// - `CACHE_TTL_SECS` - listing cache lifetime (default: 1800)
    /// - `TREE_MAX_DEPTH`, `TREE_MAX_NODES` - map size ceilings
    ///
    /// CLI flags:
    /// - `--port <PORT>` - Override the port
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = cli_value(&args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| parse_env("PORT"))
            .unwrap_or(3001);

        let github_api_url = non_empty_env("GITHUB_API_URL")
            .unwrap_or_else(|| crate::github::DEFAULT_API_URL.to_string());
        let gemini_api_url = non_empty_env("GEMINI_API_URL")
            .unwrap_or_else(|| crate::describe::DEFAULT_API_URL.to_string());
        let gemini_model = non_empty_env("GEMINI_MODEL")
            .unwrap_or_else(|| crate::describe::DEFAULT_MODEL.to_string());

        let cache_ttl = parse_env("CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TTL);

        let defaults = TreeLimits::default();
        let tree_limits = TreeLimits {
            max_depth: parse_env("TREE_MAX_DEPTH").unwrap_or(defaults.max_depth),
            max_nodes: parse_env("TREE_MAX_NODES").unwrap_or(defaults.max_nodes),
        };

        Config {
            port,
            github_api_url,
            github_token: non_empty_env("GITHUB_TOKEN"),
            gemini_api_url,
            gemini_api_key: non_empty_env("GEMINI_API_KEY"),
            gemini_model,
            cache_ttl,
            tree_limits,
        }
    }
}

/// Load variables from a `.env` file in the working directory or its parents.
/// Variables already set in the environment win.
pub fn load_env_file() -> Option<PathBuf> {
    report_env_file(dotenvy::dotenv())
}

fn report_env_file(result: Result<PathBuf, dotenvy::Error>) -> Option<PathBuf> {
    match result {
        Ok(path) => {
            tracing::debug!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            tracing::warn!("Failed to read .env file: {e}");
            None
        }
    }
}

/// Parse a CLI flag value like `--port 8080`.
pub fn cli_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2).find_map(|pair| {
        if pair[0] == flag {
            Some(pair[1].clone())
        } else {
            None
        }
    })
}

/// An env var that is set to something other than whitespace.
fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_env(name).and_then(|v| v.parse().ok())
}
