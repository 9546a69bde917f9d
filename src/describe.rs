// Themed code descriptions from a hosted generative-text model.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::metrics;

pub const FALLBACK_DESCRIPTION: &str = "This artifact's purpose is shrouded in mystery...";
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-pro";

const PERSONA: &str =
    "You are a creative dungeon master who describes code in a fantasy adventure style.";

/// Which framing the prompt uses. Also decides how much source is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionKind {
    /// A whole file, described as an artifact or location.
    File,
    /// A function or fragment, described as a spell or scroll.
    Snippet,
}

impl DescriptionKind {
    /// Map a request's `type` hint. Absent or `"file"` means a file, anything else a snippet.
    pub fn from_hint(hint: Option<&str>) -> Self {
        match hint.map(|h| h.trim().to_ascii_lowercase()) {
            None => DescriptionKind::File,
            Some(h) if h.is_empty() || h == "file" => DescriptionKind::File,
            Some(_) => DescriptionKind::Snippet,
        }
    }

    pub fn as_hint(&self) -> &'static str {
        match self {
            DescriptionKind::File => "file",
            DescriptionKind::Snippet => "function",
        }
    }

    /// Maximum number of characters of source submitted.
    pub fn max_chars(&self) -> usize {
        match self {
            DescriptionKind::File => 1000,
            DescriptionKind::Snippet => 500,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DescriptionError {
    #[error("no generative model is configured")]
    NotConfigured,
    #[error("generative model request failed: {0}")]
    Upstream(String),
    #[error("generative model returned no text")]
    EmptyResponse,
}

/// Longest prefix of `text` with at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_prompt(code: &str, kind: DescriptionKind, file_name: Option<&str>) -> String {
    let code = truncate_chars(code, kind.max_chars());
    let subject = match file_name {
        Some(name) if !name.trim().is_empty() => format!(" named `{}`", name.trim()),
        _ => String::new(),
    };
    let instruction = match kind {
        DescriptionKind::File => format!(
            "Describe what this code file{subject} does in a creative, fantasy-themed way, \
             as if it were a magical artifact or location in a dungeon. Keep it under 3 sentences."
        ),
        DescriptionKind::Snippet => format!(
            "Describe what this code function{subject} does in a creative, fantasy-themed way, \
             as if it were a spell or scroll. Keep it under 2 sentences."
        ),
    };
    format!("{PERSONA} {instruction}\n\n{code}")
}

/// Prompt in, text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, DescriptionError>;
}

// ── Gemini ───────────────────────────────────────────────────────────

/// Google Generative Language `generateContent` endpoint.
pub struct GeminiGenerator {
    client: Client,
    endpoint: Url,
    api_key: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

impl GeminiGenerator {
    pub fn new(base_url: &str, model: &str, api_key: String) -> Result<Self, DescriptionError> {
        let base = base_url.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/v1beta/models/{model}:generateContent"))
            .map_err(|e| DescriptionError::Upstream(format!("invalid API URL: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| DescriptionError::Upstream(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, DescriptionError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DescriptionError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(DescriptionError::Upstream(format!("{status}: {message}")));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| DescriptionError::Upstream(format!("malformed response: {e}")))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(DescriptionError::EmptyResponse);
        }
        Ok(text.trim().to_string())
    }
}

// ── Service ──────────────────────────────────────────────────────────

/// Describes code, degrading to [`FALLBACK_DESCRIPTION`] instead of failing.
#[derive(Clone, Default)]
pub struct DescriptionService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl DescriptionService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// A service with no model behind it; every description is the fallback.
    pub fn disabled() -> Self {
        Self { generator: None }
    }

    pub fn is_configured(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn try_describe(
        &self,
        code: &str,
        kind: DescriptionKind,
        file_name: Option<&str>,
    ) -> Result<String, DescriptionError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or(DescriptionError::NotConfigured)?;
        let prompt = build_prompt(code, kind, file_name);
        let result = generator.generate(&prompt).await;
        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::UPSTREAM_REQUESTS_TOTAL
            .with_label_values(&["gemini", outcome])
            .inc();
        result
    }

    /// Never fails: errors are logged and replaced with the fallback text.
    pub async fn describe(
        &self,
        code: &str,
        kind: DescriptionKind,
        file_name: Option<&str>,
    ) -> String {
        match self.try_describe(code, kind, file_name).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("AI description error: {e}");
                metrics::DESCRIPTION_FALLBACKS_TOTAL.inc();
                FALLBACK_DESCRIPTION.to_string()
            }
        }
    }
}
