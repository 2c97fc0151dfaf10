// AI remediation text for findings

use async_trait::async_trait;
use reqwest::Client;
use seoprobe_scanner::FindingKind;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
const GEMINI_API_KEY_HEADER: &str = "x-goog-api-key";
const GEMINI_TIMEOUT_SECS: u64 = 30;

/// Context for one recommendation.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationRequest<'a> {
    pub finding_description: &'a str,
    pub finding_kind: FindingKind,
    pub page_url: &'a str,
    pub technology: Option<&'a str>,
}

/// Produces advisory text for a finding. Implementations never fail:
/// every problem is turned into readable fallback text.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn generate(&self, request: &RecommendationRequest<'_>) -> String;
}

/// Why no model text could be returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendationFallback {
    Unavailable,
    EmptyResponse,
    SafetyBlocked(String),
    Truncated(String),
    Error(String),
}

impl fmt::Display for RecommendationFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationFallback::Unavailable => write!(
                f,
                "AI recommendations are unavailable: no Gemini API key is configured."
            ),
            RecommendationFallback::EmptyResponse => write!(
                f,
                "AI recommendation unavailable: the model returned an empty response."
            ),
            RecommendationFallback::SafetyBlocked(reason) => write!(
                f,
                "AI recommendation withheld: the request was blocked by the provider's safety filters ({}).",
                reason
            ),
            RecommendationFallback::Truncated(reason) => write!(
                f,
                "AI recommendation incomplete: generation stopped before producing text ({}).",
                reason
            ),
            RecommendationFallback::Error(error) => write!(
                f,
                "AI recommendation unavailable due to an error: {}",
                error
            ),
        }
    }
}

pub fn build_prompt(request: &RecommendationRequest<'_>) -> String {
    let technology = request.technology.unwrap_or("an unknown technology");
    format!(
        "You are an SEO consultant. A site audit of {url} (built with {tech}) reported \
         the following {kind}: \"{finding}\". Give a concise, practical recommendation \
         to fix it, specific to {tech} where that helps. Answer in at most 120 words.",
        url = request.page_url,
        tech = technology,
        kind = request.finding_kind,
        finding = request.finding_description,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(GEMINI_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Reads the key from `GEMINI_API_KEY`.
    pub fn from_env() -> Self {
        Self::new(std::env::var(GEMINI_API_KEY_ENV).ok())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn request(&self, request: &RecommendationRequest<'_>) -> Result<String, RecommendationFallback> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(RecommendationFallback::Unavailable)?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = json!({
            "contents": [{ "parts": [{ "text": build_prompt(request) }] }]
        });

        debug!("Requesting recommendation for {}", request.page_url);
        let response = self
            .client
            .post(&endpoint)
            .header(GEMINI_API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RecommendationFallback::Error(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecommendationFallback::Error(format!("HTTP {}", status.as_u16())));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| {
                RecommendationFallback::Error(format!("malformed response: {}", e.without_url()))
            })?;

        interpret_response(parsed)
    }
}

fn interpret_response(response: GenerateContentResponse) -> Result<String, RecommendationFallback> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RecommendationFallback::SafetyBlocked(reason));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(RecommendationFallback::EmptyResponse);
    };

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    let text = text.trim();
    if !text.is_empty() {
        return Ok(text.to_string());
    }

    match candidate.finish_reason.as_deref() {
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII")) => {
            Err(RecommendationFallback::SafetyBlocked(reason.to_string()))
        }
        Some(reason @ ("MAX_TOKENS" | "OTHER")) => {
            Err(RecommendationFallback::Truncated(reason.to_string()))
        }
        _ => Err(RecommendationFallback::EmptyResponse),
    }
}

#[async_trait]
impl RecommendationProvider for GeminiProvider {
    async fn generate(&self, request: &RecommendationRequest<'_>) -> String {
        match self.request(request).await {
            Ok(text) => text,
            Err(fallback) => {
                if fallback != RecommendationFallback::Unavailable {
                    warn!("Recommendation for {} degraded: {}", request.page_url, fallback);
                }
                fallback.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    const MODEL_PATH: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

    fn request() -> RecommendationRequest<'static> {
        RecommendationRequest {
            finding_description: "The page has no title.",
            finding_kind: FindingKind::Error,
            page_url: "https://site.com/",
            technology: Some("wordpress"),
        }
    }

    async fn provider_answering(template: ResponseTemplate) -> (MockServer, GeminiProvider) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header(GEMINI_API_KEY_HEADER, "test-key"))
            .respond_with(template)
            .mount(&server)
            .await;
        let provider = GeminiProvider::new(Some("test-key".to_string())).with_base_url(server.uri());
        (server, provider)
    }

    #[test]
    fn test_prompt_mentions_context() {
        let prompt = build_prompt(&request());
        assert!(prompt.contains("https://site.com/"));
        assert!(prompt.contains("wordpress"));
        assert!(prompt.contains("error"));
        assert!(prompt.contains("The page has no title."));
    }

    #[tokio::test]
    async fn test_missing_key_is_unavailable() {
        let provider = GeminiProvider::new(Some("  ".to_string()));
        assert!(!provider.has_credentials());
        let text = provider.generate(&request()).await;
        assert_eq!(text, RecommendationFallback::Unavailable.to_string());
    }

    #[tokio::test]
    async fn test_returns_candidate_text() {
        let (_server, provider) = provider_answering(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "Add a " }, { "text": "descriptive title." }] },
                "finishReason": "STOP"
            }]
        })))
        .await;

        assert_eq!(provider.generate(&request()).await, "Add a descriptive title.");
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let (_server, provider) = provider_answering(ResponseTemplate::new(200).set_body_json(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        })))
        .await;

        let text = provider.generate(&request()).await;
        assert_eq!(
            text,
            RecommendationFallback::SafetyBlocked("SAFETY".to_string()).to_string()
        );
    }

    #[tokio::test]
    async fn test_truncated_without_text() {
        let (_server, provider) = provider_answering(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        })))
        .await;

        let text = provider.generate(&request()).await;
        assert!(text.starts_with("AI recommendation incomplete"));
    }

    #[tokio::test]
    async fn test_empty_candidates() {
        let (_server, provider) =
            provider_answering(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] }))).await;

        assert_eq!(
            provider.generate(&request()).await,
            RecommendationFallback::EmptyResponse.to_string()
        );
    }

    #[tokio::test]
    async fn test_http_error_and_malformed_body() {
        let (_server, provider) = provider_answering(ResponseTemplate::new(503)).await;
        assert!(provider.generate(&request()).await.contains("HTTP 503"));

        let (_server, provider) =
            provider_answering(ResponseTemplate::new(200).set_body_string("not json")).await;
        assert!(provider.generate(&request()).await.contains("malformed response"));
    }

    #[tokio::test]
    async fn test_transport_error_does_not_expose_key() {
        let key = "SUPERSECRETKEY123";
        let provider = GeminiProvider::new(Some(key.to_string())).with_base_url("http://127.0.0.1:9");

        let text = provider.generate(&request()).await;
        assert!(text.starts_with("AI recommendation unavailable due to an error"));
        assert!(!text.contains(key));
        assert!(!text.contains("127.0.0.1"));
    }

    #[test]
    fn test_fallback_texts_are_distinct() {
        let texts = [
            RecommendationFallback::Unavailable.to_string(),
            RecommendationFallback::EmptyResponse.to_string(),
            RecommendationFallback::SafetyBlocked("SAFETY".into()).to_string(),
            RecommendationFallback::Truncated("MAX_TOKENS".into()).to_string(),
            RecommendationFallback::Error("boom".into()).to_string(),
        ];
        for (i, a) in texts.iter().enumerate() {
            for b in texts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }
}
