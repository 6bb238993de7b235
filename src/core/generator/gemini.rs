//! Gemini `generateContent` text generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::prompt::{build_context, build_prompt};
use super::{GenerationError, GenerationResult, TextGenerator};

/// Default Gemini REST endpoint.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Request timeout applied by the HTTP client.
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

// =============================================================================
// Generator
// =============================================================================

/// Gemini client settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: GEMINI_BASE_URL.to_string(),
            model: GEMINI_MODEL.to_string(),
        }
    }
}

/// Text generator backed by the Gemini REST API.
pub struct GeminiGenerator {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> GenerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GenerationError::Transport(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiGenerator {
    async fn generate(
        &self,
        prompt: &str,
        locale: &str,
        context_files: &[String],
    ) -> GenerationResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(GenerationError::MissingCredentials)?;

        let context = build_context(context_files).await;
        let full_prompt = build_prompt(prompt, locale, &context);
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: &full_prompt }],
            }],
        };

        debug!(model = %self.config.model, locale, files = context_files.len(), "Calling text generator");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: body.chars().take(400).collect(),
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Transport(format!("Invalid response body: {e}")))?;

        let text = parsed.text().trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn generator(server: &MockServer, api_key: Option<&str>) -> GeminiGenerator {
        GeminiGenerator::new(GeminiConfig {
            api_key: api_key.map(str::to_string),
            base_url: server.uri(),
            model: GEMINI_MODEL.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": " Hello "}, {"text": "world "}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = generator(&server, Some("test-key"))
            .generate("say hi", "en-US", &[])
            .await
            .unwrap();
        assert_eq!(text, "Hello world");
    }

    #[tokio::test]
    async fn test_missing_key() {
        let server = MockServer::start().await;
        let err = generator(&server, None)
            .generate("say hi", "en-US", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_empty_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
            .mount(&server)
            .await;

        let err = generator(&server, Some("k"))
            .generate("say hi", "en-US", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::EmptyOutput));
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = generator(&server, Some("k"))
            .generate("say hi", "en-US", &[])
            .await
            .unwrap_err();
        match err {
            GenerationError::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("Expected Status error, got {other:?}"),
        }
    }
}
