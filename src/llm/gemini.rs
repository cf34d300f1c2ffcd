//! Gemini provider for conversation simulation and judge calls.
//!
//! Uses the generateContent API. Chat calls carry the compiled prompt as
//! systemInstruction; judge calls additionally request a JSON-typed response,
//! though callers must still defensively strip code fences from the output.

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChatRole, ChatTurn, GenerativeModel, LlmError};
use crate::config::CONFIG;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiClient {
    client: HttpClient,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: HttpClient::new(),
            api_key,
            model,
            timeout: Duration::from_millis(CONFIG.model_timeout_ms()),
        }
    }

    /// Create from environment variable
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY not set"))?;
        Ok(Self::new(api_key, CONFIG.gemini_model.clone()))
    }

    /// Build Gemini contents from stored history plus the new user message
    fn build_contents(history: &[ChatTurn], message: &str) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|turn| GeminiContent {
                role: match turn.role {
                    ChatRole::User => "user".to_string(),
                    ChatRole::Assistant => "model".to_string(),
                },
                parts: vec![GeminiPart { text: turn.content.clone() }],
            })
            .collect();

        contents.push(GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart { text: message.to_string() }],
        });

        contents
    }

    async fn make_request(&self, request: GeminiRequest) -> Result<String, LlmError> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, body));
        }

        let api_response: GeminiResponse = response.json().await?;

        if let Some(error) = api_response.error {
            return Err(classify_api_error(error.code.unwrap_or(500), error.message));
        }

        let text = api_response
            .candidates
            .into_iter()
            .flatten()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(text)
    }
}

/// Quota/rate-limit signals (HTTP 429 or Gemini's RESOURCE_EXHAUSTED status)
/// map to a distinct retryable error.
fn classify_api_error(status: u16, body: String) -> LlmError {
    if status == 429 || body.contains("RESOURCE_EXHAUSTED") || body.contains("quota") {
        LlmError::QuotaExhausted(body)
    } else {
        LlmError::Api { status, body }
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn chat(
        &self,
        system: &str,
        history: &[ChatTurn],
        message: &str,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: Self::build_contents(history, message),
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiPart { text: system.to_string() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(temperature),
                response_mime_type: None,
            }),
        };

        self.make_request(request).await
    }

    async fn generate_json(&self, system: &str, content: &str) -> Result<String, LlmError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: content.to_string() }],
            }],
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiPart { text: system.to_string() }],
            }),
            generation_config: Some(GeminiGenerationConfig {
                temperature: Some(0.0),
                response_mime_type: Some("application/json".to_string()),
            }),
        };

        self.make_request(request).await
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Clone)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Clone)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContentResponse,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}
