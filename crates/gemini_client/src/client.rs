//! Gemini API client.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{GenerationError, Result};
use crate::protocol::{
    default_safety_settings, Content, GenerateContentRequest, GenerateContentResponse,
    GenerationConfig, Part,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The opaque generation capability: one prompt in, one text out.
///
/// Implemented by [`GeminiClient`] for the real API and by mocks in
/// tests of the layers above.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String>;
}

/// Non-streaming Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new client with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom base URL (e.g., for proxies or alternative endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str, temperature: f32) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig::with_temperature(temperature),
            safety_settings: default_safety_settings(),
        };

        // Query param authentication, same scheme as the streaming endpoint
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        log::debug!("Gemini request to model '{}', temperature {}", model, temperature);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(GenerationError::Http)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.map_err(GenerationError::Http)?;

            if status == 401 || status == 403 {
                return Err(GenerationError::Auth(format!(
                    "Gemini authentication failed: {}. Please check your API key.",
                    text
                )));
            }

            return Err(GenerationError::Api(format!(
                "Gemini API error: HTTP {}: {}",
                status, text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(GenerationError::Http)?;

        body.text().ok_or_else(|| {
            let reason = body
                .candidates
                .first()
                .and_then(|candidate| candidate.finish_reason.as_deref())
                .unwrap_or("no candidates");
            GenerationError::Api(format!("Gemini returned no text ({})", reason))
        })
    }
}
