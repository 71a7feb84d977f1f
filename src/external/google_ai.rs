use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AiConfig;
use crate::errors::ProviderError;
use crate::external::generation_provider::GenerationProvider;

const NAME: &str = "Google AI";

/// Model families served by the primary provider only.
const FOREIGN_MODEL_MARKERS: [&str; 2] = ["deepseek", "flux"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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
    #[serde(default)]
    text: Option<String>,
}

/// Secondary, text-only provider.
pub struct GoogleAiProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    temperature: f32,
}

impl GoogleAiProvider {
    pub fn new(config: &AiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_key: config.google_ai_api_key.clone(),
            base_url: config.google_ai_base_url.trim_end_matches('/').to_string(),
            text_model: config.google_ai_text_model.clone(),
            temperature: config.temperature,
        })
    }

    /// Picks the Gemini model to call, ignoring model names that belong to
    /// the primary provider.
    fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .filter(|m| {
                let lower = m.to_ascii_lowercase();
                !FOREIGN_MODEL_MARKERS.iter().any(|marker| lower.contains(marker))
            })
            .unwrap_or(self.text_model.trim())
    }
}

#[async_trait]
impl GenerationProvider for GoogleAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        model: Option<&str>,
    ) -> Result<String, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or(ProviderError::NotConfigured)?;
        let model = self.resolve_model(model);
        debug!("Google AI text request (model: {}, prompt length: {})", model, prompt.len());

        let request = GenerateContentRequest {
            contents: vec![Content { parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig {
                max_output_tokens: max_tokens,
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.base_url, model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Google AI API error: HTTP {}: {}", status, error_text);
            return Err(ProviderError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let body = response.json::<GenerateContentResponse>().await?;
        Ok(body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default())
    }
}
