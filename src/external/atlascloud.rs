use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::AiConfig;
use crate::errors::ProviderError;
use crate::external::generation_provider::{
    GenerationProvider, GenerationRequest, ProviderTaskStatus, TaskPoll,
};

const NAME: &str = "AtlasCloud";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: String,
    enable_base64_output: bool,
}

#[derive(Debug, Serialize)]
struct VideoRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: String,
    duration: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PredictionData {
    status: Option<String>,
    #[serde(default)]
    outputs: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

/// Primary provider: text through the OpenAI-compatible chat endpoint, images
/// and videos through asynchronous predictions.
pub struct AtlasCloudProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    text_model: String,
    image_model: String,
    video_model: String,
    image_to_video_model: String,
    temperature: f32,
}

impl AtlasCloudProvider {
    pub fn new(config: &AiConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;

        Ok(Self {
            client,
            api_key: config.atlascloud_api_key.clone(),
            base_url: config.atlascloud_base_url.trim_end_matches('/').to_string(),
            text_model: config.atlascloud_text_model.clone(),
            image_model: config.atlascloud_image_model.clone(),
            video_model: config.atlascloud_video_model.clone(),
            image_to_video_model: config.atlascloud_image_to_video_model.clone(),
            temperature: config.temperature,
        })
    }

    fn api_key(&self) -> Result<&str, ProviderError> {
        self.api_key.as_deref().ok_or(ProviderError::NotConfigured)
    }

    async fn check(response: Response) -> Result<Response, ProviderError> {
        let status = response.status();

        if status == 429 {
            return Err(ProviderError::RateLimited);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("AtlasCloud API error: HTTP {}: {}", status, error_text);
            return Err(ProviderError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response)
    }

    async fn post_prediction<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/api/v1/model/{}", self.base_url, path))
            .bearer_auth(self.api_key()?)
            .json(body)
            .send()
            .await?;

        let envelope = Self::check(response).await?.json::<Envelope<SubmitData>>().await?;
        match envelope.data {
            Some(data) if !data.id.is_empty() => Ok(data.id),
            _ => Err(ProviderError::InvalidResponse(
                envelope.message.unwrap_or_else(|| "missing prediction id".to_string()),
            )),
        }
    }
}

/// Maps AtlasCloud prediction states onto the provider-neutral status.
pub fn parse_status(raw: &str) -> ProviderTaskStatus {
    match raw.to_ascii_lowercase().as_str() {
        "created" | "starting" | "pending" | "queued" => ProviderTaskStatus::Pending,
        "processing" | "running" => ProviderTaskStatus::Processing,
        "completed" | "succeeded" => ProviderTaskStatus::Completed,
        "failed" | "error" => ProviderTaskStatus::Failed,
        _ => ProviderTaskStatus::Other(raw.to_string()),
    }
}

#[async_trait]
impl GenerationProvider for AtlasCloudProvider {
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
        let model = model.unwrap_or(&self.text_model);
        debug!("AtlasCloud text request (model: {}, max_tokens: {})", model, max_tokens);

        let request = ChatRequest {
            model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key()?)
            .json(&request)
            .send()
            .await?;

        let body = Self::check(response).await?.json::<ChatResponse>().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("no choices in response".to_string()))
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let id = match request {
            GenerationRequest::Image { prompt, width, height, model } => {
                let body = ImageRequest {
                    model: model.as_deref().unwrap_or(&self.image_model),
                    prompt,
                    size: format!("{}*{}", width, height),
                    enable_base64_output: false,
                };
                self.post_prediction("generateImage", &body).await?
            }
            GenerationRequest::TextToVideo { prompt, width, height, duration, model } => {
                let body = VideoRequest {
                    model: model.as_deref().unwrap_or(&self.video_model),
                    prompt,
                    size: format!("{}*{}", width, height),
                    duration: *duration,
                    image: None,
                };
                self.post_prediction("generateVideo", &body).await?
            }
            GenerationRequest::ImageToVideo { prompt, image_url, duration, size, model } => {
                let body = VideoRequest {
                    model: model.as_deref().unwrap_or(&self.image_to_video_model),
                    prompt,
                    size: size.clone(),
                    duration: *duration,
                    image: Some(image_url.as_str()),
                };
                self.post_prediction("generateVideo", &body).await?
            }
        };

        info!("{} started on AtlasCloud: {}", request.kind(), id);
        Ok(id)
    }

    async fn poll(&self, external_id: &str) -> Result<TaskPoll, ProviderError> {
        let response = self
            .client
            .get(format!("{}/api/v1/model/prediction/{}", self.base_url, external_id))
            .bearer_auth(self.api_key()?)
            .send()
            .await?;

        let envelope = Self::check(response).await?.json::<Envelope<PredictionData>>().await?;
        let data = envelope.data.ok_or_else(|| {
            ProviderError::InvalidResponse(
                envelope.message.unwrap_or_else(|| "missing prediction data".to_string()),
            )
        })?;

        Ok(TaskPoll {
            status: parse_status(data.status.as_deref().unwrap_or("")),
            outputs: data.outputs.unwrap_or_default(),
            error: data.error.filter(|e| !e.is_empty()),
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let response = self.client.get(url).bearer_auth(self.api_key()?).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
