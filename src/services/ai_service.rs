use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{AiError, ProviderFailure};
use crate::external::{GenerationProvider, GenerationRequest, TaskPoll};

/// Ordered set of generation providers with text fallback.
///
/// The first provider is the primary one and is the only provider used for
/// media generation, polling and downloads. Text generation walks the list in
/// order, skipping unconfigured providers (and the primary when
/// `skip_primary_for_text` is set), and returns the first success.
pub struct AiClient {
    providers: Vec<Arc<dyn GenerationProvider>>,
    skip_primary_for_text: bool,
}

impl AiClient {
    pub fn new(providers: Vec<Arc<dyn GenerationProvider>>, skip_primary_for_text: bool) -> Self {
        Self { providers, skip_primary_for_text }
    }

    fn text_candidates(&self) -> impl Iterator<Item = &Arc<dyn GenerationProvider>> {
        let skip = usize::from(self.skip_primary_for_text);
        self.providers.iter().skip(skip).filter(|p| p.is_configured())
    }

    fn primary(&self, capability: &str) -> Result<&Arc<dyn GenerationProvider>, AiError> {
        match self.providers.first() {
            Some(provider) if provider.is_configured() => Ok(provider),
            Some(provider) => Err(AiError::NotConfigured(format!(
                "{} requires {} API key",
                capability,
                provider.name()
            ))),
            None => Err(AiError::NotConfigured(format!("{} has no provider", capability))),
        }
    }

    pub async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        model: Option<&str>,
    ) -> Result<String, AiError> {
        let mut failures = Vec::new();

        for provider in self.text_candidates() {
            match provider.generate_text(prompt, max_tokens, model).await {
                Ok(text) => {
                    debug!("Text generated via {}", provider.name());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("{} failed, trying fallback: {}", provider.name(), e);
                    failures.push(ProviderFailure {
                        provider: provider.name(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            return Err(AiError::NotConfigured(
                "No AI providers configured (check API keys in .env)".to_string(),
            ));
        }
        Err(AiError::AllProvidersFailed(failures))
    }

    async fn submit(&self, request: GenerationRequest) -> Result<String, AiError> {
        let provider = self.primary(request.kind())?;
        provider
            .submit(&request)
            .await
            .map_err(|source| AiError::Provider { provider: provider.name(), source })
    }

    pub async fn generate_image(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        model: Option<&str>,
    ) -> Result<String, AiError> {
        self.submit(GenerationRequest::Image {
            prompt: prompt.to_string(),
            width,
            height,
            model: model.map(str::to_string),
        })
        .await
    }

    pub async fn generate_video_from_text(
        &self,
        prompt: &str,
        width: u32,
        height: u32,
        duration: u32,
        model: Option<&str>,
    ) -> Result<String, AiError> {
        self.submit(GenerationRequest::TextToVideo {
            prompt: prompt.to_string(),
            width,
            height,
            duration,
            model: model.map(str::to_string),
        })
        .await
    }

    pub async fn generate_video_from_image(
        &self,
        prompt: &str,
        image_url: &str,
        duration: u32,
        size: &str,
        model: Option<&str>,
    ) -> Result<String, AiError> {
        self.submit(GenerationRequest::ImageToVideo {
            prompt: prompt.to_string(),
            image_url: image_url.to_string(),
            duration,
            size: size.to_string(),
            model: model.map(str::to_string),
        })
        .await
    }

    pub async fn get_task_status(&self, external_id: &str) -> Result<TaskPoll, AiError> {
        let provider = self.primary("Task polling")?;
        provider
            .poll(external_id)
            .await
            .map_err(|source| AiError::Provider { provider: provider.name(), source })
    }

    pub async fn download_file(&self, url: &str) -> Result<Vec<u8>, AiError> {
        let provider = self.primary("File download")?;
        provider
            .download(url)
            .await
            .map_err(|source| AiError::Provider { provider: provider.name(), source })
    }

    /// True when at least one provider has credentials.
    pub fn is_configured(&self) -> bool {
        self.providers.iter().any(|p| p.is_configured())
    }

    /// Name of the provider that would serve the next text request.
    pub fn text_provider(&self) -> Option<&'static str> {
        self.text_candidates().next().map(|p| p.name())
    }
}
