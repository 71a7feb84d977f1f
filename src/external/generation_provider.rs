use async_trait::async_trait;

use crate::errors::ProviderError;

/// Media generation request submitted for asynchronous processing.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationRequest {
    Image {
        prompt: String,
        width: u32,
        height: u32,
        model: Option<String>,
    },
    TextToVideo {
        prompt: String,
        width: u32,
        height: u32,
        duration: u32,
        model: Option<String>,
    },
    ImageToVideo {
        prompt: String,
        image_url: String,
        duration: u32,
        /// `W*H`
        size: String,
        model: Option<String>,
    },
}

impl GenerationRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationRequest::Image { .. } => "Image generation",
            GenerationRequest::TextToVideo { .. } | GenerationRequest::ImageToVideo { .. } => {
                "Video generation"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderTaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Unrecognised status string, reported as-is.
    Other(String),
}

/// Result of polling an external task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPoll {
    pub status: ProviderTaskStatus,
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Display name used in logs and aggregated errors.
    fn name(&self) -> &'static str;

    fn is_configured(&self) -> bool;

    async fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        model: Option<&str>,
    ) -> Result<String, ProviderError>;

    /// Starts an asynchronous generation and returns the provider's task id.
    async fn submit(&self, _request: &GenerationRequest) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported("media generation"))
    }

    async fn poll(&self, _external_id: &str) -> Result<TaskPoll, ProviderError> {
        Err(ProviderError::Unsupported("task polling"))
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        Err(ProviderError::Unsupported("file download"))
    }
}
