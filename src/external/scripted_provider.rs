//! Canned [`GenerationProvider`] for exercising the AI client and pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::errors::ProviderError;
use crate::external::generation_provider::{
    GenerationProvider, GenerationRequest, ProviderTaskStatus, TaskPoll,
};

pub struct ScriptedProvider {
    name: &'static str,
    configured: bool,
    text: Result<String, String>,
    submit: Result<String, String>,
    poll: Mutex<TaskPoll>,
    download: Result<Vec<u8>, String>,
    pub text_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub poll_calls: AtomicUsize,
    pub submitted: Mutex<Vec<GenerationRequest>>,
    pub text_max_tokens: Mutex<Vec<u32>>,
}

impl ScriptedProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            configured: true,
            text: Ok(format!("text from {}", name)),
            submit: Ok("ext-1".to_string()),
            poll: Mutex::new(TaskPoll {
                status: ProviderTaskStatus::Processing,
                outputs: vec![],
                error: None,
            }),
            download: Ok(b"generated".to_vec()),
            text_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            submitted: Mutex::new(vec![]),
            text_max_tokens: Mutex::new(vec![]),
        }
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn with_text(mut self, text: Result<&str, &str>) -> Self {
        self.text = text.map(str::to_string).map_err(str::to_string);
        self
    }

    pub fn with_submit(mut self, submit: Result<&str, &str>) -> Self {
        self.submit = submit.map(str::to_string).map_err(str::to_string);
        self
    }

    pub fn with_poll(self, status: ProviderTaskStatus, outputs: &[&str], error: Option<&str>) -> Self {
        *self.poll.lock() = TaskPoll {
            status,
            outputs: outputs.iter().map(|o| o.to_string()).collect(),
            error: error.map(str::to_string),
        };
        self
    }

    pub fn with_download(mut self, download: Result<&[u8], &str>) -> Self {
        self.download = download.map(<[u8]>::to_vec).map_err(str::to_string);
        self
    }

    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate_text(
        &self,
        _prompt: &str,
        max_tokens: u32,
        _model: Option<&str>,
    ) -> Result<String, ProviderError> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.text_max_tokens.lock().push(max_tokens);
        self.text.clone().map_err(ProviderError::Api)
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push(request.clone());
        self.submit.clone().map_err(ProviderError::Api)
    }

    async fn poll(&self, _external_id: &str) -> Result<TaskPoll, ProviderError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.poll.lock().clone())
    }

    async fn download(&self, _url: &str) -> Result<Vec<u8>, ProviderError> {
        self.download.clone().map_err(ProviderError::Network)
    }
}
