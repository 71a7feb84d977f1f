use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Db(sqlx::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("External error: {0}")]
    External(String),
    #[error("State invariant violated: {0}")]
    StateInvariant(String),
}

impl From<sqlx::Error> for AppError {
    fn from(value: sqlx::Error) -> Self {
        AppError::Db(value)
    }
}

/// Failure of a single call against one generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),

    #[error("API key is not configured")]
    NotConfigured,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Network(format!("request timeout: {}", e))
        } else if e.is_decode() {
            ProviderError::InvalidResponse(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

/// One entry of an aggregated fallback failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    pub provider: &'static str,
    pub message: String,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Errors surfaced by the AI client and recorded onto failed tasks.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("{provider} failed: {source}")]
    Provider {
        provider: &'static str,
        #[source]
        source: ProviderError,
    },

    #[error("All AI providers failed: {}", join_failures(.0))]
    AllProvidersFailed(Vec<ProviderFailure>),

    #[error("{0}")]
    NotConfigured(String),

    #[error("Invalid task arguments: {0}")]
    InvalidArguments(String),

    #[error("I/O error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("Task timed out")]
    Timeout,

    #[error("No external task ID")]
    MissingExternalId,
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ProviderFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregated_error_lists_every_provider() {
        let err = AiError::AllProvidersFailed(vec![
            ProviderFailure { provider: "AtlasCloud", message: "API error: HTTP 500".to_string() },
            ProviderFailure { provider: "Google AI", message: "rate limited".to_string() },
        ]);
        assert_eq!(
            err.to_string(),
            "All AI providers failed: AtlasCloud: API error: HTTP 500; Google AI: rate limited"
        );
    }

    #[test]
    fn test_task_failure_messages() {
        assert_eq!(AiError::Timeout.to_string(), "Task timed out");
        assert_eq!(AiError::MissingExternalId.to_string(), "No external task ID");

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        assert_eq!(AiError::from(io).to_string(), "I/O error: read-only");
    }

    #[test]
    fn test_provider_error_names_provider() {
        let err = AiError::Provider { provider: "AtlasCloud", source: ProviderError::RateLimited };
        assert_eq!(err.to_string(), "AtlasCloud failed: rate limited");
    }
}
