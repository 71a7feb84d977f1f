use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub loki_enabled: bool,
    pub loki_url: Option<String>,
    pub service_name: String,
    pub environment: String,
    pub log_level: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            loki_enabled: std::env::var("LOKI_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            loki_url: std::env::var("LOKI_URL").ok().filter(|u| !u.is_empty()),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "exchange-game".to_string()),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            log_level: std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.loki_enabled && self.loki_url.is_none() {
            return Err("LOKI_ENABLED is true but LOKI_URL is not set".to_string());
        }
        Ok(())
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Installs the global subscriber. Must run inside the tokio runtime when Loki
/// shipping is enabled, since the exporter runs as a background task.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    #[cfg(feature = "loki")]
    {
        if config.loki_enabled {
            if let Some(loki_url) = config.loki_url.clone() {
                return init_with_loki(config, &loki_url);
            }
        }
    }

    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("📊 Console logging initialized (level: {})", config.log_level);
    Ok(())
}

#[cfg(feature = "loki")]
fn init_with_loki(config: LoggingConfig, loki_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = url::Url::parse(loki_url)?;

    let (loki_layer, task) = tracing_loki::builder()
        .label("service", &config.service_name)?
        .label("environment", &config.environment)?
        .build_url(url)?;

    tokio::spawn(task);

    tracing_subscriber::registry()
        .with(config.filter())
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .init();

    tracing::info!("📊 Logging initialized with Loki at {}", loki_url);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loki_requires_url() {
        let config = LoggingConfig {
            loki_enabled: true,
            loki_url: None,
            service_name: "exchange-game".to_string(),
            environment: "test".to_string(),
            log_level: "debug".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_console_only_is_valid() {
        let config = LoggingConfig {
            loki_enabled: false,
            loki_url: None,
            service_name: "exchange-game".to_string(),
            environment: "test".to_string(),
            log_level: "info".to_string(),
        };
        assert!(config.validate().is_ok());
    }
}
