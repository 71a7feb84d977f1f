use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Market-hours cycle and price simulation parameters.
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub snapshots_per_market_day: i32,
    pub after_hours_snapshots: i32,
    /// Scales price volatility while the market is closed.
    pub after_hours_volatility_multiplier: f64,
    /// Snapshots kept per ticker.
    pub snapshot_retention: i64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            snapshots_per_market_day: 60,
            after_hours_snapshots: 10,
            after_hours_volatility_multiplier: 0.3,
            snapshot_retention: 1440,
        }
    }
}

/// Generation providers and task processing parameters.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub atlascloud_api_key: Option<String>,
    pub atlascloud_base_url: String,
    pub atlascloud_text_model: String,
    pub atlascloud_image_model: String,
    pub atlascloud_video_model: String,
    pub atlascloud_image_to_video_model: String,
    pub google_ai_api_key: Option<String>,
    pub google_ai_base_url: String,
    pub google_ai_text_model: String,
    /// Skip the primary provider for text generation.
    pub force_google_ai: bool,
    pub temperature: f32,
    pub max_tokens: u32,
    pub task_timeout: Duration,
    pub static_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            atlascloud_api_key: None,
            atlascloud_base_url: "https://api.atlascloud.ai".to_string(),
            atlascloud_text_model: "deepseek-ai/DeepSeek-V3-0324".to_string(),
            atlascloud_image_model: "black-forest-labs/flux-schnell".to_string(),
            atlascloud_video_model: "alibaba/wan-2.2/t2v-480p".to_string(),
            atlascloud_image_to_video_model: "alibaba/wan-2.2/i2v-480p".to_string(),
            google_ai_api_key: None,
            google_ai_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            google_ai_text_model: "gemini-1.5-flash".to_string(),
            force_google_ai: false,
            temperature: 0.7,
            max_tokens: 500,
            task_timeout: Duration::from_secs(600),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Fixed intervals of the background jobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub price_tick_enabled: bool,
    pub price_tick_interval: Duration,
    pub snapshot_interval: Duration,
    pub ai_task_poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            price_tick_enabled: true,
            price_tick_interval: Duration::from_secs(5),
            snapshot_interval: Duration::from_secs(60),
            ai_task_poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server_port: u16,
    pub market: MarketConfig,
    pub ai: AiConfig,
    pub scheduler: SchedulerConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| AppError::Validation("DATABASE_URL is not set".to_string()))?;

        let market_defaults = MarketConfig::default();
        let market = MarketConfig {
            snapshots_per_market_day: env_or("SNAPSHOTS_PER_MARKET_DAY", market_defaults.snapshots_per_market_day),
            after_hours_snapshots: env_or("AFTER_HOURS_SNAPSHOTS", market_defaults.after_hours_snapshots),
            after_hours_volatility_multiplier: env_or(
                "AFTER_HOURS_VOLATILITY_MULTIPLIER",
                market_defaults.after_hours_volatility_multiplier,
            ),
            snapshot_retention: env_or("SNAPSHOT_RETENTION", market_defaults.snapshot_retention),
        };

        let ai_defaults = AiConfig::default();
        let google_key = std::env::var("GOOGLE_AI_API_KEY")
            .ok()
            .and_then(|k| normalize_api_key(&k))
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok().and_then(|k| normalize_api_key(&k)));
        let ai = AiConfig {
            atlascloud_api_key: std::env::var("ATLASCLOUD_API_KEY").ok().and_then(|k| normalize_api_key(&k)),
            atlascloud_base_url: env_string("ATLASCLOUD_BASE_URL", ai_defaults.atlascloud_base_url),
            atlascloud_text_model: env_string("ATLASCLOUD_TEXT_MODEL", ai_defaults.atlascloud_text_model),
            atlascloud_image_model: env_string("ATLASCLOUD_IMAGE_MODEL", ai_defaults.atlascloud_image_model),
            atlascloud_video_model: env_string("ATLASCLOUD_VIDEO_MODEL", ai_defaults.atlascloud_video_model),
            atlascloud_image_to_video_model: env_string(
                "ATLASCLOUD_IMAGE_TO_VIDEO_MODEL",
                ai_defaults.atlascloud_image_to_video_model,
            ),
            google_ai_api_key: google_key,
            google_ai_base_url: env_string("GOOGLE_AI_BASE_URL", ai_defaults.google_ai_base_url),
            google_ai_text_model: env_string("GOOGLE_AI_TEXT_MODEL", ai_defaults.google_ai_text_model),
            force_google_ai: env_or("FORCE_GOOGLE_AI", ai_defaults.force_google_ai),
            temperature: env_or("AI_TEMPERATURE", ai_defaults.temperature),
            max_tokens: env_or("AI_MAX_TOKENS", ai_defaults.max_tokens),
            task_timeout: Duration::from_secs(env_or("AI_TASK_TIMEOUT_SECS", ai_defaults.task_timeout.as_secs())),
            static_dir: PathBuf::from(env_string("STATIC_DIR", "static".to_string())),
        };

        let scheduler_defaults = SchedulerConfig::default();
        let scheduler = SchedulerConfig {
            price_tick_enabled: env_or("PRICE_TICK_ENABLED", scheduler_defaults.price_tick_enabled),
            price_tick_interval: Duration::from_secs(env_or(
                "PRICE_TICK_INTERVAL_SECS",
                scheduler_defaults.price_tick_interval.as_secs(),
            )),
            snapshot_interval: Duration::from_secs(env_or(
                "SNAPSHOT_INTERVAL_SECS",
                scheduler_defaults.snapshot_interval.as_secs(),
            )),
            ai_task_poll_interval: Duration::from_secs(env_or(
                "AI_TASK_POLL_INTERVAL_SECS",
                scheduler_defaults.ai_task_poll_interval.as_secs(),
            )),
        };

        let settings = Self {
            database_url,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            server_port: env_or("SERVER_PORT", 3000),
            market,
            ai,
            scheduler,
        };

        settings.validate().map_err(AppError::Validation)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        let scheduler = &self.scheduler;
        if scheduler.price_tick_interval.is_zero()
            || scheduler.snapshot_interval.is_zero()
            || scheduler.ai_task_poll_interval.is_zero()
        {
            return Err("job intervals must be at least one second".to_string());
        }
        if self.market.snapshots_per_market_day < 1 {
            return Err("SNAPSHOTS_PER_MARKET_DAY must be at least 1".to_string());
        }
        if self.market.after_hours_snapshots < 0 {
            return Err("AFTER_HOURS_SNAPSHOTS must not be negative".to_string());
        }
        if self.market.snapshot_retention < 1 {
            return Err("SNAPSHOT_RETENTION must be at least 1".to_string());
        }
        let multiplier = self.market.after_hours_volatility_multiplier;
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err("AFTER_HOURS_VOLATILITY_MULTIPLIER must be a non-negative number".to_string());
        }
        if self.ai.task_timeout.is_zero() {
            return Err("AI_TASK_TIMEOUT_SECS must be at least 1".to_string());
        }
        Ok(())
    }

    /// Wall-clock length of one market day.
    pub fn market_day_duration(&self) -> Duration {
        self.scheduler.snapshot_interval * self.market.snapshots_per_market_day as u32
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

/// Strips whitespace and quotes; placeholder values count as unset.
fn normalize_api_key(raw: &str) -> Option<String> {
    let key = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if key.is_empty() || ["none", "null", "undefined"].contains(&key.to_lowercase().as_str()) {
        None
    } else {
        Some(key.to_string())
    }
}
