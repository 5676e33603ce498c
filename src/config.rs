//! # Configuration Module
//!
//! This module defines configuration structures for the bot: credentials and
//! endpoints read from the environment, recovery settings for the remote
//! analysis service, and image preprocessing parameters.

use anyhow::{anyhow, Context, Result};
use image::imageops::FilterType;
use std::time::Duration;

// Constants for image preprocessing
pub const TARGET_WIDTH: u32 = 512;
pub const TARGET_HEIGHT: u32 = 512;
pub const JPEG_QUALITY: u8 = 90;
pub const MAX_INPUT_BYTES: u64 = 20 * 1024 * 1024; // Telegram bots can download up to 20MB
pub const MAX_INPUT_PIXELS: u64 = 50_000_000;

// Constants for the analysis service
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 90;

/// Recovery configuration for remote service calls
#[derive(Debug, Clone)]
pub struct RecoveryConfig {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,
    /// Base delay between retries in milliseconds
    pub base_retry_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_retry_delay_ms: u64,
    /// Timeout for a single attempt in seconds
    pub operation_timeout_secs: u64,
    /// Circuit breaker failure threshold
    pub circuit_breaker_threshold: u32,
    /// Circuit breaker reset timeout in seconds
    pub circuit_breaker_reset_secs: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_retry_delay_ms: 500,
            max_retry_delay_ms: 5000,
            operation_timeout_secs: 30,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60, // 1 minute
        }
    }
}

/// Parameters for turning an inbound photo into an analysis-ready image
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    pub target_width: u32,
    pub target_height: u32,
    /// Resampling filter; must be a smoothing filter
    pub filter: FilterType,
    pub jpeg_quality: u8,
    /// Inputs above this size are rejected before decoding
    pub max_input_bytes: u64,
    /// Images with more pixels than this are rejected from their header alone
    pub max_pixels: u64,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            target_width: TARGET_WIDTH,
            target_height: TARGET_HEIGHT,
            filter: FilterType::Lanczos3,
            jpeg_quality: JPEG_QUALITY,
            max_input_bytes: MAX_INPUT_BYTES,
            max_pixels: MAX_INPUT_PIXELS,
        }
    }
}

/// Settings for the remote vision/chat-completion service
#[derive(Clone)]
pub struct AnalysisConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_tokens: u32,
    pub recovery: RecoveryConfig,
}

impl AnalysisConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            recovery: RecoveryConfig::default(),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("recovery", &self.recovery)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Top-level application configuration, built once at startup
#[derive(Clone)]
pub struct AppConfig {
    pub telegram_token: String,
    /// Postgres connection string; history is kept in memory when absent
    pub database_url: Option<String>,
    pub analysis: AnalysisConfig,
    pub preprocess: PreprocessConfig,
    /// Upper bound for preprocessing and analysis of one photo
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = get("TELEGRAM_BOT_TOKEN")
            .or_else(|| get("TELEGRAM_TOKEN"))
            .ok_or_else(|| anyhow!("TELEGRAM_BOT_TOKEN must be set"))?;
        let api_key = get("OPENAI_API_KEY").ok_or_else(|| anyhow!("OPENAI_API_KEY must be set"))?;

        let mut analysis = AnalysisConfig::new(api_key);
        if let Some(base) = get("OPENAI_API_BASE") {
            analysis.api_base = base;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            analysis.model = model;
        }
        if let Some(secs) = get("ANALYSIS_TIMEOUT_SECS") {
            analysis.recovery.operation_timeout_secs = parse_number(&secs, "ANALYSIS_TIMEOUT_SECS")?;
        }
        if let Some(retries) = get("ANALYSIS_MAX_RETRIES") {
            analysis.recovery.max_retries = parse_number(&retries, "ANALYSIS_MAX_RETRIES")?;
        }

        let request_timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(secs) => parse_number(&secs, "REQUEST_TIMEOUT_SECS")?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let log_format = match get("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(anyhow!("LOG_FORMAT must be 'text' or 'json', got '{other}'")),
        };

        Ok(Self {
            telegram_token,
            database_url: get("DATABASE_URL"),
            analysis,
            preprocess: PreprocessConfig::default(),
            request_timeout: Duration::from_secs(request_timeout_secs),
            log_format,
        })
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_token", &"<redacted>")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("analysis", &self.analysis)
            .field("preprocess", &self.preprocess)
            .field("request_timeout", &self.request_timeout)
            .field("log_format", &self.log_format)
            .finish()
    }
}

fn parse_number<T>(value: &str, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a non-negative integer, got '{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_required_keys() {
        let config =
            AppConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "tg"), ("OPENAI_API_KEY", "sk")]))
                .unwrap();

        assert_eq!(config.telegram_token, "tg");
        assert_eq!(config.analysis.api_key, "sk");
        assert_eq!(config.analysis.model, DEFAULT_MODEL);
        assert_eq!(config.database_url, None);
        assert_eq!(config.request_timeout, Duration::from_secs(90));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.preprocess.target_width, 512);
    }

    #[test]
    fn test_legacy_token_name_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_TOKEN", "legacy"),
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_API_BASE", "http://localhost:8080/v1/"),
            ("ANALYSIS_MAX_RETRIES", "0"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.telegram_token, "legacy");
        assert_eq!(config.analysis.recovery.max_retries, 0);
        assert_eq!(config.analysis.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let err = AppConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk")])).unwrap_err();
        assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN"));

        let err = AppConfig::from_lookup(lookup(&[("TELEGRAM_BOT_TOKEN", "tg")])).unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));

        let err = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "tg"),
            ("OPENAI_API_KEY", "sk"),
            ("REQUEST_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("REQUEST_TIMEOUT_SECS"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TELEGRAM_BOT_TOKEN", "123:secret-token"),
            ("OPENAI_API_KEY", "sk-very-secret"),
            ("DATABASE_URL", "postgres://user:pw@db/app"),
        ]))
        .unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("pw@db"));
    }
}
