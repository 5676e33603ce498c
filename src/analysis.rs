//! # Analysis Client Module
//!
//! Sends a normalized food photo together with instructions to a vision-capable
//! chat-completion endpoint and returns the model's nutrition report.
//!
//! ## Recovery
//!
//! - Every attempt is bounded by `RecoveryConfig::operation_timeout_secs`
//! - Transient failures (5xx, timeouts, connection errors) are retried up to
//!   `max_retries` times with exponential backoff and random jitter
//! - Client errors and malformed responses are never retried
//! - A [`CircuitBreaker`] fails calls fast after repeated transient failures or
//!   service-wide refusals (401, 403, 429); rejections of a single request do
//!   not count

use anyhow::Context;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::config::{AnalysisConfig, RecoveryConfig};
use crate::errors::AnalysisError;
use crate::preprocessing::NormalizedImage;
use crate::report::AnalysisReport;

/// Fixed instruction sent with every photo
pub const ANALYSIS_INSTRUCTIONS: &str = "Analyze this food image and provide its name along with macros \
(calories, protein, carbs, fats) for the visible portion. Answer using exactly these lines:\n\
Food: <name>\nCalories: <number> kcal\nProtein: <number> g\nCarbs: <number> g\nFats: <number> g\n\
If the image does not show food, say so in one short sentence.";

/// Instructions for a given Telegram language code
pub fn analysis_instructions(language_code: Option<&str>) -> String {
    match language_code {
        Some(code) if code.starts_with("fr") => format!(
            "{ANALYSIS_INSTRUCTIONS}\nKeep the labels in English but write the food name and any remark in French."
        ),
        _ => ANALYSIS_INSTRUCTIONS.to_string(),
    }
}

/// Something that can turn a normalized photo into a nutrition report
#[async_trait]
pub trait NutritionAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        image: &NormalizedImage,
        instructions: &str,
    ) -> Result<AnalysisReport, AnalysisError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

/// Outcome of a single HTTP attempt
enum AttemptError {
    Transient(String),
    /// Refusal that affects every request (credentials, quota); not retried
    ServiceWide(AnalysisError),
    /// Problem with this request only; not retried
    Permanent(AnalysisError),
}

/// HTTP client for the remote analysis service
pub struct AnalysisClient {
    http: reqwest::Client,
    config: AnalysisConfig,
    breaker: CircuitBreaker,
}

impl AnalysisClient {
    pub fn new(config: AnalysisConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.recovery.operation_timeout_secs))
            .build()
            .context("Failed to build HTTP client for the analysis service")?;
        let breaker = CircuitBreaker::new(&config.recovery);

        Ok(Self {
            http,
            config,
            breaker,
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn build_request(&self, image: &NormalizedImage, instructions: &str) -> ChatCompletionRequest {
        let data_url = format!(
            "data:{};base64,{}",
            image.mime_type(),
            general_purpose::STANDARD.encode(image.as_bytes())
        );

        ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text {
                        text: instructions.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: data_url,
                            detail: "low",
                        },
                    },
                ],
            }],
            max_tokens: self.config.max_tokens,
        }
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<AnalysisReport, AttemptError> {
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport_error)?;

        if status.is_server_error() {
            return Err(AttemptError::Transient(format!("service returned {status}")));
        }
        if !status.is_success() {
            let error = AnalysisError::Unavailable(format!(
                "service rejected the request with {status}: {}",
                truncate(&body, 200)
            ));
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                    AttemptError::ServiceWide(error)
                }
                _ => AttemptError::Permanent(error),
            });
        }

        extract_report(&body)
            .map(AnalysisReport::new)
            .map_err(AttemptError::Permanent)
    }
}

#[async_trait]
impl NutritionAnalyzer for AnalysisClient {
    async fn analyze(
        &self,
        image: &NormalizedImage,
        instructions: &str,
    ) -> Result<AnalysisReport, AnalysisError> {
        if self.breaker.is_open() {
            warn!(
                failures = self.breaker.failure_count(),
                "Circuit breaker open, skipping analysis call"
            );
            return Err(AnalysisError::Unavailable("circuit breaker is open".to_string()));
        }

        let request = self.build_request(image, instructions);
        let max_attempts = self.config.recovery.max_retries + 1;
        let mut attempt = 1;

        loop {
            debug!(attempt, model = %self.config.model, "Sending analysis request");
            match self.send_once(&request).await {
                Ok(report) => {
                    self.breaker.record_success();
                    info!(attempt, chars = report.text().len(), "Analysis completed");
                    return Ok(report);
                }
                Err(AttemptError::Transient(reason)) if attempt < max_attempts => {
                    let delay_ms = calculate_retry_delay(attempt, &self.config.recovery);
                    warn!(attempt, delay_ms, reason = %reason, "Transient analysis failure, retrying");
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(AttemptError::Transient(reason)) => {
                    self.breaker.record_failure();
                    return Err(AnalysisError::Unavailable(format!(
                        "{reason} (after {attempt} attempts)"
                    )));
                }
                Err(AttemptError::ServiceWide(err)) => {
                    self.breaker.record_failure();
                    return Err(err);
                }
                // A bad photo or an unusable answer says nothing about the service
                Err(AttemptError::Permanent(err)) => {
                    debug!(attempt, error = %err, "Analysis request rejected");
                    return Err(err);
                }
            }
        }
    }
}

fn classify_transport_error(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Transient("request timed out".to_string())
    } else if err.is_connect() || err.is_body() {
        AttemptError::Transient(format!("transport failure: {err}"))
    } else {
        AttemptError::Permanent(AnalysisError::Unavailable(format!("request failed: {err}")))
    }
}

/// Pull the report text out of a response body
///
/// Only a non-empty `content` string is required, looked up at
/// `choices[0].message.content` first and then at `message.content` and
/// `content` on the top level.
pub fn extract_report(body: &str) -> Result<String, AnalysisError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(format!("response is not JSON: {e}")))?;

    ["/choices/0/message/content", "/message/content", "/content"]
        .iter()
        .find_map(|pointer| value.pointer(pointer).and_then(Value::as_str))
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            AnalysisError::MalformedResponse("response has no message content".to_string())
        })
}

/// Backoff before retry number `attempt` (1-based), in milliseconds
///
/// Exponential from `base_retry_delay_ms`, capped at `max_retry_delay_ms`,
/// plus up to 25% random jitter.
pub fn calculate_retry_delay(attempt: u32, config: &RecoveryConfig) -> u64 {
    let exponent = attempt.saturating_sub(1).min(16);
    let delay = config
        .base_retry_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(config.max_retry_delay_ms);
    let jitter = rand::thread_rng().gen_range(0..=delay / 4);
    delay + jitter
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
