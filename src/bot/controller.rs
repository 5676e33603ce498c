//! Bot Controller module: decides the reply for every inbound event
//!
//! The controller knows nothing about Telegram. The message handler turns
//! updates into [`Command`]s and [`InboundPhoto`]s and sends back whatever
//! text the controller returns.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::analysis::{analysis_instructions, NutritionAnalyzer};
use crate::config::PreprocessConfig;
use crate::errors::{PreprocessError, ProcessingError};
use crate::history::HistoryStore;
use crate::localization::t_lang;
use crate::preprocessing::ImagePreprocessor;
use crate::report::AnalysisReport;

use super::command::Command;
use super::ui_builder::{
    format_history, format_report, format_too_large, format_too_many_pixels, help_message, welcome_message,
};

/// A photo received from a user, alive only while it is being processed
#[derive(Debug, Clone)]
pub struct InboundPhoto {
    pub user_id: i64,
    /// Message id, used to correlate log lines of one request
    pub request_id: i32,
    pub bytes: Vec<u8>,
    pub language_code: Option<String>,
}

pub struct BotController {
    store: Arc<dyn HistoryStore>,
    analyzer: Arc<dyn NutritionAnalyzer>,
    preprocessor: ImagePreprocessor,
    request_timeout: Duration,
    bot_username: Option<String>,
}

impl BotController {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        analyzer: Arc<dyn NutritionAnalyzer>,
        preprocessor: ImagePreprocessor,
        request_timeout: Duration,
    ) -> Self {
        Self {
            store,
            analyzer,
            preprocessor,
            request_timeout,
            bot_username: None,
        }
    }

    /// Ignore `/command@name` addressed to any other bot
    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    fn is_for_other_bot(&self, text: &str) -> bool {
        match (Command::addressee(text), self.bot_username.as_deref()) {
            (Some(addressee), Some(own)) => !addressee.eq_ignore_ascii_case(own),
            _ => false,
        }
    }

    pub fn preprocess_config(&self) -> &PreprocessConfig {
        self.preprocessor.config()
    }

    /// Reply to a plain text message
    ///
    /// Returns `None` for commands addressed to another bot in a group chat.
    pub async fn handle_text(&self, user_id: i64, text: &str, language_code: Option<&str>) -> Option<String> {
        if self.is_for_other_bot(text) {
            debug!(user_id, "Ignoring command addressed to another bot");
            return None;
        }

        Some(match Command::parse(text) {
            Some(command) => self.handle_command(user_id, &command, language_code).await,
            None => t_lang("text-response", language_code),
        })
    }

    pub async fn handle_command(&self, user_id: i64, command: &Command, language_code: Option<&str>) -> String {
        debug!(user_id, ?command, "Handling command");

        match command {
            Command::Start => welcome_message(language_code),
            Command::Help => help_message(language_code),
            Command::History => match self.store.list_all(user_id).await {
                Ok(entries) => format_history(&entries, language_code),
                Err(e) => {
                    error!(user_id, error = %e, "Failed to load history");
                    t_lang("error-history-unavailable", language_code)
                }
            },
            Command::Clear => match self.store.clear(user_id).await {
                Ok(removed) => {
                    info!(user_id, removed, "History cleared");
                    t_lang("history-cleared", language_code)
                }
                Err(e) => {
                    error!(user_id, error = %e, "Failed to clear history");
                    t_lang("error-history-unavailable", language_code)
                }
            },
            Command::Unknown(name) => {
                debug!(user_id, command = %name, "Unknown command");
                t_lang("unknown-command", language_code)
            }
        }
    }

    /// Run the full photo pipeline and return the reply text
    ///
    /// Never fails: every error becomes a user-facing message. A failed history
    /// write is logged and does not change the reply.
    pub async fn handle_photo(&self, photo: InboundPhoto) -> String {
        let InboundPhoto {
            user_id,
            request_id,
            bytes,
            language_code,
        } = photo;
        let language_code = language_code.as_deref();

        info!(user_id, request_id, bytes = bytes.len(), "Processing photo");

        match self.process_photo(bytes, language_code).await {
            Ok(report) => {
                let facts = report.nutrition_facts();
                info!(
                    user_id,
                    request_id,
                    food = ?facts.food,
                    calories_kcal = ?facts.calories_kcal,
                    structured = facts.is_complete(),
                    "Photo analyzed"
                );

                if let Err(e) = self.store.append(user_id, report.text()).await {
                    error!(user_id, request_id, error = %e, "Failed to save analysis to history");
                }

                format_report(&report, language_code)
            }
            Err(e) => {
                match &e {
                    ProcessingError::Preprocess(_) => {
                        warn!(user_id, request_id, error = %e, "Rejected unreadable photo")
                    }
                    _ => error!(user_id, request_id, error = %e, "Photo processing failed"),
                }
                Self::error_reply(&e, language_code)
            }
        }
    }

    /// Normalize and analyze a photo within the per-request time budget
    pub async fn process_photo(
        &self,
        bytes: Vec<u8>,
        language_code: Option<&str>,
    ) -> Result<AnalysisReport, ProcessingError> {
        match tokio::time::timeout(self.request_timeout, self.run_pipeline(bytes, language_code)).await {
            Ok(result) => result,
            Err(_) => Err(ProcessingError::Timeout(self.request_timeout)),
        }
    }

    async fn run_pipeline(
        &self,
        bytes: Vec<u8>,
        language_code: Option<&str>,
    ) -> Result<AnalysisReport, ProcessingError> {
        let preprocessor = self.preprocessor.clone();
        let normalized = tokio::task::spawn_blocking(move || preprocessor.normalize(&bytes))
            .await
            .map_err(|e| ProcessingError::Internal(format!("preprocessing task failed: {e}")))??;

        let instructions = analysis_instructions(language_code);
        Ok(self.analyzer.analyze(&normalized, &instructions).await?)
    }

    /// User-facing text for a pipeline failure; never includes internal detail
    pub fn error_reply(error: &ProcessingError, language_code: Option<&str>) -> String {
        match error {
            ProcessingError::Preprocess(PreprocessError::TooLarge { size, max }) => {
                format_too_large(*size, *max, language_code)
            }
            ProcessingError::Preprocess(PreprocessError::TooManyPixels {
                width,
                height,
                max_pixels,
            }) => format_too_many_pixels(*width, *height, *max_pixels, language_code),
            ProcessingError::Preprocess(_) => t_lang("error-invalid-image", language_code),
            ProcessingError::Analysis(_) | ProcessingError::Timeout(_) | ProcessingError::Internal(_) => {
                t_lang("error-processing-failed", language_code)
            }
        }
    }
}
