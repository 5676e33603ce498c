//! # Error Types Module
//!
//! Error taxonomy for the photo analysis pipeline. Each component reports its
//! own error enum; the bot controller folds them into [`ProcessingError`] and
//! decides what the user gets to see.

use std::time::Duration;

/// Errors raised while normalizing an inbound photo
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessError {
    /// The bytes are not a readable image (unknown signature, truncated or corrupt data)
    Decode(String),
    /// The image format was recognized but cannot be converted to RGB
    UnsupportedFormat(String),
    /// The input exceeds the configured byte limit
    TooLarge { size: u64, max: u64 },
    /// The declared dimensions exceed the configured pixel limit
    TooManyPixels { width: u32, height: u32, max_pixels: u64 },
}

impl std::fmt::Display for PreprocessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PreprocessError::Decode(msg) => write!(f, "Decode error: {msg}"),
            PreprocessError::UnsupportedFormat(msg) => write!(f, "Unsupported format error: {msg}"),
            PreprocessError::TooLarge { size, max } => {
                write!(f, "Image too large: {size} bytes (max {max} bytes)")
            }
            PreprocessError::TooManyPixels {
                width,
                height,
                max_pixels,
            } => write!(f, "Image too large: {width}x{height} pixels (max {max_pixels} pixels)"),
        }
    }
}

impl std::error::Error for PreprocessError {}

impl From<image::ImageError> for PreprocessError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => PreprocessError::UnsupportedFormat(e.to_string()),
            other => PreprocessError::Decode(other.to_string()),
        }
    }
}

/// Errors raised by the remote analysis service client
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The service failed, timed out, or the circuit breaker is open
    Unavailable(String),
    /// The service answered but without a usable report
    MalformedResponse(String),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Unavailable(msg) => write!(f, "Analysis unavailable: {msg}"),
            AnalysisError::MalformedResponse(msg) => write!(f, "Malformed analysis response: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Errors raised by history storage backends
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryError {
    StorageUnavailable(String),
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {msg}"),
        }
    }
}

impl std::error::Error for HistoryError {}

impl From<sqlx::Error> for HistoryError {
    fn from(err: sqlx::Error) -> Self {
        HistoryError::StorageUnavailable(err.to_string())
    }
}

/// Failure of the photo pipeline as seen by the bot controller
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingError {
    Preprocess(PreprocessError),
    Analysis(AnalysisError),
    /// The whole request exceeded its time budget
    Timeout(Duration),
    /// Anything that is not part of the taxonomy above (panicked worker, etc.)
    Internal(String),
}

impl std::fmt::Display for ProcessingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingError::Preprocess(e) => write!(f, "{e}"),
            ProcessingError::Analysis(e) => write!(f, "{e}"),
            ProcessingError::Timeout(limit) => write!(f, "Request timed out after {limit:?}"),
            ProcessingError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ProcessingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessingError::Preprocess(e) => Some(e),
            ProcessingError::Analysis(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PreprocessError> for ProcessingError {
    fn from(err: PreprocessError) -> Self {
        ProcessingError::Preprocess(err)
    }
}

impl From<AnalysisError> for ProcessingError {
    fn from(err: AnalysisError) -> Self {
        ProcessingError::Analysis(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PreprocessError::Decode("bad header".to_string());
        assert_eq!(err.to_string(), "Decode error: bad header");

        let err = PreprocessError::TooLarge { size: 30, max: 20 };
        assert_eq!(err.to_string(), "Image too large: 30 bytes (max 20 bytes)");

        let err = AnalysisError::Unavailable("timeout".to_string());
        assert_eq!(err.to_string(), "Analysis unavailable: timeout");

        let err = ProcessingError::Timeout(Duration::from_secs(90));
        assert_eq!(err.to_string(), "Request timed out after 90s");
    }

    #[test]
    fn test_processing_error_source() {
        use std::error::Error;

        let err = ProcessingError::from(AnalysisError::MalformedResponse("no choices".into()));
        assert!(err.source().is_some());
        assert!(ProcessingError::Internal("boom".into()).source().is_none());
    }
}
