//! # NutriBot
//!
//! A Telegram bot that estimates the calories and macros of a food photo with
//! a vision-capable language model and keeps a per-user history of its answers.

pub mod analysis;
pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod errors;
pub mod history;
pub mod localization;
pub mod observability;
pub mod preprocessing;
pub mod report;

// Re-export types for easier access
pub use analysis::{AnalysisClient, NutritionAnalyzer};
pub use bot::BotController;
pub use config::AppConfig;
pub use history::{HistoryEntry, HistoryStore, InMemoryHistoryStore};
pub use preprocessing::{ImagePreprocessor, NormalizedImage};
pub use report::AnalysisReport;
