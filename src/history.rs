//! # History Module
//!
//! Per-user, append-only log of past analysis reports. [`HistoryStore`] is the
//! seam the bot controller talks to; [`crate::db::PgHistoryStore`] persists to
//! PostgreSQL and [`InMemoryHistoryStore`] keeps everything in process memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::errors::HistoryError;

/// One stored report
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub user_id: i64,
    pub report_text: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Record a report for a user; never overwrites earlier entries
    async fn append(&self, user_id: i64, report_text: &str) -> Result<(), HistoryError>;

    /// All entries for a user, oldest first
    async fn list_all(&self, user_id: i64) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Delete every entry for a user, returning how many were removed
    async fn clear(&self, user_id: i64) -> Result<u64, HistoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    entries: RwLock<HashMap<i64, Vec<HistoryEntry>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn append(&self, user_id: i64, report_text: &str) -> Result<(), HistoryError> {
        self.entries
            .write()
            .await
            .entry(user_id)
            .or_default()
            .push(HistoryEntry {
                user_id,
                report_text: report_text.to_string(),
                created_at: Utc::now(),
            });
        Ok(())
    }

    async fn list_all(&self, user_id: i64) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(self
            .entries
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, user_id: i64) -> Result<u64, HistoryError> {
        let removed = self.entries.write().await.remove(&user_id);
        Ok(removed.map_or(0, |entries| entries.len() as u64))
    }
}
