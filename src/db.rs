//! # Database Module
//!
//! PostgreSQL persistence for analysis history: pool setup, idempotent schema
//! creation and [`PgHistoryStore`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::errors::HistoryError;
use crate::history::{HistoryEntry, HistoryStore};

/// Connect to PostgreSQL with a small pool sized for a single bot process
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS analysis_history (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL,
            report_text TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create analysis_history table")?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS analysis_history_user_idx
         ON analysis_history (user_id, id)",
    )
    .execute(pool)
    .await
    .context("Failed to create analysis_history index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// History store backed by the `analysis_history` table
#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = connect(database_url).await?;
        init_database_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append(&self, user_id: i64, report_text: &str) -> Result<(), HistoryError> {
        let (entry_id,): (i64,) = sqlx::query_as(
            "INSERT INTO analysis_history (user_id, report_text) VALUES ($1, $2) RETURNING id",
        )
        .bind(user_id)
        .bind(report_text)
        .fetch_one(&self.pool)
        .await?;

        info!("History entry {} created for user_id: {}", entry_id, user_id);
        Ok(())
    }

    async fn list_all(&self, user_id: i64) -> Result<Vec<HistoryEntry>, HistoryError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT report_text, created_at FROM analysis_history
             WHERE user_id = $1
             ORDER BY id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        info!("Loaded {} history entries for user_id: {}", rows.len(), user_id);

        Ok(rows
            .into_iter()
            .map(|(report_text, created_at)| HistoryEntry {
                user_id,
                report_text,
                created_at,
            })
            .collect())
    }

    async fn clear(&self, user_id: i64) -> Result<u64, HistoryError> {
        let rows_affected = sqlx::query("DELETE FROM analysis_history WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!("Cleared {} history entries for user_id: {}", rows_affected, user_id);
        Ok(rows_affected)
    }
}
