//! SQLite history backend.
//!
//! One table, `chat_history`, one row per turn. The autoincrement key gives
//! insertion order, which is the order turns are read back in.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::error::HistoryError;
use parley_core::history::HistoryStore;
use parley_core::job::ChatJob;
use parley_core::message::{Message, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info, warn};

pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    /// Open (or create) the database file at `path` and run migrations.
    pub async fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                HistoryError::Storage(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite history initialized at {}", path.display());
        Ok(store)
    }

    /// Wrap an existing pool and run migrations.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, HistoryError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), HistoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id  TEXT NOT NULL,
                username    TEXT NOT NULL,
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("chat_history table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chat_history_session ON chat_history(session_id, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| HistoryError::MigrationFailed(format!("session index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, HistoryError> {
        let role: String = row
            .try_get("role")
            .map_err(|e| HistoryError::QueryFailed(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| HistoryError::QueryFailed(format!("content column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| HistoryError::QueryFailed(format!("created_at column: {e}")))?;

        let role = role.parse::<Role>().unwrap_or_else(|e| {
            warn!(error = %e, "Unknown role in history, reading as user");
            Role::User
        });

        let timestamp = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(Message {
            role,
            content,
            timestamp,
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistory {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn get_history(&self, session_id: &str) -> Result<Vec<Message>, HistoryError> {
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM chat_history WHERE session_id = ?1 ORDER BY id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HistoryError::QueryFailed(format!("Failed to read history: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn append_history(&self, job: &ChatJob, messages: &[Message]) -> Result<(), HistoryError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to begin: {e}")))?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_history (session_id, username, role, content, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&job.session_id)
            .bind(&job.username)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.timestamp.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to insert turn: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| HistoryError::Storage(format!("Failed to commit: {e}")))?;

        debug!(session_id = %job.session_id, turns = messages.len(), "History appended");
        Ok(())
    }
}
