use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::reminder::ReminderLog;

/// Append-only reminder history.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    /// Most recent log by `send_at`, optionally ignoring failed attempts.
    async fn latest_for(
        &self,
        delivery_id: i64,
        successful_only: bool,
    ) -> Result<Option<ReminderLog>, sqlx::Error>;

    async fn append(
        &self,
        delivery_id: i64,
        ok: bool,
        message: &str,
        send_at: DateTime<Utc>,
    ) -> Result<ReminderLog, sqlx::Error>;

    /// Every log of a delivery, newest first.
    async fn list_for(&self, delivery_id: i64) -> Result<Vec<ReminderLog>, sqlx::Error>;
}

pub struct PgReminderStore {
    pool: PgPool,
}

impl PgReminderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReminderStore for PgReminderStore {
    async fn latest_for(
        &self,
        delivery_id: i64,
        successful_only: bool,
    ) -> Result<Option<ReminderLog>, sqlx::Error> {
        sqlx::query_as::<_, ReminderLog>(
            r#"
            SELECT * FROM reminder_logs
            WHERE delivery_id = $1 AND (ok OR NOT $2)
            ORDER BY send_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(delivery_id)
        .bind(successful_only)
        .fetch_optional(&self.pool)
        .await
    }

    async fn append(
        &self,
        delivery_id: i64,
        ok: bool,
        message: &str,
        send_at: DateTime<Utc>,
    ) -> Result<ReminderLog, sqlx::Error> {
        sqlx::query_as::<_, ReminderLog>(
            r#"
            INSERT INTO reminder_logs (delivery_id, ok, message, send_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(delivery_id)
        .bind(ok)
        .bind(message)
        .bind(send_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_for(&self, delivery_id: i64) -> Result<Vec<ReminderLog>, sqlx::Error> {
        sqlx::query_as::<_, ReminderLog>(
            "SELECT * FROM reminder_logs WHERE delivery_id = $1 ORDER BY send_at DESC, id DESC",
        )
        .bind(delivery_id)
        .fetch_all(&self.pool)
        .await
    }
}
