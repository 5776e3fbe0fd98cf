use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::recipient::{RawDirectoryEntry, RecipientSnapshot};

/// Append-only storage of directory snapshots.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The most recent snapshot by `created_at`, if any.
    async fn latest(&self) -> Result<Option<RecipientSnapshot>, sqlx::Error>;

    async fn insert(
        &self,
        entries: &[RawDirectoryEntry],
        created_at: DateTime<Utc>,
    ) -> Result<RecipientSnapshot, sqlx::Error>;
}

#[derive(FromRow)]
struct SnapshotRow {
    id: Uuid,
    entries: Json<Vec<RawDirectoryEntry>>,
    created_at: DateTime<Utc>,
}

impl From<SnapshotRow> for RecipientSnapshot {
    fn from(row: SnapshotRow) -> Self {
        RecipientSnapshot {
            id: row.id,
            entries: row.entries.0,
            created_at: row.created_at,
        }
    }
}

pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn latest(&self) -> Result<Option<RecipientSnapshot>, sqlx::Error> {
        let row: Option<SnapshotRow> = sqlx::query_as(
            "SELECT id, entries, created_at FROM recipient_snapshots ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RecipientSnapshot::from))
    }

    // Append-only: INSERT a new snapshot, never UPDATE an existing one
    async fn insert(
        &self,
        entries: &[RawDirectoryEntry],
        created_at: DateTime<Utc>,
    ) -> Result<RecipientSnapshot, sqlx::Error> {
        let row: SnapshotRow = sqlx::query_as(
            r#"
            INSERT INTO recipient_snapshots (id, entries, created_at)
            VALUES ($1, $2, $3)
            RETURNING id, entries, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(Json(entries))
        .bind(created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }
}
