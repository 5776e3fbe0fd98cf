use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::deliveries::filters::{contains_pattern, DeliveryFilter};
use crate::models::delivery::{DeliveryRecord, DeliveryStatus, NewDelivery};

/// One bounded read of the deliveries list.
#[derive(Debug, Clone)]
pub struct DeliveryQuery {
    pub filter: DeliveryFilter,
    /// Only rows created at or before this instant are visible.
    pub as_of: DateTime<Utc>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default)]
pub struct QueriedRows {
    /// Ordered by `created_at DESC, id DESC`.
    pub rows: Vec<DeliveryRecord>,
    /// Total matching rows, when the store can tell.
    pub total: Option<i64>,
}

#[async_trait]
pub trait DeliveryStore: Send + Sync {
    async fn insert(&self, new: NewDelivery) -> Result<DeliveryRecord, sqlx::Error>;

    async fn get(&self, id: i64) -> Result<Option<DeliveryRecord>, sqlx::Error>;

    async fn query(&self, query: &DeliveryQuery) -> Result<QueriedRows, sqlx::Error>;

    /// Writes `status`; stamps `completed_at = now` for `completed`, clears it otherwise.
    async fn update_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error>;

    /// Pending deliveries, oldest first.
    async fn list_pending(&self) -> Result<Vec<DeliveryRecord>, sqlx::Error>;

    async fn increment_reminders(&self, id: i64) -> Result<(), sqlx::Error>;
}

const SELECT_WITH_OWNER: &str = "SELECT d.*, p.email AS owner_email \
     FROM deliveries d LEFT JOIN profiles p ON p.id = d.user_id";

#[derive(FromRow)]
struct ListedDelivery {
    #[sqlx(flatten)]
    record: DeliveryRecord,
    total_count: i64,
}

/// Builds the filtered, ordered, paginated listing query.
pub fn build_list_query(query: &DeliveryQuery) -> QueryBuilder<'_, Postgres> {
    let filter = &query.filter;
    let mut qb = QueryBuilder::new(
        "SELECT d.*, p.email AS owner_email, COUNT(*) OVER () AS total_count \
         FROM deliveries d LEFT JOIN profiles p ON p.id = d.user_id \
         WHERE d.created_at <= ",
    );
    qb.push_bind(query.as_of);

    if let Some(recipient) = &filter.recipient {
        qb.push(" AND d.recipient_email ILIKE ");
        qb.push_bind(contains_pattern(recipient));
        qb.push(" ESCAPE '\\'");
    }
    if let Some(sender) = &filter.sender {
        qb.push(" AND p.email ILIKE ");
        qb.push_bind(contains_pattern(sender));
        qb.push(" ESCAPE '\\'");
    }
    if !filter.statuses.is_empty() {
        qb.push(" AND d.status IN (");
        let mut statuses = qb.separated(", ");
        for status in &filter.statuses {
            statuses.push_bind(status.as_str());
        }
        statuses.push_unseparated(")");
    }
    if let Some(from) = filter.created_from {
        qb.push(" AND d.created_at >= ");
        qb.push_bind(from);
    }
    if let Some(before) = filter.created_before {
        qb.push(" AND d.created_at < ");
        qb.push_bind(before);
    }

    qb.push(" ORDER BY d.created_at DESC, d.id DESC LIMIT ");
    qb.push_bind(query.limit);
    qb.push(" OFFSET ");
    qb.push_bind(query.offset);
    qb
}

pub struct PgDeliveryStore {
    pool: PgPool,
}

impl PgDeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryStore for PgDeliveryStore {
    async fn insert(&self, new: NewDelivery) -> Result<DeliveryRecord, sqlx::Error> {
        sqlx::query_as::<_, DeliveryRecord>(
            r#"
            WITH inserted AS (
                INSERT INTO deliveries (user_id, recipient_email, place, notes, status, created_at)
                VALUES ($1, $2, $3, $4, 'pending', $5)
                RETURNING *
            )
            SELECT i.*, p.email AS owner_email
            FROM inserted i LEFT JOIN profiles p ON p.id = i.user_id
            "#,
        )
        .bind(new.user_id)
        .bind(&new.recipient_email)
        .bind(&new.place)
        .bind(&new.notes)
        .bind(new.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DeliveryRecord>(&format!("{SELECT_WITH_OWNER} WHERE d.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn query(&self, query: &DeliveryQuery) -> Result<QueriedRows, sqlx::Error> {
        let mut qb = build_list_query(query);
        debug!("Delivery list query: {}", qb.sql());

        let listed: Vec<ListedDelivery> = qb.build_query_as().fetch_all(&self.pool).await?;
        let total = listed.first().map(|row| row.total_count);

        Ok(QueriedRows {
            rows: listed.into_iter().map(|row| row.record).collect(),
            total,
        })
    }

    async fn update_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        let completed_at = (status == DeliveryStatus::Completed).then_some(now);
        sqlx::query_as::<_, DeliveryRecord>(
            r#"
            WITH updated AS (
                UPDATE deliveries
                SET status = $2, completed_at = $3
                WHERE id = $1
                RETURNING *
            )
            SELECT u.*, p.email AS owner_email
            FROM updated u LEFT JOIN profiles p ON p.id = u.user_id
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(completed_at)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_pending(&self) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        sqlx::query_as::<_, DeliveryRecord>(&format!(
            "{SELECT_WITH_OWNER} WHERE d.status = 'pending' ORDER BY d.created_at ASC, d.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
    }

    async fn increment_reminders(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE deliveries SET reminders_sent = reminders_sent + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
