use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::profile::{PreauthorizedEmail, Profile};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error>;

    async fn list(&self) -> Result<Vec<Profile>, sqlx::Error>;

    async fn list_preauthorized(&self) -> Result<Vec<PreauthorizedEmail>, sqlx::Error>;

    /// Inserts `email`, or returns the existing row unchanged.
    async fn add_preauthorized(
        &self,
        email: &str,
        created_by: Uuid,
    ) -> Result<PreauthorizedEmail, sqlx::Error>;

    /// Returns whether a row was removed.
    async fn remove_preauthorized(&self, email: &str) -> Result<bool, sqlx::Error>;
}

pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list(&self) -> Result<Vec<Profile>, sqlx::Error> {
        sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY email ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn list_preauthorized(&self) -> Result<Vec<PreauthorizedEmail>, sqlx::Error> {
        sqlx::query_as::<_, PreauthorizedEmail>(
            "SELECT * FROM preauthorized_emails ORDER BY created_at DESC, email ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn add_preauthorized(
        &self,
        email: &str,
        created_by: Uuid,
    ) -> Result<PreauthorizedEmail, sqlx::Error> {
        // The no-op update makes RETURNING yield the existing row on conflict
        sqlx::query_as::<_, PreauthorizedEmail>(
            r#"
            INSERT INTO preauthorized_emails (email, created_by)
            VALUES ($1, $2)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
    }

    async fn remove_preauthorized(&self, email: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM preauthorized_emails WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
