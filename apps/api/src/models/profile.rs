use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// An email address allowed to sign up before an account exists.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PreauthorizedEmail {
    pub email: String,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
