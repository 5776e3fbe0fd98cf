use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One reminder-send attempt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ReminderLog {
    pub id: i64,
    pub delivery_id: i64,
    pub ok: bool,
    pub message: String,
    pub send_at: DateTime<Utc>,
}
