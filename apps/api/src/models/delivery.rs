use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Completed,
    Cancelled,
}

impl DeliveryStatus {
    pub const ALL: [DeliveryStatus; 3] = [
        DeliveryStatus::Pending,
        DeliveryStatus::Completed,
        DeliveryStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Completed => "completed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled deliveries are locked for non-admin callers.
    pub fn is_finalized(self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Cancelled)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown delivery status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for DeliveryStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "completed" => Ok(DeliveryStatus::Completed),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeliveryStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A registered parcel. `owner_email` is resolved from the owner's profile at read time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DeliveryRecord {
    pub id: i64,
    pub user_id: Uuid,
    #[sqlx(default)]
    pub owner_email: Option<String>,
    pub recipient_email: String,
    pub place: String,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: DeliveryStatus,
    pub reminders_sent: i32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Values for a delivery that has passed validation and is ready to insert.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub user_id: Uuid,
    pub recipient_email: String,
    pub place: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}
