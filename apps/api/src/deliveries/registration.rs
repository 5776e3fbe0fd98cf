use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

use crate::auth::Caller;
use crate::deliveries::store::DeliveryStore;
use crate::errors::{AppError, FieldErrors};
use crate::models::delivery::{DeliveryRecord, NewDelivery};

#[derive(Debug, Clone, Deserialize)]
pub struct SaveDeliveryRequest {
    #[serde(default)]
    pub recipient: String,
    #[serde(default)]
    pub place: String,
    pub notes: Option<String>,
}

/// Loose shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_email_shaped(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Collects every field problem instead of stopping at the first.
pub fn validate(request: &SaveDeliveryRequest) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    let recipient = request.recipient.trim();

    if recipient.is_empty() {
        errors
            .entry("recipient".to_string())
            .or_default()
            .push("Recipient is required".to_string());
    } else if !is_email_shaped(recipient) {
        errors
            .entry("recipient".to_string())
            .or_default()
            .push("Recipient must be a valid email address".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Registers a parcel owned by `caller`. New deliveries start `pending`.
pub async fn save_delivery(
    store: &dyn DeliveryStore,
    caller: &Caller,
    request: SaveDeliveryRequest,
    now: DateTime<Utc>,
) -> Result<DeliveryRecord, AppError> {
    validate(&request).map_err(AppError::FieldValidation)?;

    let notes = request
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let record = store
        .insert(NewDelivery {
            user_id: caller.user_id,
            recipient_email: request.recipient.trim().to_string(),
            place: request.place.trim().to_string(),
            notes,
            created_at: now,
        })
        .await?;

    info!(
        user_id = %caller.user_id,
        "Registered delivery {} for {}",
        record.id, record.recipient_email
    );
    Ok(record)
}
