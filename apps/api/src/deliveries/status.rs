use chrono::{DateTime, Utc};
use tracing::info;

use crate::auth::Caller;
use crate::deliveries::store::DeliveryStore;
use crate::errors::AppError;
use crate::models::delivery::{DeliveryRecord, DeliveryStatus};

/// Checks whether `caller` may move `record` to another status.
///
/// Owners and admins may change a pending delivery; once completed or
/// cancelled, only admins may change it again.
pub fn authorize_status_change(caller: &Caller, record: &DeliveryRecord) -> Result<(), AppError> {
    if !caller.can_manage(record.user_id) {
        return Err(AppError::Forbidden(format!(
            "Delivery {} belongs to another user",
            record.id
        )));
    }
    if record.status.is_finalized() && !caller.is_admin() {
        return Err(AppError::Forbidden(format!(
            "Delivery {} is {} and can only be changed by an administrator",
            record.id, record.status
        )));
    }
    Ok(())
}

/// Sets the status of a delivery. Any status may follow any other.
/// `completed_at` is stamped on `completed` and cleared on every other status.
pub async fn update_delivery_status(
    store: &dyn DeliveryStore,
    caller: &Caller,
    id: i64,
    status: DeliveryStatus,
    now: DateTime<Utc>,
) -> Result<DeliveryRecord, AppError> {
    let current = store
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delivery {id} not found")))?;

    authorize_status_change(caller, &current)?;

    let updated = store
        .update_status(id, status, now)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delivery {id} not found")))?;

    info!(
        user_id = %caller.user_id,
        "Delivery {id} status {} -> {}",
        current.status, updated.status
    );
    Ok(updated)
}
