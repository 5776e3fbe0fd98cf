use serde::Serialize;

use crate::auth::Caller;
use crate::deliveries::store::DeliveryStore;
use crate::errors::AppError;
use crate::models::delivery::DeliveryRecord;
use crate::models::reminder::ReminderLog;
use crate::reminders::store::ReminderStore;

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryDetail {
    pub delivery: DeliveryRecord,
    /// Newest first.
    pub reminders: Vec<ReminderLog>,
    /// Whether the caller may still change the status.
    pub editable: bool,
}

pub async fn get_delivery(
    deliveries: &dyn DeliveryStore,
    reminders: &dyn ReminderStore,
    caller: &Caller,
    id: i64,
) -> Result<DeliveryDetail, AppError> {
    let delivery = deliveries
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Delivery {id} not found")))?;
    let reminders = reminders.list_for(id).await?;
    let editable = caller.can_manage(delivery.user_id)
        && (caller.is_admin() || !delivery.status.is_finalized());

    Ok(DeliveryDetail {
        delivery,
        reminders,
        editable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::models::delivery::DeliveryStatus;
    use crate::testing::{admin_caller, staff_caller, MemoryDeliveryStore, MemoryReminderStore};

    #[tokio::test]
    async fn test_detail_lists_reminders_newest_first() {
        let now = Utc::now();
        let caller = staff_caller();
        let deliveries = MemoryDeliveryStore::default();
        let logs = MemoryReminderStore::default();
        let id = deliveries.seed_owned(&caller, DeliveryStatus::Pending, now - Duration::days(9));
        logs.seed(id, true, now - Duration::days(8));
        logs.seed(id, false, now - Duration::days(1));

        let detail = get_delivery(&deliveries, &logs, &caller, id).await.unwrap();
        assert_eq!(detail.reminders.len(), 2);
        assert!(!detail.reminders[0].ok);
        assert!(detail.editable);
    }

    #[tokio::test]
    async fn test_finalized_detail_editable_only_for_admin() {
        let now = Utc::now();
        let caller = staff_caller();
        let deliveries = MemoryDeliveryStore::default();
        let logs = MemoryReminderStore::default();
        let id = deliveries.seed_owned(&caller, DeliveryStatus::Cancelled, now);

        assert!(!get_delivery(&deliveries, &logs, &caller, id).await.unwrap().editable);
        assert!(get_delivery(&deliveries, &logs, &admin_caller(), id).await.unwrap().editable);
    }

    #[tokio::test]
    async fn test_unknown_delivery() {
        let result = get_delivery(
            &MemoryDeliveryStore::default(),
            &MemoryReminderStore::default(),
            &staff_caller(),
            7,
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
