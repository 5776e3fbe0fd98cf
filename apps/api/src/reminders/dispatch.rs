//! Reminder dispatch — automatic batch runs and manual sends.
//!
//! The throttle check, send and log append are not transactional. Overlapping
//! automatic runs inside one process are refused by `run_guard`; deployments
//! with several instances must keep a single scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::auth::Caller;
use crate::deliveries::store::DeliveryStore;
use crate::errors::AppError;
use crate::models::delivery::{DeliveryRecord, DeliveryStatus};
use crate::reminders::mailer::{MailOutcome, Mailer, TEMPLATE_INITIAL};
use crate::reminders::store::ReminderStore;
use crate::reminders::throttle::ThrottlePolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderResult {
    pub delivery_id: i64,
    pub recipient_email: String,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReminderBatch {
    pub sent: usize,
    /// Pending deliveries considered.
    pub total: usize,
    /// Pending deliveries left alone by the throttle.
    pub skipped: usize,
    /// One entry per attempted delivery, in attempt order.
    pub results: Vec<ReminderResult>,
}

#[derive(Clone)]
pub struct ReminderDispatcher {
    deliveries: Arc<dyn DeliveryStore>,
    logs: Arc<dyn ReminderStore>,
    mailer: Arc<dyn Mailer>,
    policy: ThrottlePolicy,
    run_guard: Arc<Mutex<()>>,
}

impl ReminderDispatcher {
    pub fn new(
        deliveries: Arc<dyn DeliveryStore>,
        logs: Arc<dyn ReminderStore>,
        mailer: Arc<dyn Mailer>,
        policy: ThrottlePolicy,
    ) -> Self {
        Self {
            deliveries,
            logs,
            mailer,
            policy,
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Reminds every pending delivery outside the throttle window.
    /// Per-delivery failures are reported in the batch and never abort it.
    pub async fn send_automatic(&self, now: DateTime<Utc>) -> Result<ReminderBatch, AppError> {
        let _guard = self
            .run_guard
            .try_lock()
            .map_err(|_| AppError::Conflict("A reminder run is already in progress".to_string()))?;

        let pending = self.deliveries.list_pending().await?;
        let mut batch = ReminderBatch {
            total: pending.len(),
            ..Default::default()
        };

        for delivery in &pending {
            let latest = match self
                .logs
                .latest_for(delivery.id, !self.policy.counts_failures)
                .await
            {
                Ok(latest) => latest,
                Err(e) => {
                    warn!("Reminder history unavailable for delivery {}: {e}", delivery.id);
                    batch.results.push(ReminderResult {
                        delivery_id: delivery.id,
                        recipient_email: delivery.recipient_email.clone(),
                        success: false,
                        message: "Reminder history unavailable".to_string(),
                    });
                    continue;
                }
            };

            if self.policy.is_throttled(latest.as_ref(), now) {
                batch.skipped += 1;
                continue;
            }

            let result = self.remind(delivery, now).await;
            if result.success {
                batch.sent += 1;
            }
            batch.results.push(result);
        }

        info!(
            "Automatic reminders: {} sent, {} skipped, {} pending",
            batch.sent, batch.skipped, batch.total
        );
        Ok(batch)
    }

    /// Sends a reminder on request of the owner or an admin, ignoring the throttle.
    pub async fn send_manual(
        &self,
        caller: &Caller,
        delivery_id: i64,
        now: DateTime<Utc>,
    ) -> Result<ReminderResult, AppError> {
        let delivery = self
            .deliveries
            .get(delivery_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Delivery {delivery_id} not found")))?;

        if !caller.can_manage(delivery.user_id) {
            return Err(AppError::Forbidden(format!(
                "Delivery {delivery_id} belongs to another user"
            )));
        }
        if delivery.status != DeliveryStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Delivery {delivery_id} is {}; only pending deliveries can be reminded",
                delivery.status
            )));
        }

        info!(user_id = %caller.user_id, "Manual reminder for delivery {delivery_id}");
        Ok(self.remind(&delivery, now).await)
    }

    /// Sends one reminder and appends its log. Never fails; problems are
    /// reported in the result.
    async fn remind(&self, delivery: &DeliveryRecord, now: DateTime<Utc>) -> ReminderResult {
        let params = json!({
            "delivery_id": delivery.id,
            "place": delivery.place,
            "notes": delivery.notes,
            "registered_at": delivery.created_at,
            "registered_by": delivery.owner_email,
        });
        let MailOutcome { ok, message } = self
            .mailer
            .send(TEMPLATE_INITIAL, &delivery.recipient_email, &params)
            .await;

        let mut result = ReminderResult {
            delivery_id: delivery.id,
            recipient_email: delivery.recipient_email.clone(),
            success: ok,
            message,
        };

        if let Err(e) = self.logs.append(delivery.id, ok, &result.message, now).await {
            warn!("Could not log reminder for delivery {}: {e}", delivery.id);
            result.message = format!("{} (not logged)", result.message);
        }
        if ok {
            if let Err(e) = self.deliveries.increment_reminders(delivery.id).await {
                warn!("Could not count reminder for delivery {}: {e}", delivery.id);
            }
        }
        result
    }
}
