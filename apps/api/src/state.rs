use std::sync::Arc;

use crate::admin::store::ProfileStore;
use crate::config::Config;
use crate::deliveries::store::DeliveryStore;
use crate::recipients::cache::RecipientDirectory;
use crate::reminders::dispatch::ReminderDispatcher;
use crate::reminders::store::ReminderStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub recipients: RecipientDirectory,
    pub deliveries: Arc<dyn DeliveryStore>,
    /// Read side of the reminder history, for delivery detail.
    pub reminder_logs: Arc<dyn ReminderStore>,
    pub reminders: ReminderDispatcher,
    pub profiles: Arc<dyn ProfileStore>,
}
