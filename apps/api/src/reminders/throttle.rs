use chrono::{DateTime, Duration, Utc};

use crate::models::reminder::ReminderLog;

/// Suppresses automatic reminders for deliveries reminded recently.
#[derive(Debug, Clone, Copy)]
pub struct ThrottlePolicy {
    pub window: Duration,
    /// When true a failed attempt occupies the window just like a sent one.
    pub counts_failures: bool,
}

impl ThrottlePolicy {
    pub fn new(window_days: i64, counts_failures: bool) -> Self {
        Self {
            window: Duration::days(window_days),
            counts_failures,
        }
    }

    /// `latest` must be the newest log the policy considers (see `counts_failures`).
    pub fn is_throttled(&self, latest: Option<&ReminderLog>, now: DateTime<Utc>) -> bool {
        latest.is_some_and(|log| log.send_at > now - self.window)
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::new(3, true)
    }
}
