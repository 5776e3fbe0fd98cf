// Reminder emails: throttled automatic batches for pending deliveries and manual sends.

pub mod dispatch;
pub mod handlers;
pub mod mailer;
pub mod store;
pub mod throttle;
