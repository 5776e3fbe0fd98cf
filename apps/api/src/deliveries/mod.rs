// Deliveries: registration, filtered pagination, detail view and status changes.

pub mod detail;
pub mod filters;
pub mod handlers;
pub mod listing;
pub mod registration;
pub mod status;
pub mod store;
