// Admin panel: user accounts and preauthorized registrations.

pub mod accounts;
pub mod handlers;
pub mod store;
