// Recipient directory: snapshot cache of the HR roster and substring search over it.

pub mod cache;
pub mod handlers;
pub mod search;
pub mod store;
