use chrono::{DateTime, Utc};

use crate::auth::Caller;
use crate::models::recipient::{Recipient, RecipientList};
use crate::recipients::cache::RecipientDirectory;

/// Case-insensitive substring match against name, surname and email.
/// `needle` must already be lowercased.
pub fn matches_query(recipient: &Recipient, needle: &str) -> bool {
    recipient.name.to_lowercase().contains(needle)
        || recipient.surname.to_lowercase().contains(needle)
        || recipient
            .email
            .as_deref()
            .is_some_and(|email| email.to_lowercase().contains(needle))
}

pub fn filter_recipients(recipients: Vec<Recipient>, query: &str) -> Vec<Recipient> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    recipients
        .into_iter()
        .filter(|r| matches_query(r, &needle))
        .collect()
}

/// Searches the cached roster. A blank query returns nothing and skips the
/// cache lookup entirely.
pub async fn search_recipients(
    directory: &RecipientDirectory,
    caller: &Caller,
    query: &str,
    now: DateTime<Utc>,
) -> RecipientList {
    if query.trim().is_empty() {
        return RecipientList::default();
    }

    let list = directory.get_recipients(caller, false, now).await;
    RecipientList {
        entries: filter_recipients(list.entries, query),
        created_at: list.created_at,
    }
}
