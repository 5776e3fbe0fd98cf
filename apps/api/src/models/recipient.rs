use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Directory field holding "Name Surname".
pub const FULL_NAME_FIELD: &str = "fullName";
/// Directory field holding the mail address. May be missing or blank.
pub const MAIL_FIELD: &str = "mail";

/// One record of the HR directory, kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDirectoryEntry(pub Map<String, Value>);

impl RawDirectoryEntry {
    /// Text content of a field. Elements that carried attributes keep their
    /// text under `#text`.
    pub fn text(&self, field: &str) -> Option<&str> {
        match self.0.get(field)? {
            Value::String(s) => Some(s.as_str()),
            Value::Object(obj) => obj.get("#text").and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Immutable copy of the directory at `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientSnapshot {
    pub id: Uuid,
    pub entries: Vec<RawDirectoryEntry>,
    pub created_at: DateTime<Utc>,
}

/// A potential delivery recipient, derived from a snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub surname: String,
    /// `None` when the directory has no address; such recipients cannot be assigned.
    pub email: Option<String>,
}

impl Recipient {
    pub fn from_entry(entry: &RawDirectoryEntry) -> Self {
        let full_name = entry.text(FULL_NAME_FIELD).unwrap_or("").trim();
        let (name, surname) = match full_name.split_once(char::is_whitespace) {
            Some((name, surname)) => (name.to_string(), surname.trim().to_string()),
            None => (full_name.to_string(), String::new()),
        };
        let email = entry
            .text(MAIL_FIELD)
            .map(str::trim)
            .filter(|mail| !mail.is_empty())
            .map(String::from);

        Self {
            name,
            surname,
            email,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.email.is_some()
    }
}

/// Result of a recipient lookup. An empty list with no `created_at` means the
/// directory was unavailable, not that it is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipientList {
    pub entries: Vec<Recipient>,
    pub created_at: Option<DateTime<Utc>>,
}

impl RecipientList {
    pub fn unavailable() -> Self {
        Self::default()
    }
}
