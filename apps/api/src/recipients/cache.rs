//! Recipient directory cache.
//!
//! The directory roster is stored as immutable snapshots. A snapshot is reused
//! until it is older than the configured age, then the directory is fetched
//! again and a new snapshot appended. Concurrent callers may both refresh; the
//! newest snapshot wins on the next read.

use std::sync::Arc;

use chrono::{DateTime, Months, Utc};
use tracing::{info, warn};

use crate::auth::Caller;
use crate::directory_client::DirectoryClient;
use crate::errors::AppError;
use crate::models::recipient::{Recipient, RecipientList, RecipientSnapshot};
use crate::recipients::store::SnapshotStore;

#[derive(Clone)]
pub struct RecipientDirectory {
    store: Arc<dyn SnapshotStore>,
    client: Arc<dyn DirectoryClient>,
    max_age: Months,
}

impl RecipientDirectory {
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        client: Arc<dyn DirectoryClient>,
        max_age_months: u32,
    ) -> Self {
        Self {
            store,
            client,
            max_age: Months::new(max_age_months),
        }
    }

    /// A snapshot is stale once it is strictly older than `now - max_age`.
    pub fn is_stale(&self, snapshot: &RecipientSnapshot, now: DateTime<Utc>) -> bool {
        match now.checked_sub_months(self.max_age) {
            Some(threshold) => snapshot.created_at < threshold,
            None => true,
        }
    }

    /// Returns the cached roster, refreshing it first when stale or forced.
    ///
    /// Never fails: any upstream or storage error yields an empty list without
    /// `created_at`, which callers must read as "directory unavailable".
    pub async fn get_recipients(
        &self,
        caller: &Caller,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> RecipientList {
        match self.current_snapshot(force_refresh, now).await {
            Ok(snapshot) => RecipientList {
                entries: snapshot.entries.iter().map(Recipient::from_entry).collect(),
                created_at: Some(snapshot.created_at),
            },
            Err(e) => {
                warn!(
                    user_id = %caller.user_id,
                    "Recipient directory unavailable: {e}"
                );
                RecipientList::unavailable()
            }
        }
    }

    pub async fn force_refresh(&self, caller: &Caller, now: DateTime<Utc>) -> RecipientList {
        info!(user_id = %caller.user_id, "Forced recipient directory refresh");
        self.get_recipients(caller, true, now).await
    }

    async fn current_snapshot(
        &self,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> Result<RecipientSnapshot, AppError> {
        let latest = self.store.latest().await?;

        if !force_refresh {
            if let Some(snapshot) = latest.filter(|s| !self.is_stale(s, now)) {
                return Ok(snapshot);
            }
        }

        let entries = self
            .client
            .fetch_entries()
            .await
            .map_err(|e| AppError::Directory(e.to_string()))?;

        let snapshot = self.store.insert(&entries, now).await?;
        info!(
            "Stored recipient snapshot {} with {} entries",
            snapshot.id,
            snapshot.entries.len()
        );
        Ok(snapshot)
    }
}
