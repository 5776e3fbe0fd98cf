//! In-memory stores and fixed callers shared by unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::admin::store::ProfileStore;
use crate::auth::{Caller, Role};
use crate::deliveries::store::{DeliveryQuery, DeliveryStore, QueriedRows};
use crate::models::delivery::{DeliveryRecord, DeliveryStatus, NewDelivery};
use crate::models::profile::{PreauthorizedEmail, Profile};
use crate::models::recipient::{RawDirectoryEntry, RecipientSnapshot};
use crate::models::reminder::ReminderLog;
use crate::recipients::store::SnapshotStore;
use crate::reminders::store::ReminderStore;

const STAFF_ID: Uuid = Uuid::from_u128(0x5354_4146_4600_0000_0000_0000_0000_0001);
const ADMIN_ID: Uuid = Uuid::from_u128(0x4144_4d49_4e00_0000_0000_0000_0000_0002);

pub fn staff_caller() -> Caller {
    Caller {
        user_id: STAFF_ID,
        email: "staff@x.com".to_string(),
        role: Role::Staff,
    }
}

pub fn admin_caller() -> Caller {
    Caller {
        user_id: ADMIN_ID,
        email: "admin@x.com".to_string(),
        role: Role::Admin,
    }
}

fn unavailable() -> sqlx::Error {
    sqlx::Error::PoolClosed
}

#[derive(Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<Vec<RecipientSnapshot>>,
    fail_writes: bool,
}

impl MemorySnapshotStore {
    pub fn with_snapshot(entries: Vec<RawDirectoryEntry>, created_at: DateTime<Utc>) -> Self {
        let store = Self::default();
        store.snapshots.lock().unwrap().push(RecipientSnapshot {
            id: Uuid::new_v4(),
            entries,
            created_at,
        });
        store
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.snapshots.lock().unwrap().len()
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn latest(&self) -> Result<Option<RecipientSnapshot>, sqlx::Error> {
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .iter()
            .max_by_key(|s| s.created_at)
            .cloned())
    }

    async fn insert(
        &self,
        entries: &[RawDirectoryEntry],
        created_at: DateTime<Utc>,
    ) -> Result<RecipientSnapshot, sqlx::Error> {
        if self.fail_writes {
            return Err(unavailable());
        }
        let snapshot = RecipientSnapshot {
            id: Uuid::new_v4(),
            entries: entries.to_vec(),
            created_at,
        };
        self.snapshots.lock().unwrap().push(snapshot.clone());
        Ok(snapshot)
    }
}

#[derive(Default)]
pub struct MemoryDeliveryStore {
    rows: Mutex<BTreeMap<i64, DeliveryRecord>>,
    failing: bool,
}

impl MemoryDeliveryStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn push(&self, mut record: DeliveryRecord) -> i64 {
        let mut rows = self.rows.lock().unwrap();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        record.id = id;
        rows.insert(id, record);
        id
    }

    /// Adds a delivery owned by an unrelated user whose email is `owner_email`.
    pub fn seed(
        &self,
        recipient: &str,
        owner_email: &str,
        status: DeliveryStatus,
        created_at: DateTime<Utc>,
    ) -> i64 {
        self.push(record(
            Uuid::new_v4(),
            owner_email,
            recipient,
            status,
            created_at,
        ))
    }

    pub fn seed_owned(&self, caller: &Caller, status: DeliveryStatus, created_at: DateTime<Utc>) -> i64 {
        self.push(record(
            caller.user_id,
            &caller.email,
            "recipient@x.com",
            status,
            created_at,
        ))
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn status_of(&self, id: i64) -> Option<DeliveryStatus> {
        self.rows.lock().unwrap().get(&id).map(|r| r.status)
    }

    pub fn reminders_sent(&self, id: i64) -> Option<i32> {
        self.rows.lock().unwrap().get(&id).map(|r| r.reminders_sent)
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.failing {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

fn record(
    user_id: Uuid,
    owner_email: &str,
    recipient: &str,
    status: DeliveryStatus,
    created_at: DateTime<Utc>,
) -> DeliveryRecord {
    DeliveryRecord {
        id: 0,
        user_id,
        owner_email: Some(owner_email.to_string()),
        recipient_email: recipient.to_string(),
        place: "Front desk".to_string(),
        notes: None,
        status,
        reminders_sent: 0,
        created_at,
        completed_at: (status == DeliveryStatus::Completed).then_some(created_at),
    }
}

fn contains(haystack: Option<&str>, needle: &Option<String>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack.is_some_and(|h| h.to_lowercase().contains(needle.as_str())),
    }
}

fn matches(record: &DeliveryRecord, query: &DeliveryQuery) -> bool {
    let filter = &query.filter;
    record.created_at <= query.as_of
        && contains(Some(&record.recipient_email), &filter.recipient)
        && contains(record.owner_email.as_deref(), &filter.sender)
        && (filter.statuses.is_empty() || filter.statuses.contains(&record.status))
        && filter.created_from.map_or(true, |from| record.created_at >= from)
        && filter.created_before.map_or(true, |before| record.created_at < before)
}

#[async_trait]
impl DeliveryStore for MemoryDeliveryStore {
    async fn insert(&self, new: NewDelivery) -> Result<DeliveryRecord, sqlx::Error> {
        self.check()?;
        let mut row = record(
            new.user_id,
            "",
            &new.recipient_email,
            DeliveryStatus::Pending,
            new.created_at,
        );
        row.owner_email = None;
        row.place = new.place;
        row.notes = new.notes;
        let id = self.push(row);
        Ok(self.rows.lock().unwrap()[&id].clone())
    }

    async fn get(&self, id: i64) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        self.check()?;
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn query(&self, query: &DeliveryQuery) -> Result<QueriedRows, sqlx::Error> {
        self.check()?;
        let mut hits: Vec<DeliveryRecord> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| matches(r, query))
            .cloned()
            .collect();
        hits.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = hits.len() as i64;
        let rows = hits
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(QueriedRows {
            rows,
            total: Some(total),
        })
    }

    async fn update_status(
        &self,
        id: i64,
        status: DeliveryStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<DeliveryRecord>, sqlx::Error> {
        self.check()?;
        let mut rows = self.rows.lock().unwrap();
        Ok(rows.get_mut(&id).map(|r| {
            r.status = status;
            r.completed_at = (status == DeliveryStatus::Completed).then_some(now);
            r.clone()
        }))
    }

    async fn list_pending(&self) -> Result<Vec<DeliveryRecord>, sqlx::Error> {
        self.check()?;
        let mut pending: Vec<DeliveryRecord> = self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == DeliveryStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(pending)
    }

    async fn increment_reminders(&self, id: i64) -> Result<(), sqlx::Error> {
        self.check()?;
        if let Some(r) = self.rows.lock().unwrap().get_mut(&id) {
            r.reminders_sent += 1;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryReminderStore {
    logs: Mutex<Vec<ReminderLog>>,
}

impl MemoryReminderStore {
    pub fn seed(&self, delivery_id: i64, ok: bool, send_at: DateTime<Utc>) {
        let mut logs = self.logs.lock().unwrap();
        let id = logs.len() as i64 + 1;
        logs.push(ReminderLog {
            id,
            delivery_id,
            ok,
            message: if ok { "sent" } else { "failed" }.to_string(),
            send_at,
        });
    }

    pub fn count_for(&self, delivery_id: i64) -> usize {
        self.logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.delivery_id == delivery_id)
            .count()
    }

    fn newest_first(&self, delivery_id: i64) -> Vec<ReminderLog> {
        let mut logs: Vec<ReminderLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.delivery_id == delivery_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.send_at.cmp(&a.send_at).then(b.id.cmp(&a.id)));
        logs
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn latest_for(
        &self,
        delivery_id: i64,
        successful_only: bool,
    ) -> Result<Option<ReminderLog>, sqlx::Error> {
        Ok(self
            .newest_first(delivery_id)
            .into_iter()
            .find(|l| l.ok || !successful_only))
    }

    async fn append(
        &self,
        delivery_id: i64,
        ok: bool,
        message: &str,
        send_at: DateTime<Utc>,
    ) -> Result<ReminderLog, sqlx::Error> {
        let mut logs = self.logs.lock().unwrap();
        let log = ReminderLog {
            id: logs.len() as i64 + 1,
            delivery_id,
            ok,
            message: message.to_string(),
            send_at,
        };
        logs.push(log.clone());
        Ok(log)
    }

    async fn list_for(&self, delivery_id: i64) -> Result<Vec<ReminderLog>, sqlx::Error> {
        Ok(self.newest_first(delivery_id))
    }
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<Vec<Profile>>,
    preauthorized: Mutex<Vec<PreauthorizedEmail>>,
}

impl MemoryProfileStore {
    pub fn with_profile(caller: &Caller) -> Self {
        let store = Self::default();
        store.profiles.lock().unwrap().push(Profile {
            id: caller.user_id,
            email: caller.email.clone(),
            role: caller.role,
            created_at: Utc::now(),
        });
        store
    }

    pub fn preauthorized(&self) -> Vec<PreauthorizedEmail> {
        self.preauthorized.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find(&self, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Profile>, sqlx::Error> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    async fn list_preauthorized(&self) -> Result<Vec<PreauthorizedEmail>, sqlx::Error> {
        Ok(self.preauthorized())
    }

    async fn add_preauthorized(
        &self,
        email: &str,
        created_by: Uuid,
    ) -> Result<PreauthorizedEmail, sqlx::Error> {
        let mut rows = self.preauthorized.lock().unwrap();
        if let Some(existing) = rows.iter().find(|r| r.email == email) {
            return Ok(existing.clone());
        }
        let row = PreauthorizedEmail {
            email: email.to_string(),
            created_by: Some(created_by),
            created_at: Utc::now(),
        };
        rows.push(row.clone());
        Ok(row)
    }

    async fn remove_preauthorized(&self, email: &str) -> Result<bool, sqlx::Error> {
        let mut rows = self.preauthorized.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.email != email);
        Ok(rows.len() < before)
    }
}

pub fn test_config() -> crate::config::Config {
    crate::config::Config {
        database_url: "postgres://localhost/postroom_test".to_string(),
        auth_jwt_secret: "supersecretjwtsecretforunittesting123".to_string(),
        directory_api_url: "http://directory.invalid/people".to_string(),
        directory_api_key: "directory-key".to_string(),
        directory_items_path: "response.items.item".to_string(),
        mail_api_url: "http://mail.invalid/send".to_string(),
        mail_api_key: "mail-key".to_string(),
        mail_from: "no-reply@postroom.local".to_string(),
        cron_secret: Some("cron-secret".to_string()),
        recipient_cache_max_age_months: 1,
        reminder_throttle_days: 3,
        reminder_throttle_counts_failures: true,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

/// State backed by in-memory stores and mocks that expect no external calls.
pub fn test_state(profiles: MemoryProfileStore) -> crate::state::AppState {
    use std::sync::Arc;

    use crate::directory_client::MockDirectoryClient;
    use crate::recipients::cache::RecipientDirectory;
    use crate::reminders::dispatch::ReminderDispatcher;
    use crate::reminders::mailer::MockMailer;
    use crate::reminders::throttle::ThrottlePolicy;

    let deliveries = Arc::new(MemoryDeliveryStore::default());
    let reminder_logs = Arc::new(MemoryReminderStore::default());
    crate::state::AppState {
        config: test_config(),
        recipients: RecipientDirectory::new(
            Arc::new(MemorySnapshotStore::default()),
            Arc::new(MockDirectoryClient::new()),
            1,
        ),
        deliveries: deliveries.clone(),
        reminder_logs: reminder_logs.clone(),
        reminders: ReminderDispatcher::new(
            deliveries,
            reminder_logs,
            Arc::new(MockMailer::new()),
            ThrottlePolicy::default(),
        ),
        profiles: Arc::new(profiles),
    }
}
