//! In-memory collaborator doubles shared by the engine tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::backend::{AuthProvider, BackendError, RemoteCollection, SaltStore, SessionEndHook};
use crate::session::Clock;
use bv_crypto::SALT_LEN;
use bv_proto::{EncryptedPayload, NewRecord, RawRecord, RecordPatch, SecretField, StoredMeta};

/// Test clock driven by hand; no wall-clock waits.
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// Identity provider double. Accepts any credentials except the secret
/// "wrong", and exposes the registered session-end hook for tests to fire.
pub struct MemoryAuth {
    hook: Mutex<Option<SessionEndHook>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            hook: Mutex::new(None),
        }
    }

    pub fn end_session(&self) {
        if let Some(hook) = &*self.hook.lock() {
            hook();
        }
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_in(&self, identity: &str, secret: &str) -> Result<String, BackendError> {
        if secret == "wrong" {
            return Err(BackendError::Rejected("bad credentials".into()));
        }
        Ok(format!("user-{identity}"))
    }

    async fn sign_up(&self, identity: &str, _secret: &str) -> Result<String, BackendError> {
        Ok(format!("user-{identity}"))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        Ok(())
    }

    fn on_session_end(&self, hook: SessionEndHook) {
        *self.hook.lock() = Some(hook);
    }
}

#[derive(Default)]
pub struct MemorySalts {
    salts: Mutex<HashMap<String, [u8; SALT_LEN]>>,
}

impl MemorySalts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_salt(&self, user_id: &str) -> bool {
        self.salts.lock().contains_key(user_id)
    }
}

#[async_trait]
impl SaltStore for MemorySalts {
    async fn get_salt(&self, user_id: &str) -> Result<Option<[u8; SALT_LEN]>, BackendError> {
        Ok(self.salts.lock().get(user_id).copied())
    }

    async fn create_salt(&self, user_id: &str, salt: [u8; SALT_LEN]) -> Result<(), BackendError> {
        let mut salts = self.salts.lock();
        if salts.contains_key(user_id) {
            return Err(BackendError::Rejected(format!(
                "salt already provisioned for {user_id}"
            )));
        }
        salts.insert(user_id.to_string(), salt);
        Ok(())
    }
}

/// Remote collection double with failure injection and concurrency probes.
pub struct MemoryRemote {
    pub records: Mutex<HashMap<String, RawRecord>>,
    next_id: AtomicUsize,
    /// When set, update calls fail with `Unavailable`.
    pub fail_updates: AtomicBool,
    /// When set, update calls park on this gate until notified.
    pub update_gate: Mutex<Option<Arc<Notify>>>,
    active_updates: AtomicUsize,
    pub max_concurrent_updates: AtomicUsize,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
            fail_updates: AtomicBool::new(false),
            update_gate: Mutex::new(None),
            active_updates: AtomicUsize::new(0),
            max_concurrent_updates: AtomicUsize::new(0),
        }
    }

    /// Replace the stored secret ciphertext of the record with the given
    /// title by garbage, returning the record id.
    pub fn corrupt_secret_of(&self, title: &str) -> String {
        let mut records = self.records.lock();
        let record = records
            .values_mut()
            .find(|r| r.record.title == title)
            .expect("record to corrupt");
        record.record.secret =
            SecretField::Encrypted(EncryptedPayload::from_raw(b"garbage", &[0u8; 12]));
        record.id.clone()
    }
}

#[async_trait]
impl RemoteCollection for MemoryRemote {
    async fn list(&self, user_id: &str) -> Result<Vec<RawRecord>, BackendError> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|r| r.record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, record: NewRecord) -> Result<StoredMeta, BackendError> {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let last_modified = Utc::now();
        self.records.lock().insert(
            id.clone(),
            RawRecord {
                id: id.clone(),
                last_modified,
                record,
            },
        );
        Ok(StoredMeta { id, last_modified })
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> Result<DateTime<Utc>, BackendError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("injected failure".into()));
        }

        let active = self.active_updates.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_updates
            .fetch_max(active, Ordering::SeqCst);

        let gate = self.update_gate.lock().clone();
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::time::sleep(Duration::from_millis(2)).await,
        }

        let result = {
            let mut records = self.records.lock();
            match records.get_mut(id) {
                None => Err(BackendError::NotFound(id.to_string())),
                Some(record) => {
                    if let Some(title) = patch.title {
                        record.record.title = title;
                    }
                    if let Some(username) = patch.username {
                        record.record.username = username;
                    }
                    if let Some(secret) = patch.secret {
                        record.record.secret = secret;
                    }
                    if let Some(notes) = patch.notes {
                        record.record.notes = notes;
                    }
                    if let Some(url) = patch.url {
                        record.record.url = url;
                    }
                    if let Some(category) = patch.category {
                        record.record.category = category;
                    }
                    if let Some(strength) = patch.strength {
                        record.record.strength = strength;
                    }
                    if let Some(compromised) = patch.compromised {
                        record.record.compromised = compromised;
                    }
                    let stamp = Utc::now();
                    record.last_modified = stamp;
                    Ok(stamp)
                }
            }
        };

        self.active_updates.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        match self.records.lock().remove(id) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound(id.to_string())),
        }
    }
}
