//! Reconciliation between the in-memory store and the remote collection.
//!
//! # Encryption policy
//! `username`, `secret` and `notes` are encrypted individually, each under
//! its own fresh IV, before anything reaches the remote. `title`, `url`,
//! `category`, `strength` and `compromised` travel as plaintext metadata so
//! the collection can list records without the key.
//!
//! # Concurrency
//! Mutating calls for the same record id are serialized through a per-id
//! async mutex; the remote offers no optimistic-concurrency guarantees, so
//! at most one update per id may be in flight from this process. Different
//! ids proceed concurrently with no ordering between them.
//!
//! The crypto halves of each operation are synchronous, so callers borrow
//! the derived key only for the duration of a single encrypt/decrypt batch
//! and never across an await point.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::warn;

use crate::backend::{BackendError, RemoteCollection};
use crate::error::{storage, EngineError};
use bv_crypto::{aead, DerivedKey};
use bv_proto::{
    EncryptedPayload, EntryDraft, EntryPatch, NewRecord, RawRecord, RecordPatch, SecretField,
    StoredMeta, Strength, VaultEntry,
};

/// Domain separation for vault field encryption.
const FIELD_AAD: &[u8] = b"bv-field-v1";

/// One record that could not be decrypted during a load. The record is
/// excluded from the loaded set; everything else loads normally.
#[derive(Debug)]
pub struct LoadFailure {
    pub record_id: String,
    pub title: String,
    pub error: EngineError,
}

#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub entries: Vec<VaultEntry>,
    pub failures: Vec<LoadFailure>,
}

pub struct SyncEngine {
    remote: Arc<dyn RemoteCollection>,
    write_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SyncEngine {
    pub fn new(remote: Arc<dyn RemoteCollection>) -> Self {
        Self {
            remote,
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch every remote record for the user. No key required; decryption
    /// happens separately in [`decrypt_records`](Self::decrypt_records).
    pub async fn fetch(&self, user_id: &str) -> Result<Vec<RawRecord>, EngineError> {
        self.remote
            .list(user_id)
            .await
            .map_err(|e| storage("list", user_id, e))
    }

    /// Decrypt fetched records. A failure on one record is reported and
    /// that record excluded, rather than aborting the whole load: one
    /// corrupted legacy record must not block access to the rest of the
    /// vault.
    pub fn decrypt_records(&self, key: &DerivedKey, records: Vec<RawRecord>) -> LoadOutcome {
        let mut outcome = LoadOutcome::default();
        for record in records {
            match Self::decrypt_record(key, &record) {
                Ok(entry) => outcome.entries.push(entry),
                Err(error) => {
                    warn!(record_id = %record.id, %error, "skipping undecryptable record");
                    outcome.failures.push(LoadFailure {
                        record_id: record.id.clone(),
                        title: record.record.title.clone(),
                        error,
                    });
                }
            }
        }
        outcome
    }

    /// Encrypt a draft into a record ready for insertion.
    pub fn encrypt_new(
        &self,
        key: &DerivedKey,
        user_id: &str,
        draft: &EntryDraft,
        strength: Strength,
    ) -> Result<NewRecord, EngineError> {
        Ok(NewRecord {
            user_id: user_id.to_string(),
            title: draft.title.clone(),
            username: Self::encrypt_field(key, &draft.username)?,
            secret: Self::encrypt_field(key, &draft.secret)?,
            notes: Self::encrypt_opt_field(key, draft.notes.as_deref())?,
            url: draft.url.clone(),
            category: draft.category.clone(),
            strength,
            compromised: draft.compromised,
        })
    }

    /// Encrypt the sensitive fields present in a partial update. Fields not
    /// present in the patch are left untouched remotely.
    pub fn encrypt_patch(
        &self,
        key: &DerivedKey,
        patch: &EntryPatch,
        strength: Option<Strength>,
    ) -> Result<RecordPatch, EngineError> {
        Ok(RecordPatch {
            title: patch.title.clone(),
            username: patch
                .username
                .as_deref()
                .map(|v| Self::encrypt_field(key, v))
                .transpose()?,
            secret: patch
                .secret
                .as_deref()
                .map(|v| Self::encrypt_field(key, v))
                .transpose()?,
            notes: match &patch.notes {
                Some(value) => Some(Self::encrypt_opt_field(key, value.as_deref())?),
                None => None,
            },
            url: patch.url.clone(),
            category: patch.category.clone(),
            strength,
            compromised: patch.compromised,
        })
    }

    /// Write a new record through to the remote. Returns the store-assigned
    /// id and timestamp.
    pub async fn insert(&self, record: NewRecord) -> Result<StoredMeta, EngineError> {
        let target = record.user_id.clone();
        self.remote
            .insert(record)
            .await
            .map_err(|e| storage("insert", &target, e))
    }

    /// Apply a partial update remotely, serialized per record id. Returns
    /// the fresh store-assigned modification timestamp.
    pub async fn update(&self, id: &str, patch: RecordPatch) -> Result<DateTime<Utc>, EngineError> {
        let _guard = self.lock_for(id).await;
        self.remote.update(id, patch).await.map_err(|e| match e {
            BackendError::NotFound(_) => EngineError::NotFound { id: id.to_string() },
            other => storage("update", id, other),
        })
    }

    /// Delete a record remotely, serialized per record id. Idempotent:
    /// deleting an id that is already gone succeeds.
    pub async fn remove(&self, id: &str) -> Result<(), EngineError> {
        let _guard = self.lock_for(id).await;
        match self.remote.delete(id).await {
            Ok(()) | Err(BackendError::NotFound(_)) => Ok(()),
            Err(other) => Err(storage("delete", id, other)),
        }
    }

    async fn lock_for(&self, id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let cell = {
            let mut map = self.write_locks.lock();
            map.entry(id.to_string()).or_default().clone()
        };
        cell.lock_owned().await
    }

    fn encrypt_field(key: &DerivedKey, value: &str) -> Result<SecretField, EngineError> {
        let (ciphertext, iv) = aead::encrypt(key, value.as_bytes(), FIELD_AAD)?;
        Ok(SecretField::Encrypted(EncryptedPayload::from_raw(
            &ciphertext,
            &iv,
        )))
    }

    fn encrypt_opt_field(
        key: &DerivedKey,
        value: Option<&str>,
    ) -> Result<SecretField, EngineError> {
        match value {
            Some(value) => Self::encrypt_field(key, value),
            None => Ok(SecretField::Absent),
        }
    }

    fn decrypt_field(
        key: &DerivedKey,
        field: &SecretField,
    ) -> Result<Option<String>, EngineError> {
        match field {
            SecretField::Absent => Ok(None),
            SecretField::Encrypted(payload) => {
                let ciphertext = payload.ciphertext_bytes()?;
                let iv = payload.iv_bytes()?;
                let plaintext = aead::decrypt(key, &ciphertext, &iv, FIELD_AAD)?;
                let text = std::str::from_utf8(&plaintext)
                    .map_err(|_| EngineError::Codec(bv_proto::CodecError::Utf8))?;
                Ok(Some(text.to_string()))
            }
        }
    }

    fn decrypt_record(key: &DerivedKey, record: &RawRecord) -> Result<VaultEntry, EngineError> {
        let username = Self::decrypt_field(key, &record.record.username)?.ok_or_else(|| {
            EngineError::MalformedRecord {
                id: record.id.clone(),
                field: "username",
            }
        })?;
        let secret = Self::decrypt_field(key, &record.record.secret)?.ok_or_else(|| {
            EngineError::MalformedRecord {
                id: record.id.clone(),
                field: "secret",
            }
        })?;
        let notes = Self::decrypt_field(key, &record.record.notes)?;

        Ok(VaultEntry {
            id: record.id.clone(),
            title: record.record.title.clone(),
            username,
            secret,
            url: record.record.url.clone(),
            notes,
            category: record.record.category.clone(),
            strength: record.record.strength,
            compromised: record.record.compromised,
            last_modified: record.last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryRemote;
    use bv_crypto::kdf;

    fn key() -> DerivedKey {
        kdf::derive_key("test passphrase", &[5u8; 16]).unwrap()
    }

    fn engine_with_remote() -> (SyncEngine, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        (SyncEngine::new(remote.clone()), remote)
    }

    fn draft(title: &str) -> EntryDraft {
        EntryDraft {
            title: title.to_string(),
            username: "user@example.com".into(),
            secret: "hunter2".into(),
            notes: Some("spare key under the mat".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn write_through_and_load_back() {
        let (sync, _remote) = engine_with_remote();
        let key = key();

        let record = sync
            .encrypt_new(&key, "u1", &draft("GitHub"), Strength::Weak)
            .unwrap();
        // Nothing sensitive leaves in plaintext.
        let wire = serde_json::to_string(&record).unwrap();
        assert!(!wire.contains("hunter2"));
        assert!(!wire.contains("user@example.com"));
        assert!(!wire.contains("under the mat"));
        assert!(wire.contains("GitHub"));

        sync.insert(record).await.unwrap();

        let records = sync.fetch("u1").await.unwrap();
        let outcome = sync.decrypt_records(&key, records);
        assert_eq!(outcome.entries.len(), 1);
        assert!(outcome.failures.is_empty());
        let entry = &outcome.entries[0];
        assert_eq!(entry.secret, "hunter2");
        assert_eq!(entry.username, "user@example.com");
        assert_eq!(entry.notes.as_deref(), Some("spare key under the mat"));
    }

    #[tokio::test]
    async fn each_field_gets_its_own_iv() {
        let (sync, _remote) = engine_with_remote();
        let key = key();
        let mut draft = draft("GitHub");
        draft.username = "same value".into();
        draft.secret = "same value".into();

        let record = sync.encrypt_new(&key, "u1", &draft, Strength::Weak).unwrap();
        let username = record.username.as_encrypted().unwrap();
        let secret = record.secret.as_encrypted().unwrap();
        assert_ne!(username.iv, secret.iv);
        assert_ne!(username.ciphertext, secret.ciphertext);
    }

    #[tokio::test]
    async fn one_corrupt_record_does_not_abort_the_load() {
        let (sync, remote) = engine_with_remote();
        let key = key();

        for title in ["One", "Two", "Three"] {
            let record = sync
                .encrypt_new(&key, "u1", &draft(title), Strength::Weak)
                .unwrap();
            sync.insert(record).await.unwrap();
        }
        let corrupted_id = remote.corrupt_secret_of("Two");

        let records = sync.fetch("u1").await.unwrap();
        let outcome = sync.decrypt_records(&key, records);
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].record_id, corrupted_id);
        assert!(matches!(
            outcome.failures[0].error,
            EngineError::Crypto(bv_crypto::CryptoError::AeadDecrypt)
        ));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (sync, remote) = engine_with_remote();
        let key = key();
        let record = sync
            .encrypt_new(&key, "u1", &draft("GitHub"), Strength::Weak)
            .unwrap();
        let meta = sync.insert(record).await.unwrap();

        sync.remove(&meta.id).await.unwrap();
        // Second delete hits a missing record; still success.
        sync.remove(&meta.id).await.unwrap();
        assert!(remote.records.lock().is_empty());
    }

    #[tokio::test]
    async fn update_on_missing_record_is_not_found() {
        let (sync, _remote) = engine_with_remote();
        let result = sync.update("ghost", RecordPatch::default()).await;
        assert!(matches!(result, Err(EngineError::NotFound { .. })));
    }
}
