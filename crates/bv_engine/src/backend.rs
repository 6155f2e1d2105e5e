//! Collaborator interfaces implemented by the host application.
//!
//! The core never talks to an identity provider or a storage backend
//! directly; it consumes these traits. Implementations decide transport,
//! retries and timeouts. The engine's only requirements are the contracts
//! documented per method.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use bv_crypto::SALT_LEN;
use bv_proto::{NewRecord, RawRecord, RecordPatch, StoredMeta};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Hook invoked when the external identity session ends outside the
/// engine's control (token expiry, remote revocation). The engine registers
/// a forced lock here.
pub type SessionEndHook = Box<dyn Fn() + Send + Sync>;

/// External identity provider. The engine only ever consumes the opaque
/// user id; credentials pass through untouched.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, identity: &str, secret: &str) -> Result<String, BackendError>;

    async fn sign_up(&self, identity: &str, secret: &str) -> Result<String, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    fn on_session_end(&self, hook: SessionEndHook);
}

/// Persistence for the per-user KDF salt.
#[async_trait]
pub trait SaltStore: Send + Sync {
    /// Fetch the user's salt, if one has been provisioned.
    async fn get_salt(&self, user_id: &str) -> Result<Option<[u8; SALT_LEN]>, BackendError>;

    /// Persist the salt for a new user. Called exactly once per user; a
    /// salt is never regenerated for an existing user, since that would
    /// orphan every previously encrypted record.
    async fn create_salt(&self, user_id: &str, salt: [u8; SALT_LEN]) -> Result<(), BackendError>;
}

/// The remote encrypted collection. Records arrive and leave in the wire
/// representation of [`bv_proto::record`]; the backend never sees a key or
/// a plaintext sensitive field.
#[async_trait]
pub trait RemoteCollection: Send + Sync {
    async fn list(&self, user_id: &str) -> Result<Vec<RawRecord>, BackendError>;

    /// Insert a new record. The store assigns the id and the modification
    /// timestamp and returns both.
    async fn insert(&self, record: NewRecord) -> Result<StoredMeta, BackendError>;

    /// Apply a partial update and return the store-assigned modification
    /// timestamp. Conflicting writers resolve last-write-wins on that
    /// timestamp; no field-level merge happens anywhere.
    async fn update(&self, id: &str, patch: RecordPatch) -> Result<DateTime<Utc>, BackendError>;

    /// Delete a record. Deleting an id that is already gone may return
    /// `NotFound`; the engine treats that as success.
    async fn delete(&self, id: &str) -> Result<(), BackendError>;
}
