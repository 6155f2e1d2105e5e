//! On-wire record representation — what the remote collection sees.
//!
//! The remote store is untrusted with field contents: `username`, `secret`
//! and `notes` travel as per-field ciphertext (each under its own IV).
//! `title`, `url`, `category`, `strength` and `compromised` are plaintext
//! metadata so the collection can list and sort records without the key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::EncryptedPayload;
use crate::entry::Strength;

/// A sensitive field as stored remotely.
///
/// `Absent` means the entry has no value for this field. This is distinct
/// from an encrypted empty string, and from a field that failed to encrypt:
/// there is no "null ciphertext" state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretField {
    Encrypted(EncryptedPayload),
    Absent,
}

impl SecretField {
    pub fn as_encrypted(&self) -> Option<&EncryptedPayload> {
        match self {
            Self::Encrypted(payload) => Some(payload),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// A record as submitted for insertion. The remote store assigns the id and
/// the modification timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    pub user_id: String,
    pub title: String,
    pub username: SecretField,
    pub secret: SecretField,
    pub notes: SecretField,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub strength: Strength,
    #[serde(default)]
    pub compromised: bool,
}

/// A stored record, as returned by the remote collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: String,
    /// Stamped by the store on every accepted write. Conflict resolution is
    /// last-write-wins on this value; it is never client-supplied.
    pub last_modified: DateTime<Utc>,
    #[serde(flatten)]
    pub record: NewRecord,
}

/// Partial remote update. Only present fields are written; the store leaves
/// the rest untouched and stamps a fresh modification timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<SecretField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<SecretField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<SecretField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strength: Option<Strength>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compromised: Option<bool>,
}

/// Store-assigned metadata returned on an accepted insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMeta {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}
