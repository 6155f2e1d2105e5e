//! Decrypted in-memory entry model.
//!
//! A `VaultEntry` holds plaintext sensitive fields and therefore exists only
//! in process memory while the session is unlocked. It deliberately does NOT
//! implement Serialize: the only serialized form of an entry is the
//! per-field-encrypted `record::RawRecord`. Debug output redacts the
//! sensitive fields so entries can appear in logs safely.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Strength classification of a secret. Stored as plaintext metadata on the
/// remote record (it reveals nothing about the secret's content).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
}

/// Result of scoring a secret: 0..=100 plus label and improvement hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrengthReport {
    pub score: u8,
    pub label: Strength,
    pub feedback: Vec<String>,
}

/// One credential record, decrypted.
#[derive(Clone)]
pub struct VaultEntry {
    /// Stable identifier assigned by the remote store on creation.
    pub id: String,
    /// Display name. Never encrypted (the remote lists records by title
    /// without needing the key).
    pub title: String,
    pub username: String,
    pub secret: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    /// Always recomputed from `secret` at save time, never trusted from
    /// caller input.
    pub strength: Strength,
    pub compromised: bool,
    /// Stamped by the remote store on every accepted write.
    pub last_modified: DateTime<Utc>,
}

impl std::fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &"[redacted]")
            .field("secret", &"[redacted]")
            .field("notes", &"[redacted]")
            .field("url", &self.url)
            .field("category", &self.category)
            .field("strength", &self.strength)
            .field("compromised", &self.compromised)
            .field("last_modified", &self.last_modified)
            .finish()
    }
}

/// A new entry as submitted by the host. Carries no id (the remote assigns
/// one) and no strength (the engine computes it).
#[derive(Clone, Default)]
pub struct EntryDraft {
    pub title: String,
    pub username: String,
    pub secret: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub category: Option<String>,
    pub compromised: bool,
}

impl std::fmt::Debug for EntryDraft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryDraft")
            .field("title", &self.title)
            .field("username", &"[redacted]")
            .field("secret", &"[redacted]")
            .finish_non_exhaustive()
    }
}

/// Partial update of an entry. `None` leaves a field untouched; `Some`
/// replaces it. For the optional fields (url, notes, category) the
/// replacement is wholesale, so `Some(None)` clears the field.
#[derive(Clone, Default)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub username: Option<String>,
    pub secret: Option<String>,
    pub url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub category: Option<Option<String>>,
    pub compromised: Option<bool>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.username.is_none()
            && self.secret.is_none()
            && self.url.is_none()
            && self.notes.is_none()
            && self.category.is_none()
            && self.compromised.is_none()
    }
}

impl std::fmt::Debug for EntryPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPatch")
            .field("title", &self.title)
            .field("username", &self.username.as_ref().map(|_| "[redacted]"))
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .field("notes", &self.notes.as_ref().map(|_| "[redacted]"))
            .finish_non_exhaustive()
    }
}

/// Vault-wide security health numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecuritySummary {
    pub weak_count: usize,
    pub reused_count: usize,
    pub strong_count: usize,
    /// 0..=100. An empty vault scores 0.
    pub score: u8,
}
