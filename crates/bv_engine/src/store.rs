//! In-memory decrypted entry set.
//!
//! The authoritative view of the unlocked vault. Ordered most-recent-first:
//! new entries go to the head, loads are sorted by modification time before
//! they land here. All operations are synchronous; persistence is the sync
//! engine's job and happens before anything mutates this store.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::strength;
use bv_proto::{EntryPatch, SecuritySummary, Strength, VaultEntry};

#[derive(Default)]
pub struct EntryStore {
    entries: Vec<VaultEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole set, e.g. after an unlock load.
    pub fn replace_all(&mut self, entries: Vec<VaultEntry>) {
        self.entries = entries;
    }

    /// Insert a freshly persisted entry at the head of the view.
    pub fn insert(&mut self, entry: VaultEntry) {
        self.entries.insert(0, entry);
    }

    pub fn get(&self, id: &str) -> Option<&VaultEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[VaultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge a partial update into an existing entry. Strength is
    /// recomputed whenever the secret changes; the stored label is never
    /// trusted to stay valid across an edit.
    pub fn apply_update(
        &mut self,
        id: &str,
        patch: EntryPatch,
        last_modified: DateTime<Utc>,
    ) -> Result<VaultEntry, EngineError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound { id: id.to_string() })?;

        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(username) = patch.username {
            entry.username = username;
        }
        if let Some(secret) = patch.secret {
            entry.strength = strength::score(&secret).label;
            entry.secret = secret;
        }
        if let Some(url) = patch.url {
            entry.url = url;
        }
        if let Some(notes) = patch.notes {
            entry.notes = notes;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(compromised) = patch.compromised {
            entry.compromised = compromised;
        }
        entry.last_modified = last_modified;

        Ok(entry.clone())
    }

    pub fn remove(&mut self, id: &str) -> Result<VaultEntry, EngineError> {
        let position = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| EngineError::NotFound { id: id.to_string() })?;
        Ok(self.entries.remove(position))
    }

    /// Read-only projection: case-insensitive substring match over title,
    /// username, url and category (any match qualifies), further restricted
    /// to `category` when given. Store order is preserved; an empty query
    /// matches everything.
    pub fn filter(&self, query: &str, category: Option<&str>) -> Vec<VaultEntry> {
        let query = query.to_lowercase();
        self.entries
            .iter()
            .filter(|entry| {
                if let Some(wanted) = category {
                    if entry.category.as_deref() != Some(wanted) {
                        return false;
                    }
                }
                if query.is_empty() {
                    return true;
                }
                let opt_matches = |value: Option<&str>| {
                    value.map_or(false, |v| v.to_lowercase().contains(&query))
                };
                entry.title.to_lowercase().contains(&query)
                    || entry.username.to_lowercase().contains(&query)
                    || opt_matches(entry.url.as_deref())
                    || opt_matches(entry.category.as_deref())
            })
            .cloned()
            .collect()
    }

    /// Vault-wide health numbers. An entry counts as reused when its secret
    /// appears on two or more entries, so two sharers report a reused count
    /// of two. The divisor is floored at one; an empty vault scores 0.
    pub fn security_summary(&self) -> SecuritySummary {
        let weak_count = self
            .entries
            .iter()
            .filter(|e| e.strength == Strength::Weak)
            .count();
        let strong_count = self
            .entries
            .iter()
            .filter(|e| e.strength == Strength::Strong)
            .count();

        let mut by_secret: HashMap<&str, usize> = HashMap::new();
        for entry in &self.entries {
            *by_secret.entry(entry.secret.as_str()).or_insert(0) += 1;
        }
        let reused_count = self
            .entries
            .iter()
            .filter(|e| by_secret[e.secret.as_str()] > 1)
            .count();

        let total = self.entries.len().max(1) as f64;
        let unique = (self.entries.len() - reused_count) as f64;
        let score = ((strong_count as f64 / total) * 50.0 + (unique / total) * 50.0)
            .round()
            .clamp(0.0, 100.0) as u8;

        SecuritySummary {
            weak_count,
            reused_count,
            strong_count,
            score,
        }
    }

    /// Drop every decrypted entry. Called on lock transitions.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
