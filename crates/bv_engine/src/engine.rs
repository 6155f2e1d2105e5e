//! VaultEngine — the narrow API the host application calls.
//!
//! Composes the session guard, the entry store and the sync engine over the
//! host-provided collaborators. Everything sensitive flows through here:
//! unlock derives the key off the interactive path, edits persist remotely
//! before the local cache changes, and every access lazily enforces the
//! idle auto-lock.
//!
//! # Write ordering
//! A failed remote persist never mutates the local store, so local and
//! remote state cannot silently diverge; the host decides whether to retry
//! or drop the edit. Conversely, a persist that completes after a lock
//! transition discards its local half rather than resurrecting entries in a
//! cleared store (the remote copy is picked up by the next unlock).

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::info;
use zeroize::Zeroizing;

use crate::backend::{AuthProvider, BackendError, RemoteCollection, SaltStore};
use crate::error::{storage, EngineError};
use crate::session::{Clock, SessionGuard, SystemClock, DEFAULT_IDLE_TIMEOUT};
use crate::store::EntryStore;
use crate::strength;
use crate::sync::{LoadFailure, SyncEngine};
use bv_crypto::{kdf, CryptoError, SALT_LEN};
use bv_proto::{EntryDraft, EntryPatch, SecuritySummary, VaultEntry};

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Idle window after which the vault locks itself.
    pub idle_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

pub struct VaultEngine {
    auth: Arc<dyn AuthProvider>,
    salts: Arc<dyn SaltStore>,
    sync: Arc<SyncEngine>,
    session: Arc<SessionGuard>,
    store: Arc<RwLock<EntryStore>>,
}

impl VaultEngine {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        salts: Arc<dyn SaltStore>,
        remote: Arc<dyn RemoteCollection>,
        config: EngineConfig,
    ) -> Self {
        Self::with_clock(auth, salts, remote, config, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) but with an injected clock, so tests drive
    /// the idle timer without waiting on wall time.
    pub fn with_clock(
        auth: Arc<dyn AuthProvider>,
        salts: Arc<dyn SaltStore>,
        remote: Arc<dyn RemoteCollection>,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Arc::new(SessionGuard::new(config.idle_timeout, clock));
        let store = Arc::new(RwLock::new(EntryStore::new()));

        // The external identity session ending forces a lock.
        {
            let session = session.clone();
            let store = store.clone();
            auth.on_session_end(Box::new(move || {
                session.lock();
                store.write().clear();
            }));
        }

        Self {
            auth,
            salts,
            sync: Arc::new(SyncEngine::new(remote)),
            session,
            store,
        }
    }

    // ── Identity ─────────────────────────────────────────────────────────

    pub async fn sign_in(&self, identity: &str, secret: &str) -> Result<String, EngineError> {
        self.auth.sign_in(identity, secret).await.map_err(auth_err)
    }

    pub async fn sign_up(&self, identity: &str, secret: &str) -> Result<String, EngineError> {
        self.auth.sign_up(identity, secret).await.map_err(auth_err)
    }

    /// Sign out of the external session. Locks first, so the key is gone
    /// even if the provider call fails.
    pub async fn sign_out(&self) -> Result<(), EngineError> {
        self.lock();
        self.auth.sign_out().await.map_err(auth_err)
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Unlock the vault: fetch or provision the user's salt, derive the key
    /// on the blocking pool, then load and decrypt the remote records.
    ///
    /// Returns the per-record failures for records that could not be
    /// decrypted; those are excluded from the loaded set rather than
    /// aborting the unlock. A remote fetch failure locks again and
    /// surfaces the error, leaving no half-initialized session behind.
    pub async fn unlock(
        &self,
        user_id: &str,
        passphrase: &str,
    ) -> Result<Vec<LoadFailure>, EngineError> {
        let salt = self.ensure_salt(user_id).await?;
        let passphrase = Zeroizing::new(passphrase.to_string());
        let key = tokio::task::spawn_blocking(move || kdf::derive_key(&passphrase, &salt))
            .await
            .map_err(|e| {
                EngineError::Crypto(CryptoError::KeyDerivation(format!(
                    "derivation task failed: {e}"
                )))
            })??;

        let generation = self.session.unlock(key, user_id.to_string());

        let records = match self.sync.fetch(user_id).await {
            Ok(records) => records,
            Err(err) => {
                self.lock();
                return Err(err);
            }
        };

        let outcome = self
            .session
            .with_key(|key| self.sync.decrypt_records(key, records))?;

        let mut entries = outcome.entries;
        entries.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        info!(
            loaded = entries.len(),
            failed = outcome.failures.len(),
            "vault loaded"
        );

        let mut store = self.store.write();
        if self.session.generation() != generation {
            // A lock (or another unlock) superseded this load; discard it.
            return Err(EngineError::Locked);
        }
        store.replace_all(entries);
        Ok(outcome.failures)
    }

    /// Transition to Locked: zeroizes the key and clears the decrypted
    /// cache. Idempotent; concurrent calls collapse into one transition.
    pub fn lock(&self) {
        self.session.lock();
        self.store.write().clear();
    }

    pub fn is_locked(&self) -> bool {
        let locked = self.session.is_locked();
        if locked {
            self.store.write().clear();
        }
        locked
    }

    /// Forward a UI activity signal; resets the idle timer while unlocked.
    pub fn notify_activity(&self) {
        if !self.is_locked() {
            self.session.notify_activity();
        }
    }

    // ── Entries ──────────────────────────────────────────────────────────

    /// Create an entry: strength is computed here (never trusted from the
    /// caller), the record persists remotely first, and the store-assigned
    /// id comes back on the returned entry.
    pub async fn add_entry(&self, draft: EntryDraft) -> Result<VaultEntry, EngineError> {
        self.ensure_unlocked()?;
        let user_id = self.session.user_id()?;
        let generation = self.session.generation();

        let strength = strength::score(&draft.secret).label;
        let record = self
            .session
            .with_key(|key| self.sync.encrypt_new(key, &user_id, &draft, strength))??;
        let meta = self.sync.insert(record).await?;

        let entry = VaultEntry {
            id: meta.id,
            title: draft.title,
            username: draft.username,
            secret: draft.secret,
            url: draft.url,
            notes: draft.notes,
            category: draft.category,
            strength,
            compromised: draft.compromised,
            last_modified: meta.last_modified,
        };

        // Checked under the store guard so a lock transition cannot slip in
        // between the check and the insert.
        let mut store = self.store.write();
        if self.session.generation() != generation {
            // Locked while the insert was in flight. The remote has the
            // record and the next unlock will load it; the cleared local
            // store stays untouched.
            return Err(EngineError::Locked);
        }
        store.insert(entry.clone());
        Ok(entry)
    }

    /// Merge a partial update: sensitive fields re-encrypt under fresh IVs,
    /// the remote stamps the timestamp, and only then does the local entry
    /// change.
    pub async fn update_entry(
        &self,
        id: &str,
        patch: EntryPatch,
    ) -> Result<VaultEntry, EngineError> {
        self.ensure_unlocked()?;
        if self.store.read().get(id).is_none() {
            return Err(EngineError::NotFound { id: id.to_string() });
        }
        let generation = self.session.generation();

        let strength = patch.secret.as_deref().map(|s| strength::score(s).label);
        let record_patch = self
            .session
            .with_key(|key| self.sync.encrypt_patch(key, &patch, strength))??;
        let stamp = self.sync.update(id, record_patch).await?;

        let mut store = self.store.write();
        if self.session.generation() != generation {
            return Err(EngineError::Locked);
        }
        store.apply_update(id, patch, stamp)
    }

    pub async fn remove_entry(&self, id: &str) -> Result<(), EngineError> {
        self.ensure_unlocked()?;
        if self.store.read().get(id).is_none() {
            return Err(EngineError::NotFound { id: id.to_string() });
        }
        let generation = self.session.generation();

        self.sync.remove(id).await?;

        let mut store = self.store.write();
        if self.session.generation() != generation {
            return Err(EngineError::Locked);
        }
        store.remove(id)?;
        Ok(())
    }

    // ── Views ────────────────────────────────────────────────────────────

    pub fn entries(&self) -> Result<Vec<VaultEntry>, EngineError> {
        self.ensure_unlocked()?;
        Ok(self.store.read().entries().to_vec())
    }

    pub fn filter(&self, query: &str, category: Option<&str>) -> Result<Vec<VaultEntry>, EngineError> {
        self.ensure_unlocked()?;
        Ok(self.store.read().filter(query, category))
    }

    pub fn security_summary(&self) -> Result<SecuritySummary, EngineError> {
        self.ensure_unlocked()?;
        Ok(self.store.read().security_summary())
    }

    // ── Internal ─────────────────────────────────────────────────────────

    fn ensure_unlocked(&self) -> Result<(), EngineError> {
        if self.is_locked() {
            return Err(EngineError::Locked);
        }
        Ok(())
    }

    async fn ensure_salt(&self, user_id: &str) -> Result<[u8; SALT_LEN], EngineError> {
        if let Some(salt) = self
            .salts
            .get_salt(user_id)
            .await
            .map_err(|e| storage("get_salt", user_id, e))?
        {
            return Ok(salt);
        }
        // First unlock for this user: provision the one and only salt.
        let salt = kdf::generate_salt();
        self.salts
            .create_salt(user_id, salt)
            .await
            .map_err(|e| storage("create_salt", user_id, e))?;
        info!(user_id, "provisioned vault salt for new user");
        Ok(salt)
    }
}

fn auth_err(err: BackendError) -> EngineError {
    EngineError::Auth(err.to_string())
}
