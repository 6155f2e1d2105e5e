//! Session lifecycle: the lock/unlock state machine with idle auto-lock.
//!
//! The guard owns the derived key for the unlocked session's lifetime.
//! Locking drops the key (zeroize-on-drop) and bumps the session
//! generation, so in-flight work that captured the old generation discards
//! its result instead of touching fresh state.
//!
//! Idle expiry is evaluated lazily against an injectable clock: every key
//! access and every `is_locked` query checks the last-activity timestamp
//! first, so an expired session can never hand out the key. Tests drive the
//! clock directly instead of waiting on wall time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::EngineError;
use bv_crypto::DerivedKey;

/// Idle window after which the vault locks itself: five minutes without an
/// activity signal.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock, used outside tests.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct SessionInner {
    key: DerivedKey,
    user_id: String,
    last_activity: Instant,
}

pub struct SessionGuard {
    inner: RwLock<Option<SessionInner>>,
    clock: Arc<dyn Clock>,
    idle_timeout: Duration,
    generation: AtomicU64,
}

impl SessionGuard {
    pub fn new(idle_timeout: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(None),
            clock,
            idle_timeout,
            generation: AtomicU64::new(0),
        }
    }

    /// Install a freshly derived key, starting a new unlocked session and
    /// its idle timer. Returns the new session generation; async callers
    /// capture it and discard their result if it has moved on by the time
    /// they complete.
    pub fn unlock(&self, key: DerivedKey, user_id: String) -> u64 {
        let mut guard = self.inner.write();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *guard = Some(SessionInner {
            key,
            user_id,
            last_activity: self.clock.now(),
        });
        info!("vault unlocked");
        generation
    }

    /// Transition to Locked. Idempotent: concurrent callers collapse into a
    /// single transition, and the key is dropped (and zeroized) exactly
    /// once. Returns whether this call performed the transition.
    pub fn lock(&self) -> bool {
        let mut guard = self.inner.write();
        if guard.take().is_some() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            info!("vault locked");
            true
        } else {
            false
        }
    }

    /// Whether the session is locked, enforcing idle expiry as a side
    /// effect: an elapsed idle window locks (and zeroizes) before this
    /// returns.
    pub fn is_locked(&self) -> bool {
        {
            let guard = self.inner.read();
            match guard.as_ref() {
                None => return true,
                Some(inner) if !self.expired(inner) => return false,
                Some(_) => {}
            }
        }
        debug!("idle window elapsed, locking");
        self.lock();
        true
    }

    fn expired(&self, inner: &SessionInner) -> bool {
        self.clock
            .now()
            .saturating_duration_since(inner.last_activity)
            > self.idle_timeout
    }

    /// Reset the idle timer. No-op when locked: an activity signal never
    /// re-unlocks an expired session.
    pub fn notify_activity(&self) {
        if self.is_locked() {
            return;
        }
        let mut guard = self.inner.write();
        if let Some(inner) = guard.as_mut() {
            inner.last_activity = self.clock.now();
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn user_id(&self) -> Result<String, EngineError> {
        if self.is_locked() {
            return Err(EngineError::Locked);
        }
        let guard = self.inner.read();
        guard
            .as_ref()
            .map(|inner| inner.user_id.clone())
            .ok_or(EngineError::Locked)
    }

    /// Borrow the key for the duration of one synchronous encrypt/decrypt
    /// batch. The key never leaves this call; holding it across an await
    /// point is impossible by construction. Fails with `Locked` when the
    /// session is locked or the idle window has expired (expiry locks
    /// first, so a stale key is never handed out).
    pub fn with_key<R>(&self, f: impl FnOnce(&DerivedKey) -> R) -> Result<R, EngineError> {
        if self.is_locked() {
            return Err(EngineError::Locked);
        }
        let guard = self.inner.read();
        match guard.as_ref() {
            Some(inner) => Ok(f(&inner.key)),
            None => Err(EngineError::Locked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ManualClock;

    fn key() -> DerivedKey {
        DerivedKey::from_bytes([1u8; 32])
    }

    fn guard_with_clock() -> (SessionGuard, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let guard = SessionGuard::new(Duration::from_secs(300), clock.clone());
        (guard, clock)
    }

    #[test]
    fn starts_locked() {
        let (guard, _clock) = guard_with_clock();
        assert!(guard.is_locked());
        assert!(guard.with_key(|_| ()).is_err());
    }

    #[test]
    fn idle_window_elapsing_locks() {
        let (guard, clock) = guard_with_clock();
        guard.unlock(key(), "u1".into());
        assert!(!guard.is_locked());

        clock.advance(Duration::from_secs(301));
        assert!(guard.is_locked());
        assert!(matches!(guard.with_key(|_| ()), Err(EngineError::Locked)));
    }

    #[test]
    fn activity_resets_the_idle_timer() {
        let (guard, clock) = guard_with_clock();
        guard.unlock(key(), "u1".into());

        clock.advance(Duration::from_secs(250));
        guard.notify_activity();
        clock.advance(Duration::from_secs(250));
        assert!(!guard.is_locked());

        clock.advance(Duration::from_secs(301));
        assert!(guard.is_locked());
    }

    #[test]
    fn lock_is_a_single_collapsed_transition() {
        let (guard, _clock) = guard_with_clock();
        guard.unlock(key(), "u1".into());
        assert!(guard.lock());
        assert!(!guard.lock());
    }

    #[test]
    fn generation_moves_on_every_transition() {
        let (guard, _clock) = guard_with_clock();
        let g1 = guard.unlock(key(), "u1".into());
        guard.lock();
        let g2 = guard.unlock(key(), "u1".into());
        assert!(g2 > g1);
        assert_eq!(guard.generation(), g2);
    }

    #[test]
    fn activity_does_not_reanimate_an_expired_session() {
        let (guard, clock) = guard_with_clock();
        guard.unlock(key(), "u1".into());
        clock.advance(Duration::from_secs(301));
        guard.notify_activity();
        assert!(guard.is_locked());
    }
}
