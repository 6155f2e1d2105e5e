//! bv_engine — Bastion Vault core engine
//!
//! The engine owns everything between the host UI and the remote encrypted
//! collection: key lifecycle, the decrypted in-memory entry set, write-through
//! reconciliation, and secret health scoring. The host talks to a single
//! [`engine::VaultEngine`] and implements the collaborator traits in
//! [`backend`].
//!
//! # Module layout
//! - `backend`   — collaborator interfaces the host implements
//! - `engine`    — VaultEngine, the narrow API the host calls
//! - `error`     — unified error type
//! - `generator` — random credential generation
//! - `session`   — lock/unlock state machine with idle auto-lock
//! - `store`     — in-memory decrypted entry set and filtered views
//! - `strength`  — deterministic secret strength scoring
//! - `sync`      — reconciliation against the remote encrypted collection

pub mod backend;
pub mod engine;
pub mod error;
pub mod generator;
pub mod session;
pub mod store;
pub mod strength;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{AuthProvider, BackendError, RemoteCollection, SaltStore, SessionEndHook};
pub use engine::{EngineConfig, VaultEngine};
pub use error::EngineError;
pub use sync::{LoadFailure, LoadOutcome};
