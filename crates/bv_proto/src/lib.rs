//! bv_proto — Domain and wire types for Bastion Vault
//!
//! The remote collection only ever sees the types in `record`: plaintext
//! metadata plus per-field ciphertext. Decrypted entries (`entry`) exist in
//! process memory only and are never serialized by the core.
//!
//! # Modules
//! - `codec`  — EncryptedPayload (base64 ciphertext + IV) and its codec
//! - `entry`  — decrypted in-memory entry model and strength/summary types
//! - `record` — on-wire record representation (what the remote store sees)

pub mod codec;
pub mod entry;
pub mod record;

pub use codec::{CodecError, EncryptedPayload};
pub use entry::{EntryDraft, EntryPatch, SecuritySummary, Strength, StrengthReport, VaultEntry};
pub use record::{NewRecord, RawRecord, RecordPatch, SecretField, StoredMeta};
