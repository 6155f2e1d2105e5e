//! bv_crypto — Bastion Vault cryptographic primitives
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Zeroize all secret material on drop.
//! - Public APIs return opaque newtypes to prevent accidental misuse.
//!
//! # Module layout
//! - `kdf`   — Argon2id passphrase-to-key derivation + salt generation
//! - `aead`  — AES-256-GCM encrypt/decrypt for individual vault fields
//! - `error` — unified error type

pub mod aead;
pub mod error;
pub mod kdf;

pub use error::CryptoError;
pub use kdf::{DerivedKey, KEY_LEN, SALT_LEN};
