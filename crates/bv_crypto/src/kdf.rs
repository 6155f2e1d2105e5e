//! Key derivation.
//!
//! `derive_key` — Argon2id, turns the master passphrase + per-user salt into
//! the 32-byte symmetric key used for all field encryption. Deterministic:
//! the same (passphrase, salt) pair always yields the same key, which is
//! what lets a returning user decrypt previously stored records.
//!
//! The derivation is deliberately slow (tens of milliseconds on desktop
//! hardware) as a brute-force deterrent. Callers with an interactive thread
//! should run it on a blocking pool.

use argon2::{Argon2, Params, Version};
use zeroize::ZeroizeOnDrop;

use crate::error::CryptoError;

/// Salt length in bytes. One salt per user, generated once at account
/// creation and never regenerated (a new salt would orphan all existing
/// ciphertext).
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// 32-byte vault key derived from the master passphrase. Zeroized on drop.
/// Never serialized, never logged.
#[derive(ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([redacted])")
    }
}

/// Argon2id parameters, tuned for interactive (desktop) use.
fn argon2_params() -> Params {
    Params::new(
        64 * 1024, // m_cost: 64 MiB
        3,         // t_cost: 3 iterations
        1,         // p_cost: 1 thread
        Some(KEY_LEN),
    )
    .expect("Static Argon2 params are always valid")
}

/// Derive the vault key from a master passphrase + 16-byte salt.
/// The salt is stored alongside the user record (not secret).
pub fn derive_key(passphrase: &str, salt: &[u8; SALT_LEN]) -> Result<DerivedKey, CryptoError> {
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, argon2_params());
    let mut output = [0u8; KEY_LEN];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(DerivedKey(output))
}

/// Generate a fresh random 16-byte salt (once per new user; persisted by the
/// host's salt store).
pub fn generate_salt() -> [u8; SALT_LEN] {
    use rand::RngCore;
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_deterministic() {
        let salt = [7u8; SALT_LEN];
        let key1 = derive_key("correct horse battery staple", &salt).unwrap();
        let key2 = derive_key("correct horse battery staple", &salt).unwrap();
        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.as_bytes().len(), KEY_LEN);
    }

    #[test]
    fn different_passphrases_differ() {
        let salt = [7u8; SALT_LEN];
        let key1 = derive_key("passphrase one", &salt).unwrap();
        let key2 = derive_key("passphrase two", &salt).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn different_salts_differ() {
        let key1 = derive_key("same passphrase", &[1u8; SALT_LEN]).unwrap();
        let key2 = derive_key("same passphrase", &[2u8; SALT_LEN]).unwrap();
        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn generated_salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
    }
}
