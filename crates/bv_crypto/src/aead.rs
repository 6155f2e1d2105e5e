//! Authenticated encryption of vault fields.
//!
//! AES-256-GCM. Key: 32 bytes. IV: 12 bytes, freshly random per call, never
//! reused under the same key (reuse would allow ciphertext comparison).
//! Tag: 16 bytes, appended to the ciphertext by the aes-gcm crate.
//!
//! Ciphertext and IV are returned separately; the caller persists both.
//! Neither is secret.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::{error::CryptoError, kdf::DerivedKey};

/// IV length for AES-GCM (96 bits).
pub const IV_LEN: usize = 12;

/// Encrypt `plaintext` under `key` with a freshly generated random IV.
/// `aad` — additional associated data (authenticated but not encrypted).
pub fn encrypt(
    key: &DerivedKey,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<(Vec<u8>, [u8; IV_LEN]), CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::AeadEncrypt)?;

    let mut iv = [0u8; IV_LEN];
    {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(&mut iv);
    }

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::AeadEncrypt)?;

    Ok((ciphertext, iv))
}

/// Decrypt `ciphertext` produced by [`encrypt`].
///
/// Fails with [`CryptoError::AeadDecrypt`] if the authentication tag does not
/// verify (tampered ciphertext, corrupted IV, or wrong key). Never returns
/// unauthenticated plaintext.
pub fn decrypt(
    key: &DerivedKey,
    ciphertext: &[u8],
    iv: &[u8],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != IV_LEN {
        return Err(CryptoError::AeadDecrypt);
    }
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::AeadDecrypt)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::AeadDecrypt)?;

    Ok(Zeroizing::new(plaintext))
}
