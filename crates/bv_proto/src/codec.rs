//! EncryptedPayload — the ciphertext + IV pair for one sensitive field.
//!
//! Both halves are base64 text (STANDARD alphabet) so they can be stored in
//! whatever schema the remote collection defines. Encoding is lossless: raw
//! bytes round-trip exactly. The IV is not secret but must be unique per
//! encryption operation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use base64::{engine::general_purpose::STANDARD, Engine as _};

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decrypted field is not valid UTF-8")]
    Utf8,
}

/// Ciphertext (with auth tag) and IV for one encrypted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// AEAD ciphertext + tag, base64.
    pub ciphertext: String,
    /// Per-operation random IV, base64. Never reused under the same key.
    pub iv: String,
}

impl EncryptedPayload {
    pub fn from_raw(ciphertext: &[u8], iv: &[u8]) -> Self {
        Self {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
        }
    }

    pub fn ciphertext_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(STANDARD.decode(&self.ciphertext)?)
    }

    pub fn iv_bytes(&self) -> Result<Vec<u8>, CodecError> {
        Ok(STANDARD.decode(&self.iv)?)
    }
}
