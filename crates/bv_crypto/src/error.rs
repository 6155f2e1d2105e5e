use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (authentication tag mismatch, tampering or wrong key)")]
    AeadDecrypt,

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}
