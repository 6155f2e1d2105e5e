use thiserror::Error;

use crate::backend::BackendError;
use bv_crypto::CryptoError;
use bv_proto::CodecError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Vault is locked, unlock with the master passphrase first")]
    Locked,

    #[error("Entry not found: {id}")]
    NotFound { id: String },

    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// Remote collaborator failure. Carries the operation kind and the
    /// entry/user id it was acting on so the host can present a message.
    #[error("Storage error during {op} on {target}: {message}")]
    Storage {
        op: &'static str,
        target: String,
        message: String,
    },

    #[error("Record {id} is missing required field {field}")]
    MalformedRecord { id: String, field: &'static str },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub(crate) fn storage(op: &'static str, target: &str, err: BackendError) -> EngineError {
    EngineError::Storage {
        op,
        target: target.to_string(),
        message: err.to_string(),
    }
}
