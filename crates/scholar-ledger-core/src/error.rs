//! Error types for Scholar Ledger core.

use thiserror::Error;

/// Errors raised by pure record and signing operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("batch columns have mismatched lengths: {0}")]
    LengthMismatch(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}
