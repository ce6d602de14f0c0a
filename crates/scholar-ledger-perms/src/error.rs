//! Error types for the permissions module.

use scholar_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission checks and key handling.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The caller lacks the role the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The null identity was supplied where a real identity is required.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The directory has no owner yet.
    #[error("directory not initialized")]
    NotInitialized,

    /// The directory already has an owner.
    #[error("directory already initialized")]
    AlreadyInitialized,

    /// A visitor access key must be non-empty.
    #[error("visitor access key is empty")]
    EmptyKey,

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error.
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
