//! Error types for the registry.

use scholar_ledger_core::{Address, CoreError, RecordId};
use scholar_ledger_perms::PermsError;
use scholar_ledger_store::StoreError;
use thiserror::Error;

/// Errors that can occur during registry operations.
///
/// Every error aborts the whole operation: no state changes, no events.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The caller lacks the required role or ownership.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The zero address was supplied where a real identity is required.
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The record id is already registered, or repeated within the batch.
    #[error("duplicate record id: {0}")]
    DuplicateRecordId(RecordId),

    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("batch is empty")]
    EmptyBatch,

    /// Column-form batch with unequal column lengths.
    #[error("length mismatch: {0}")]
    LengthMismatch(String),

    #[error("batch of {size} records exceeds limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("visitor access key is empty")]
    EmptyKey,

    /// Revocation of a grant that does not exist.
    #[error("no active access for {visitor} on record {record_id}")]
    NoActiveAccess { record_id: RecordId, visitor: Address },

    #[error("directory not initialized")]
    NotInitialized,

    #[error("directory already initialized")]
    AlreadyInitialized,

    /// Client-side key handling failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(CoreError),
}

impl RegistryError {
    /// Stable category name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::Unauthorized(_) => "unauthorized",
            RegistryError::InvalidIdentity(_) => "invalid_identity",
            RegistryError::DuplicateRecordId(_) => "duplicate_record_id",
            RegistryError::RecordNotFound(_) => "record_not_found",
            RegistryError::EmptyBatch => "empty_batch",
            RegistryError::LengthMismatch(_) => "length_mismatch",
            RegistryError::BatchTooLarge { .. } => "batch_too_large",
            RegistryError::EmptyKey => "empty_key",
            RegistryError::NoActiveAccess { .. } => "no_active_access",
            RegistryError::NotInitialized => "not_initialized",
            RegistryError::AlreadyInitialized => "already_initialized",
            RegistryError::Crypto(_) => "crypto",
            RegistryError::Store(_) => "store",
            RegistryError::Core(_) => "core",
        }
    }
}

impl From<PermsError> for RegistryError {
    fn from(err: PermsError) -> Self {
        match err {
            PermsError::Unauthorized(msg) => RegistryError::Unauthorized(msg),
            PermsError::InvalidIdentity(msg) => RegistryError::InvalidIdentity(msg),
            PermsError::NotInitialized => RegistryError::NotInitialized,
            PermsError::AlreadyInitialized => RegistryError::AlreadyInitialized,
            PermsError::EmptyKey => RegistryError::EmptyKey,
            PermsError::Store(e) => RegistryError::Store(e),
            e @ (PermsError::EncryptionError(_)
            | PermsError::DecryptionError(_)
            | PermsError::SerializationError(_)) => RegistryError::Crypto(e.to_string()),
        }
    }
}

impl From<CoreError> for RegistryError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LengthMismatch(msg) => RegistryError::LengthMismatch(msg),
            other => RegistryError::Core(other),
        }
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
