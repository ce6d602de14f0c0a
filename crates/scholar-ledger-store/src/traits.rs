//! Store trait: the durable key-value surface the registry depends on.
//!
//! The registry never touches global state; everything it persists goes
//! through this trait. Implementations include SQLite (primary) and
//! in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use scholar_ledger_core::{Address, Record, RecordId};

use crate::error::Result;

/// Result of inserting a batch of records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    /// Every record was committed.
    Inserted {
        /// Number of records written.
        count: usize,
    },
    /// A record id already existed (in the store or earlier in the batch).
    /// Nothing was written.
    Duplicate {
        /// The first offending id, in input order.
        record_id: RecordId,
    },
}

/// The Store trait: async interface for registry persistence.
///
/// # Design Notes
///
/// - **Append-only records**: records are only ever inserted, never updated
///   or deleted.
/// - **Atomic batches**: [`Store::insert_records`] commits all records or
///   none, and re-checks uniqueness inside its own critical section.
/// - **Set-once owner**: [`Store::init_owner`] succeeds at most once.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Directory
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the directory owner, if initialized.
    async fn get_owner(&self) -> Result<Option<Address>>;

    /// Set the owner if none is set yet.
    ///
    /// Returns `false` (and changes nothing) when an owner already exists.
    async fn init_owner(&self, owner: &Address) -> Result<bool>;

    /// Check institution membership.
    async fn is_institution(&self, address: &Address) -> Result<bool>;

    /// Set or clear institution membership. Idempotent.
    async fn set_institution(&self, address: &Address, member: bool) -> Result<()>;

    /// List current institutions, sorted by address.
    async fn list_institutions(&self) -> Result<Vec<Address>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Records
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a batch of records atomically.
    ///
    /// # Returns
    /// - `Inserted` if every record was new and all were written.
    /// - `Duplicate` if any id already exists; the store is left unchanged.
    async fn insert_records(&self, records: &[Record]) -> Result<InsertResult>;

    /// Get a record by id.
    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>>;

    /// Check if a record exists.
    async fn has_record(&self, id: &RecordId) -> Result<bool>;

    /// Record ids owned by a student, in registration order.
    async fn records_by_student(&self, student: &Address) -> Result<Vec<RecordId>>;

    /// Record ids issued by an institution, in registration order.
    async fn records_by_institution(&self, institution: &Address) -> Result<Vec<RecordId>>;

    /// Total number of records.
    async fn record_count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Visitor access keys
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the access key for `(record, visitor)`, if any.
    async fn get_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<Option<Bytes>>;

    /// Set the access key for `(record, visitor)`, replacing any previous key.
    async fn put_visitor_key(&self, id: &RecordId, visitor: &Address, key: &Bytes) -> Result<()>;

    /// Remove the access key for `(record, visitor)`.
    ///
    /// Returns `true` if a key was present.
    async fn remove_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<bool>;

    /// Visitors holding a key for a record, sorted by address.
    async fn list_visitors(&self, id: &RecordId) -> Result<Vec<Address>>;

    /// Whether `visitor` holds a key for any record.
    async fn has_grants_for_visitor(&self, visitor: &Address) -> Result<bool>;
}
