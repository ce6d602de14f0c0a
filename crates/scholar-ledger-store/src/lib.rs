//! # Scholar Ledger Store
//!
//! Storage abstraction for Scholar Ledger. Provides a trait-based interface
//! for record, directory and visitor-key persistence with SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`InsertResult`] - Result of inserting a batch of records
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholar_ledger_store::{SqliteStore, Store};
//!
//! async fn example() -> scholar_ledger_store::Result<()> {
//!     // Open a SQLite database
//!     let store = SqliteStore::open("registry.db")?;
//!
//!     // Or use an in-memory database for testing
//!     let store = SqliteStore::open_memory()?;
//!
//!     println!("{} records", store.record_count().await?);
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only records**: a record id, once written, is never rewritten
//! - **Atomic batches**: a batch with any duplicate id writes nothing
//! - **Mutable grants**: visitor keys are the only state that is overwritten or removed

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{InsertResult, Store};
