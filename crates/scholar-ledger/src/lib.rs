//! # Scholar Ledger
//!
//! An access-controlled registry of encrypted academic records.
//!
//! ## Overview
//!
//! - **Institutions** register batches of encrypted records for students
//! - **Students** decide which visitors receive a key to each record
//! - **The owner** decides which identities count as institutions
//!
//! Record ciphertext is public; only key distribution is gated. Records are
//! never edited or deleted once registered, and a record id can be used
//! only once.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scholar_ledger::{Address, Registry, RegistryConfig, RecordId, RecordInput};
//! use scholar_ledger::store::SqliteStore;
//!
//! async fn example() -> scholar_ledger::Result<()> {
//!     let owner = Address::from_bytes([1; 20]);
//!     let university = Address::from_bytes([2; 20]);
//!     let student = Address::from_bytes([3; 20]);
//!     let employer = Address::from_bytes([4; 20]);
//!
//!     let registry = Registry::new(SqliteStore::open("registry.db")?, RegistryConfig::default());
//!     registry.initialize(&owner).await?;
//!     registry.add_institution(&owner, &university).await?;
//!
//!     let id = RecordId::from_bytes([7; 32]);
//!     let entry = RecordInput::new(id, student)
//!         .encrypted_data(b"ciphertext".to_vec())
//!         .keys(b"key for university".to_vec(), b"key for student".to_vec());
//!     registry.register_batch_records(&university, vec![entry]).await?;
//!
//!     registry
//!         .grant_visitor_access(&student, &id, &employer, b"key for employer".to_vec())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `scholar_ledger::core` - Identities, records, events, signing bytes
//! - `scholar_ledger::store` - Storage abstraction and SQLite
//! - `scholar_ledger::perms` - Directory, access rules, key wrapping

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod registry;

// Re-export component crates
pub use scholar_ledger_core as core;
pub use scholar_ledger_perms as perms;
pub use scholar_ledger_store as store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use events::{ChannelSink, EventLog, EventSink};
pub use registry::Registry;

pub use scholar_ledger_core::{
    Address, Keypair, Record, RecordBatch, RecordId, RecordInput, RegistryEvent,
};
pub use scholar_ledger_perms::{Role, RoleSet};
