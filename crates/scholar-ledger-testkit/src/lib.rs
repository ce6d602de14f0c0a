//! # Scholar Ledger Testkit
//!
//! Testing utilities for Scholar Ledger.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a cast of named parties with deterministic keys, and a
//!   registry already initialized with an owner and one institution
//! - **Generators**: Proptest strategies for identities, ids and batches
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use scholar_ledger_testkit::fixtures::TestFixture;
//!
//! # async fn example() -> scholar_ledger::Result<()> {
//! let fixture = TestFixture::new();
//! let registry = fixture.memory_registry().await?;
//! let input = fixture.plain_input(1);
//! registry
//!     .register_batch_records(&fixture.institution.address(), vec![input])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use scholar_ledger_testkit::generators::unique_batch;
//!
//! proptest! {
//!     #[test]
//!     fn batch_ids_unique(batch in unique_batch(8)) {
//!         // ...
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{record_id, Party, TestFixture, FIXTURE_EPOCH_MS};
