//! # Scholar Ledger Core
//!
//! Pure primitives for Scholar Ledger: identities, records, events, and the
//! canonical bytes institutions sign.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Address`] - A 20-byte caller identity; [`Address::ZERO`] is the null identity
//! - [`RecordId`] - Caller-supplied, globally unique record identifier
//! - [`Record`] - An immutable encrypted academic record
//! - [`RecordInput`] / [`RecordBatch`] - Registration input, row or column form
//! - [`RegistryEvent`] - Notifications emitted after commits
//!
//! ## Signatures
//!
//! `signature_institution` is opaque to the registry. Institutions that want
//! verifiable records sign with [`sign_record_input`]; relying parties check
//! with [`verify_record_signature`]. See the [`canonical`] module.

pub mod canonical;
pub mod crypto;
pub mod error;
pub mod event;
pub mod record;
pub mod types;

pub use canonical::{sign_record_input, signing_message, verify_record_signature, SignedFields};
pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::CoreError;
pub use event::RegistryEvent;
pub use record::{Record, RecordBatch, RecordInput};
pub use types::{Address, RecordId};
