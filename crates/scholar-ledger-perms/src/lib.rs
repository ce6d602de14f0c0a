//! # Scholar Ledger Permissions
//!
//! Who may do what, and the client-side key handling that makes a grant
//! meaningful.
//!
//! ## Directory and roles
//!
//! The [`Directory`] holds a set-once owner and a set of institutions.
//! The owner adds and removes institutions; institutions register records.
//! Students and visitors are implicit: a student is whoever a record names,
//! a visitor is whoever a student has granted access.
//!
//! ## Visitor access
//!
//! [`AccessGrant::authorize`] and [`authorize_revoke`] encode the rule that
//! only a record's student controls who gets its key.
//!
//! ## Encryption model
//!
//! The registry stores opaque blobs. Clients produce them with:
//!
//! 1. **Content key**: a ChaCha20-Poly1305 key encrypting the credential
//!    ([`EncryptedRecord`])
//! 2. **Wrapped keys**: the content key sealed per recipient via ephemeral
//!    X25519 agreement ([`WrappedKey`])
//!
//! ```rust,no_run
//! use scholar_ledger_core::{Address, RecordId};
//! use scholar_ledger_perms::{wrap_for_visitor, EncryptedRecordBuilder, X25519Secret};
//!
//! # fn main() -> scholar_ledger_perms::Result<()> {
//! let institution = X25519Secret::generate();
//! let student = X25519Secret::generate();
//! let visitor = X25519Secret::generate();
//! let record_id = RecordId::from_bytes([1; 32]);
//!
//! let builder = EncryptedRecordBuilder::new(record_id, Address::from_bytes([2; 20]), "transcript");
//! let input = builder.build(&institution.public_key(), &student.public_key())?;
//!
//! // Later, the student shares access:
//! let visitor_blob = wrap_for_visitor(&record_id, builder.content_key(), &visitor.public_key())?;
//! # let _ = (input, visitor_blob);
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod grant;
pub mod keywrap;
pub mod role;

pub use crypto::{ContentKey, SealNonce, X25519PublicKey, X25519Secret};
pub use directory::{require_identity, Directory};
pub use envelope::{wrap_for_visitor, EncryptedRecord, EncryptedRecordBuilder, EncryptionFormat};
pub use error::{PermsError, Result};
pub use grant::{authorize_revoke, authorize_student, AccessGrant};
pub use keywrap::WrappedKey;
pub use role::{Role, RoleSet};
