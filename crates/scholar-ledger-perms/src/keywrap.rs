//! Wrapping a record's content key for one recipient.
//!
//! The `encrypted_key_institution`, `encrypted_key_student` and visitor key
//! blobs are CBOR-encoded [`WrappedKey`]s: an ephemeral X25519 public key,
//! a nonce, and the content key sealed under a wrap key derived from the
//! agreement and the record id. Binding the record id means a wrapped key
//! cannot be replayed against a different record.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use scholar_ledger_core::RecordId;

use crate::crypto::{ContentKey, Ephemeral, SealNonce, X25519PublicKey, X25519Secret};
use crate::error::{PermsError, Result};

/// A content key sealed for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    /// Sender's one-time X25519 public key.
    pub ephemeral_public: X25519PublicKey,

    pub nonce: SealNonce,

    /// The sealed 32-byte content key plus tag.
    pub sealed_key: Vec<u8>,
}

impl WrappedKey {
    /// Wrap `content_key` of `record_id` so only `recipient` can open it.
    pub fn seal(
        record_id: &RecordId,
        content_key: &ContentKey,
        recipient: &X25519PublicKey,
    ) -> Result<Self> {
        let ephemeral = Ephemeral::generate();
        let ephemeral_public = ephemeral.public_key();
        let wrap_key = ephemeral.agree(recipient).wrap_key(record_id.as_bytes());

        let nonce = SealNonce::generate();
        let sealed_key = wrap_key.seal(content_key.as_bytes(), &nonce)?;

        Ok(Self {
            ephemeral_public,
            nonce,
            sealed_key,
        })
    }

    /// Recover the content key with the recipient's secret.
    pub fn open(&self, record_id: &RecordId, recipient: &X25519Secret) -> Result<ContentKey> {
        let wrap_key = recipient
            .agree(&self.ephemeral_public)
            .wrap_key(record_id.as_bytes());
        let key_bytes = wrap_key.open(&self.sealed_key, &self.nonce)?;

        let key: [u8; 32] = key_bytes.as_slice().try_into().map_err(|_| {
            PermsError::DecryptionError(format!(
                "content key must be 32 bytes, got {}",
                key_bytes.len()
            ))
        })?;
        Ok(ContentKey::from_bytes(key))
    }

    /// Encode as the opaque blob stored by the registry.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::SerializationError(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    /// Decode a blob returned by the registry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: RecordId = RecordId::from_bytes([0x11; 32]);

    #[test]
    fn test_recipient_recovers_key() {
        let visitor = X25519Secret::generate();
        let content_key = ContentKey::generate();

        let wrapped = WrappedKey::seal(&RECORD, &content_key, &visitor.public_key()).unwrap();
        let blob = wrapped.to_bytes().unwrap();

        let opened = WrappedKey::from_bytes(&blob)
            .unwrap()
            .open(&RECORD, &visitor)
            .unwrap();
        assert_eq!(opened, content_key);
    }

    #[test]
    fn test_other_recipient_cannot_open() {
        let visitor = X25519Secret::generate();
        let stranger = X25519Secret::generate();

        let wrapped =
            WrappedKey::seal(&RECORD, &ContentKey::generate(), &visitor.public_key()).unwrap();
        assert!(wrapped.open(&RECORD, &stranger).is_err());
    }

    #[test]
    fn test_bound_to_record_id() {
        let visitor = X25519Secret::generate();
        let wrapped =
            WrappedKey::seal(&RECORD, &ContentKey::generate(), &visitor.public_key()).unwrap();

        let other = RecordId::from_bytes([0x22; 32]);
        assert!(matches!(
            wrapped.open(&other, &visitor),
            Err(PermsError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_garbage_blob_rejected() {
        assert!(matches!(
            WrappedKey::from_bytes(b"not cbor at all"),
            Err(PermsError::SerializationError(_))
        ));
    }
}
