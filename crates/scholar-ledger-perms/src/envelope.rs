//! Encrypted record envelope and the institution-side builder.
//!
//! An institution encrypts the credential once under a fresh content key,
//! then wraps that key for itself and for the student. A student later
//! grants a visitor access by wrapping the same content key for them.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use scholar_ledger_core::{sign_record_input, Address, Keypair, RecordId, RecordInput};

use crate::crypto::{ContentKey, SealNonce, X25519PublicKey};
use crate::error::{PermsError, Result};
use crate::keywrap::WrappedKey;

/// Cipher suite of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncryptionFormat {
    /// ChaCha20-Poly1305 with 256-bit key.
    ChaCha20Poly1305 = 1,
}

/// The `encrypted_data` blob of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub format: EncryptionFormat,
    pub nonce: SealNonce,
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    /// Encrypt a credential under `key`.
    pub fn encrypt(plaintext: &[u8], key: &ContentKey) -> Result<Self> {
        let nonce = SealNonce::generate();
        let ciphertext = key.seal(plaintext, &nonce)?;
        Ok(Self {
            format: EncryptionFormat::ChaCha20Poly1305,
            nonce,
            ciphertext,
        })
    }

    pub fn decrypt(&self, key: &ContentKey) -> Result<Vec<u8>> {
        match self.format {
            EncryptionFormat::ChaCha20Poly1305 => key.open(&self.ciphertext, &self.nonce),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| PermsError::SerializationError(e.to_string()))?;
        Ok(Bytes::from(buf))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| PermsError::SerializationError(e.to_string()))
    }
}

/// Builds a ready-to-register [`RecordInput`] from a plaintext credential.
pub struct EncryptedRecordBuilder {
    record_id: RecordId,
    student: Address,
    plaintext: Vec<u8>,
    content_key: ContentKey,
    policy: String,
}

impl EncryptedRecordBuilder {
    /// Start a record for `student` with a fresh content key.
    pub fn new(record_id: RecordId, student: Address, plaintext: impl Into<Vec<u8>>) -> Self {
        Self {
            record_id,
            student,
            plaintext: plaintext.into(),
            content_key: ContentKey::generate(),
            policy: String::new(),
        }
    }

    /// Set the policy descriptor carried in the input.
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// The content key. Keep it to wrap for visitors later.
    pub fn content_key(&self) -> &ContentKey {
        &self.content_key
    }

    /// Encrypt the credential and wrap the content key for both parties.
    ///
    /// `signature_institution` is left empty; see [`Self::build_signed`].
    pub fn build(
        &self,
        institution_key: &X25519PublicKey,
        student_key: &X25519PublicKey,
    ) -> Result<RecordInput> {
        let envelope = EncryptedRecord::encrypt(&self.plaintext, &self.content_key)?;
        let key_institution = WrappedKey::seal(&self.record_id, &self.content_key, institution_key)?;
        let key_student = WrappedKey::seal(&self.record_id, &self.content_key, student_key)?;

        Ok(RecordInput::new(self.record_id, self.student)
            .encrypted_data(envelope.to_bytes()?)
            .keys(key_institution.to_bytes()?, key_student.to_bytes()?)
            .policy(self.policy.clone()))
    }

    /// Like [`Self::build`], then sign as the institution holding `signer`.
    pub fn build_signed(
        &self,
        signer: &Keypair,
        institution_key: &X25519PublicKey,
        student_key: &X25519PublicKey,
    ) -> Result<RecordInput> {
        Ok(sign_record_input(signer, self.build(institution_key, student_key)?))
    }
}

/// Produce the `encrypted_key_visitor` blob for a grant.
pub fn wrap_for_visitor(
    record_id: &RecordId,
    content_key: &ContentKey,
    visitor_key: &X25519PublicKey,
) -> Result<Bytes> {
    WrappedKey::seal(record_id, content_key, visitor_key)?.to_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::X25519Secret;
    use scholar_ledger_core::verify_record_signature;

    const RECORD: RecordId = RecordId::from_bytes([3; 32]);
    const STUDENT: Address = Address::from_bytes([4; 20]);

    #[test]
    fn test_student_decrypts_built_record() {
        let institution = X25519Secret::generate();
        let student = X25519Secret::generate();

        let input = EncryptedRecordBuilder::new(RECORD, STUDENT, b"transcript".to_vec())
            .policy("student-consent")
            .build(&institution.public_key(), &student.public_key())
            .unwrap();
        assert_eq!(input.policy, "student-consent");
        assert!(input.signature_institution.is_empty());

        let key = WrappedKey::from_bytes(&input.encrypted_key_student)
            .unwrap()
            .open(&RECORD, &student)
            .unwrap();
        let envelope = EncryptedRecord::from_bytes(&input.encrypted_data).unwrap();
        assert_eq!(envelope.decrypt(&key).unwrap(), b"transcript");

        let inst_key = WrappedKey::from_bytes(&input.encrypted_key_institution)
            .unwrap()
            .open(&RECORD, &institution)
            .unwrap();
        assert_eq!(inst_key, key);
    }

    #[test]
    fn test_visitor_wrap() {
        let visitor = X25519Secret::generate();
        let builder = EncryptedRecordBuilder::new(RECORD, STUDENT, b"diploma".to_vec());

        let blob = wrap_for_visitor(&RECORD, builder.content_key(), &visitor.public_key()).unwrap();
        let key = WrappedKey::from_bytes(&blob).unwrap().open(&RECORD, &visitor).unwrap();
        assert_eq!(&key, builder.content_key());
    }

    #[test]
    fn test_signed_build_verifies() {
        let signer = Keypair::from_seed(&[9; 32]);
        let party = X25519Secret::generate();

        let input = EncryptedRecordBuilder::new(RECORD, STUDENT, b"grades".to_vec())
            .build_signed(&signer, &party.public_key(), &party.public_key())
            .unwrap();
        let record = input.into_record(signer.address(), 1);

        verify_record_signature(&record, &signer.public_key()).unwrap();
    }
}
