//! Records: immutable encrypted academic credentials.
//!
//! A [`Record`] is created once by an institution and never edited. Every
//! blob it carries is opaque to the registry.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{Address, RecordId};

/// A stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier, chosen by the institution.
    pub record_id: RecordId,

    /// The student the record belongs to. Set once.
    pub student_address: Address,

    /// The institution that registered the record. Set once.
    pub institution_address: Address,

    /// Opaque ciphertext of the credential.
    pub encrypted_data: Bytes,

    /// Content key wrapped for the institution.
    pub encrypted_key_institution: Bytes,

    /// Content key wrapped for the student.
    pub encrypted_key_student: Bytes,

    /// Institution signature, stored verbatim and never verified here.
    pub signature_institution: Bytes,

    /// Registration time (Unix milliseconds), assigned by the registry.
    pub timestamp: i64,
}

/// One entry of a registration batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordInput {
    pub record_id: RecordId,
    pub student_address: Address,
    pub encrypted_data: Bytes,
    pub encrypted_key_institution: Bytes,
    pub encrypted_key_student: Bytes,
    pub signature_institution: Bytes,

    /// Access policy descriptor.
    ///
    /// Accepted for interface compatibility and intentionally not persisted.
    pub policy: String,
}

impl RecordInput {
    /// Start an input for `record_id` owned by `student_address`, with empty blobs.
    pub fn new(record_id: RecordId, student_address: Address) -> Self {
        Self {
            record_id,
            student_address,
            encrypted_data: Bytes::new(),
            encrypted_key_institution: Bytes::new(),
            encrypted_key_student: Bytes::new(),
            signature_institution: Bytes::new(),
            policy: String::new(),
        }
    }

    /// Set the ciphertext.
    pub fn encrypted_data(mut self, data: impl Into<Bytes>) -> Self {
        self.encrypted_data = data.into();
        self
    }

    /// Set the institution and student key wraps.
    pub fn keys(mut self, institution: impl Into<Bytes>, student: impl Into<Bytes>) -> Self {
        self.encrypted_key_institution = institution.into();
        self.encrypted_key_student = student.into();
        self
    }

    /// Set the institution signature blob.
    pub fn signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.signature_institution = signature.into();
        self
    }

    /// Set the (ignored) policy descriptor.
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Materialize the stored record. `policy` is dropped here.
    pub fn into_record(self, institution_address: Address, timestamp: i64) -> Record {
        Record {
            record_id: self.record_id,
            student_address: self.student_address,
            institution_address,
            encrypted_data: self.encrypted_data,
            encrypted_key_institution: self.encrypted_key_institution,
            encrypted_key_student: self.encrypted_key_student,
            signature_institution: self.signature_institution,
            timestamp,
        }
    }
}

/// Column-oriented batch input: one parallel sequence per field.
///
/// This is the shape clients built against the array-based interface submit.
/// [`RecordBatch::into_inputs`] zips the columns and rejects unequal lengths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordBatch {
    pub record_ids: Vec<RecordId>,
    pub student_addresses: Vec<Address>,
    pub encrypted_data: Vec<Bytes>,
    pub encrypted_keys_institution: Vec<Bytes>,
    pub encrypted_keys_student: Vec<Bytes>,
    pub signatures_institution: Vec<Bytes>,
    pub policies: Vec<String>,
}

impl RecordBatch {
    /// Zip the columns into per-record inputs.
    pub fn into_inputs(self) -> Result<Vec<RecordInput>, CoreError> {
        let expected = self.record_ids.len();
        let lengths = [
            ("student_addresses", self.student_addresses.len()),
            ("encrypted_data", self.encrypted_data.len()),
            ("encrypted_keys_institution", self.encrypted_keys_institution.len()),
            ("encrypted_keys_student", self.encrypted_keys_student.len()),
            ("signatures_institution", self.signatures_institution.len()),
            ("policies", self.policies.len()),
        ];
        if let Some((column, len)) = lengths.iter().find(|(_, len)| *len != expected) {
            return Err(CoreError::LengthMismatch(format!(
                "{} has {} entries, record_ids has {}",
                column, len, expected
            )));
        }

        let inputs = self
            .record_ids
            .into_iter()
            .zip(self.student_addresses)
            .zip(self.encrypted_data)
            .zip(self.encrypted_keys_institution)
            .zip(self.encrypted_keys_student)
            .zip(self.signatures_institution)
            .zip(self.policies)
            .map(
                |((((((record_id, student_address), data), key_inst), key_student), sig), policy)| {
                    RecordInput {
                        record_id,
                        student_address,
                        encrypted_data: data,
                        encrypted_key_institution: key_inst,
                        encrypted_key_student: key_student,
                        signature_institution: sig,
                        policy,
                    }
                },
            )
            .collect();

        Ok(inputs)
    }
}

impl From<Vec<RecordInput>> for RecordBatch {
    fn from(inputs: Vec<RecordInput>) -> Self {
        let mut batch = RecordBatch::default();
        for input in inputs {
            batch.record_ids.push(input.record_id);
            batch.student_addresses.push(input.student_address);
            batch.encrypted_data.push(input.encrypted_data);
            batch.encrypted_keys_institution.push(input.encrypted_key_institution);
            batch.encrypted_keys_student.push(input.encrypted_key_student);
            batch.signatures_institution.push(input.signature_institution);
            batch.policies.push(input.policy);
        }
        batch
    }
}
