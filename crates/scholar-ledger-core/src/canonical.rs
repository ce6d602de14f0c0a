//! Canonical signing bytes for records.
//!
//! Institutions sign a deterministic CBOR encoding (RFC 8949 core
//! deterministic rules) of the record's identity fields and blobs:
//! - Map keys are small integers, written in ascending order
//! - Integers and lengths use the smallest valid encoding
//! - Definite lengths only
//!
//! The registry-assigned timestamp is not covered: the signature is produced
//! before the record is submitted.

use crate::crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
use crate::error::CoreError;
use crate::record::{Record, RecordInput};
use crate::types::{Address, RecordId};

/// Domain separation prefix for record signatures.
pub const SIGN_DOMAIN: &[u8] = b"scholar-ledger-record-sig-v1\x00";

/// Version of the signing layout.
pub const SIGNING_VERSION: u64 = 1;

/// Field keys (integer keys for compact encoding).
mod keys {
    pub const VERSION: u64 = 0;
    pub const RECORD_ID: u64 = 1;
    pub const STUDENT: u64 = 2;
    pub const INSTITUTION: u64 = 3;
    pub const ENCRYPTED_DATA: u64 = 4;
    pub const KEY_INSTITUTION: u64 = 5;
    pub const KEY_STUDENT: u64 = 6;
}

/// The fields covered by an institution signature.
#[derive(Debug, Clone, Copy)]
pub struct SignedFields<'a> {
    pub record_id: &'a RecordId,
    pub student: &'a Address,
    pub institution: &'a Address,
    pub encrypted_data: &'a [u8],
    pub encrypted_key_institution: &'a [u8],
    pub encrypted_key_student: &'a [u8],
}

impl<'a> SignedFields<'a> {
    /// Fields of an input about to be registered by `institution`.
    pub fn from_input(input: &'a RecordInput, institution: &'a Address) -> Self {
        Self {
            record_id: &input.record_id,
            student: &input.student_address,
            institution,
            encrypted_data: &input.encrypted_data,
            encrypted_key_institution: &input.encrypted_key_institution,
            encrypted_key_student: &input.encrypted_key_student,
        }
    }

    /// Fields of a stored record.
    pub fn from_record(record: &'a Record) -> Self {
        Self {
            record_id: &record.record_id,
            student: &record.student_address,
            institution: &record.institution_address,
            encrypted_data: &record.encrypted_data,
            encrypted_key_institution: &record.encrypted_key_institution,
            encrypted_key_student: &record.encrypted_key_student,
        }
    }
}

/// Encode the signed fields to canonical CBOR.
pub fn canonical_fields_bytes(fields: &SignedFields<'_>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        96 + fields.encrypted_data.len()
            + fields.encrypted_key_institution.len()
            + fields.encrypted_key_student.len(),
    );

    // Keys are 0..=6, all single-byte encodings, so ascending order is canonical.
    encode_uint(&mut buf, 5, 7);

    encode_uint(&mut buf, 0, keys::VERSION);
    encode_uint(&mut buf, 0, SIGNING_VERSION);

    encode_uint(&mut buf, 0, keys::RECORD_ID);
    encode_bytes(&mut buf, fields.record_id.as_bytes());

    encode_uint(&mut buf, 0, keys::STUDENT);
    encode_bytes(&mut buf, fields.student.as_bytes());

    encode_uint(&mut buf, 0, keys::INSTITUTION);
    encode_bytes(&mut buf, fields.institution.as_bytes());

    encode_uint(&mut buf, 0, keys::ENCRYPTED_DATA);
    encode_bytes(&mut buf, fields.encrypted_data);

    encode_uint(&mut buf, 0, keys::KEY_INSTITUTION);
    encode_bytes(&mut buf, fields.encrypted_key_institution);

    encode_uint(&mut buf, 0, keys::KEY_STUDENT);
    encode_bytes(&mut buf, fields.encrypted_key_student);

    buf
}

/// Construct the signed message: `SIGN_DOMAIN || canonical_fields_bytes`.
pub fn signing_message(fields: &SignedFields<'_>) -> Vec<u8> {
    let mut msg = SIGN_DOMAIN.to_vec();
    msg.extend_from_slice(&canonical_fields_bytes(fields));
    msg
}

/// Sign an input on behalf of the institution holding `keypair`, storing
/// the signature in `signature_institution`.
pub fn sign_record_input(keypair: &Keypair, mut input: RecordInput) -> RecordInput {
    let institution = keypair.address();
    let message = signing_message(&SignedFields::from_input(&input, &institution));
    let signature = keypair.sign(&message);
    input.signature_institution = signature.as_bytes().to_vec().into();
    input
}

/// Verify a stored record's institution signature.
///
/// Checks that `public_key` controls `institution_address` and that the
/// signature blob is a valid Ed25519 signature over the signed fields.
pub fn verify_record_signature(
    record: &Record,
    public_key: &Ed25519PublicKey,
) -> Result<(), CoreError> {
    if public_key.address() != record.institution_address {
        return Err(CoreError::InvalidPublicKey);
    }
    let signature = Ed25519Signature::from_slice(&record.signature_institution)?;
    let message = signing_message(&SignedFields::from_record(record));
    public_key.verify(&message, &signature)
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}
