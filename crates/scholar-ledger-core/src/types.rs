//! Strong type definitions for Scholar Ledger.
//!
//! Identities and record identifiers are newtypes so that a student address
//! can never be passed where a record id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::crypto::Ed25519PublicKey;

/// A 20-byte identity address.
///
/// Callers are identified by address. The all-zero address is the null
/// identity and is rejected wherever a real identity is required.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null identity.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Create an address from raw bytes.
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derive the address controlled by an Ed25519 public key.
    ///
    /// Takes the last 20 bytes of a domain-separated Blake3 hash of the key.
    pub fn from_public_key(public_key: &Ed25519PublicKey) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"scholar-ledger-address-v1:");
        hasher.update(public_key.as_bytes());
        let digest = hasher.finalize();
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&digest.as_bytes()[12..]);
        Self(arr)
    }

    /// Whether this is the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 20 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A 32-byte record identifier.
///
/// Record ids are supplied by the registering institution and must be
/// globally unique. [`RecordId::derive`] offers a collision-resistant way to
/// produce one, but the registry accepts any value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub [u8; 32]);

impl RecordId {
    /// The zero record id (sentinel).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create a new RecordId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derive a record id from the issuing institution, the student, and a
    /// caller-chosen nonce (e.g. a transcript serial number).
    pub fn derive(institution: &Address, student: &Address, nonce: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"scholar-ledger-record-v1:");
        hasher.update(&institution.0);
        hasher.update(&student.0);
        hasher.update(nonce);
        Self(*hasher.finalize().as_bytes())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for RecordId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for RecordId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for RecordId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    #[test]
    fn test_address_hex_accepts_prefix() {
        let addr = Address::from_bytes([0x11; 20]);
        let with_prefix = format!("{}", addr);
        assert!(with_prefix.starts_with("0x"));
        assert_eq!(Address::from_hex(&with_prefix).unwrap(), addr);
        assert_eq!(Address::from_hex(&addr.to_hex()).unwrap(), addr);
    }

    #[test]
    fn test_address_wrong_length_rejected() {
        assert!(Address::from_hex("abcd").is_err());
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::from_bytes([1; 20]).is_zero());
    }

    #[test]
    fn test_address_from_public_key_is_stable() {
        let kp = Keypair::from_seed(&[0x42; 32]);
        let a1 = Address::from_public_key(&kp.public_key());
        let a2 = Address::from_public_key(&kp.public_key());
        assert_eq!(a1, a2);
        assert!(!a1.is_zero());

        let other = Keypair::from_seed(&[0x43; 32]);
        assert_ne!(a1, Address::from_public_key(&other.public_key()));
    }

    #[test]
    fn test_record_id_derive_depends_on_every_input() {
        let inst = Address::from_bytes([1; 20]);
        let student = Address::from_bytes([2; 20]);
        let base = RecordId::derive(&inst, &student, b"2024-fall");

        assert_eq!(base, RecordId::derive(&inst, &student, b"2024-fall"));
        assert_ne!(base, RecordId::derive(&inst, &student, b"2025-spring"));
        assert_ne!(base, RecordId::derive(&student, &inst, b"2024-fall"));
    }

    #[test]
    fn test_record_id_display() {
        let id = RecordId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", id), "abababababababab");
        assert!(format!("{:?}", id).starts_with("RecordId("));
    }
}
