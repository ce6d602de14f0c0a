//! Key agreement and symmetric encryption for client-side tooling.
//!
//! X25519 for agreeing on wrap keys, ChaCha20-Poly1305 for sealing content
//! and content keys. The registry itself never calls into this module.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{PermsError, Result};

/// Derivation context for key-wrapping keys.
const WRAP_KEY_CONTEXT: &str = "scholar-ledger 2024 record key wrap v1";

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

/// An X25519 public key: what a student, institution or visitor publishes
/// so others can wrap record keys for them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct X25519PublicKey(pub [u8; 32]);

impl X25519PublicKey {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn to_dalek(self) -> PublicKey {
        PublicKey::from(self.0)
    }
}

impl fmt::Debug for X25519PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Pub(")?;
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

impl From<PublicKey> for X25519PublicKey {
    fn from(pk: PublicKey) -> Self {
        Self(*pk.as_bytes())
    }
}

/// A long-lived X25519 secret held by a key recipient.
pub struct X25519Secret(StaticSecret);

impl X25519Secret {
    pub fn generate() -> Self {
        Self(StaticSecret::from(random_bytes::<32>()))
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from(PublicKey::from(&self.0))
    }

    pub(crate) fn agree(&self, peer: &X25519PublicKey) -> SharedSecret {
        SharedSecret(*self.0.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}

impl fmt::Debug for X25519Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "X25519Secret({:?})", self.public_key())
    }
}

/// Single-use sender side of an X25519 agreement.
pub(crate) struct Ephemeral {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl Ephemeral {
    pub(crate) fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from(PublicKey::from(&secret));
        Self { secret, public }
    }

    pub(crate) fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    pub(crate) fn agree(self, peer: &X25519PublicKey) -> SharedSecret {
        SharedSecret(*self.secret.diffie_hellman(&peer.to_dalek()).as_bytes())
    }
}

/// Raw X25519 output. Never used as a key directly.
pub(crate) struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Derive the wrap key bound to one record.
    pub(crate) fn wrap_key(&self, context: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(WRAP_KEY_CONTEXT);
        hasher.update(&self.0);
        hasher.update(context);
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit ChaCha20-Poly1305 key.
///
/// Used both as the per-record content key and as a wrap key.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn generate() -> Self {
        Self(random_bytes::<32>())
    }

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn cipher(&self) -> ChaCha20Poly1305 {
        ChaCha20Poly1305::new(Key::from_slice(&self.0))
    }

    /// Seal `plaintext` under `nonce`. The output carries the auth tag.
    pub fn seal(&self, plaintext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        self.cipher()
            .encrypt(Nonce::from_slice(&nonce.0), plaintext)
            .map_err(|e| PermsError::EncryptionError(e.to_string()))
    }

    /// Open a sealed message. Fails on any tampering or wrong key.
    pub fn open(&self, ciphertext: &[u8], nonce: &SealNonce) -> Result<Vec<u8>> {
        self.cipher()
            .decrypt(Nonce::from_slice(&nonce.0), ciphertext)
            .map_err(|e| PermsError::DecryptionError(e.to_string()))
    }
}

impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}

/// A 96-bit ChaCha20-Poly1305 nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealNonce(pub [u8; 12]);

impl SealNonce {
    pub fn generate() -> Self {
        Self(random_bytes::<12>())
    }

    pub const fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_and_ephemeral_agree() {
        let recipient = X25519Secret::generate();
        let sender = Ephemeral::generate();
        let sender_public = sender.public_key();

        let a = sender.agree(&recipient.public_key());
        let b = recipient.agree(&sender_public);
        assert_eq!(a.0, b.0);
    }

    #[test]
    fn test_seal_open() {
        let key = ContentKey::generate();
        let nonce = SealNonce::generate();

        let sealed = key.seal(b"B.Sc. Physics, 2021", &nonce).unwrap();
        assert_ne!(&sealed[..], b"B.Sc. Physics, 2021");
        assert_eq!(key.open(&sealed, &nonce).unwrap(), b"B.Sc. Physics, 2021");
    }

    #[test]
    fn test_open_with_wrong_key_fails() {
        let nonce = SealNonce::generate();
        let sealed = ContentKey::generate().seal(b"secret", &nonce).unwrap();
        assert!(matches!(
            ContentKey::generate().open(&sealed, &nonce),
            Err(PermsError::DecryptionError(_))
        ));
    }

    #[test]
    fn test_wrap_key_bound_to_context() {
        let shared = SharedSecret([0x42; 32]);
        assert_eq!(shared.wrap_key(b"r1"), shared.wrap_key(b"r1"));
        assert_ne!(shared.wrap_key(b"r1"), shared.wrap_key(b"r2"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let key = ContentKey::from_bytes([7; 32]);
        assert_eq!(format!("{:?}", key), "ContentKey(..)");
    }
}
