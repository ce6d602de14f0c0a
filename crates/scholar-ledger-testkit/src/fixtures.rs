//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use scholar_ledger::{EventLog, ManualClock, Registry, RegistryConfig, Result};
use scholar_ledger_core::{Address, Keypair, RecordId, RecordInput};
use scholar_ledger_perms::{
    wrap_for_visitor, ContentKey, EncryptedRecordBuilder, X25519PublicKey, X25519Secret,
};
use scholar_ledger_store::{MemoryStore, Store};

/// Time every fixture clock starts at (2023-11-14T22:13:20Z).
pub const FIXTURE_EPOCH_MS: i64 = 1_700_000_000_000;

/// One participant: a signing identity plus a key-agreement secret.
pub struct Party {
    pub name: &'static str,
    pub keypair: Keypair,
    pub x25519: X25519Secret,
}

impl Party {
    /// Create a party whose keys are derived from `seed`.
    pub fn from_seed(name: &'static str, seed: u8) -> Self {
        let mut x_seed = [seed; 32];
        x_seed[0] ^= 0xff;
        Self {
            name,
            keypair: Keypair::from_seed(&[seed; 32]),
            x25519: X25519Secret::from_bytes(x_seed),
        }
    }

    pub fn address(&self) -> Address {
        self.keypair.address()
    }

    pub fn x25519_public(&self) -> X25519PublicKey {
        self.x25519.public_key()
    }
}

/// A full cast for registry scenarios.
pub struct TestFixture {
    pub owner: Party,
    pub institution: Party,
    pub student: Party,
    pub visitor: Party,
    /// Holds no role anywhere.
    pub outsider: Party,
    pub clock: Arc<ManualClock>,
    /// Collects the events of every registry built from this fixture.
    pub events: Arc<EventLog>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            owner: Party::from_seed("owner", 1),
            institution: Party::from_seed("institution", 2),
            student: Party::from_seed("student", 3),
            visitor: Party::from_seed("visitor", 4),
            outsider: Party::from_seed("outsider", 5),
            clock: Arc::new(ManualClock::new(FIXTURE_EPOCH_MS)),
            events: Arc::new(EventLog::new()),
        }
    }

    /// A registry over `store` with the owner initialized and the
    /// institution registered, using the fixture clock and event log.
    pub async fn registry<S: Store>(&self, store: S) -> Result<Registry<S>> {
        self.registry_with(Arc::new(store), RegistryConfig::default()).await
    }

    /// Like [`Self::registry`], over a shared store with explicit config.
    pub async fn registry_with<S: Store>(
        &self,
        store: Arc<S>,
        config: RegistryConfig,
    ) -> Result<Registry<S>> {
        let registry = Registry::with_store(store, config)
            .with_clock(self.clock.clone())
            .with_event_sink(self.events.clone());
        registry.initialize(&self.owner.address()).await?;
        registry
            .add_institution(&self.owner.address(), &self.institution.address())
            .await?;
        Ok(registry)
    }

    /// A ready registry over a fresh [`MemoryStore`].
    pub async fn memory_registry(&self) -> Result<Registry<MemoryStore>> {
        self.registry(MemoryStore::new()).await
    }

    /// An input for the fixture student with recognizable placeholder blobs.
    pub fn plain_input(&self, n: u8) -> RecordInput {
        self.plain_input_for(n, self.student.address())
    }

    /// An input for any student with recognizable placeholder blobs.
    pub fn plain_input_for(&self, n: u8, student: Address) -> RecordInput {
        RecordInput::new(record_id(n), student)
            .encrypted_data(format!("ciphertext-{}", n).into_bytes())
            .keys(
                format!("key-institution-{}", n).into_bytes(),
                format!("key-student-{}", n).into_bytes(),
            )
            .signature(vec![n; 64])
            .policy("owner-only")
    }

    /// A really encrypted and signed input for the fixture student.
    ///
    /// Returns the content key so tests can wrap it for visitors.
    pub fn sealed_input(
        &self,
        n: u8,
        plaintext: &[u8],
    ) -> scholar_ledger_perms::Result<(RecordInput, ContentKey)> {
        let builder =
            EncryptedRecordBuilder::new(record_id(n), self.student.address(), plaintext.to_vec());
        let input = builder.build_signed(
            &self.institution.keypair,
            &self.institution.x25519_public(),
            &self.student.x25519_public(),
        )?;
        Ok((input, builder.content_key().clone()))
    }

    /// The visitor key blob the student would hand the fixture visitor.
    pub fn visitor_blob(
        &self,
        n: u8,
        content_key: &ContentKey,
    ) -> scholar_ledger_perms::Result<bytes::Bytes> {
        wrap_for_visitor(&record_id(n), content_key, &self.visitor.x25519_public())
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic record id number `n`.
pub fn record_id(n: u8) -> RecordId {
    let mut bytes = [0u8; 32];
    bytes[0] = 0x5c;
    bytes[31] = n;
    RecordId::from_bytes(bytes)
}
