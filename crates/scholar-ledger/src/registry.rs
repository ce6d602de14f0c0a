//! The Registry: unified API for Scholar Ledger.
//!
//! The Registry ties the directory, the record store and event delivery
//! into one interface. Every mutating call is one atomic unit: it either
//! commits completely and then emits its events, or fails with nothing
//! written and nothing emitted.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use scholar_ledger_core::{Address, Record, RecordBatch, RecordId, RecordInput, RegistryEvent};
use scholar_ledger_perms::{
    authorize_revoke, require_identity, AccessGrant, Directory, Role, RoleSet,
};
use scholar_ledger_store::{InsertResult, Store};

use crate::clock::{Clock, SystemClock};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::events::EventSink;

/// The main Registry struct.
///
/// Provides a unified API for:
/// - Administering the directory of institutions
/// - Registering batches of encrypted records
/// - Granting and revoking visitor access
/// - Querying records and grants
///
/// Mutations are serialized behind one async writer lock. Reads go
/// straight to the store.
pub struct Registry<S: Store> {
    /// The storage backend.
    store: Arc<S>,
    /// Owner and institution roles.
    directory: Directory<S>,
    /// Configuration.
    config: RegistryConfig,
    /// Source of record timestamps.
    clock: Arc<dyn Clock>,
    /// Event consumers, called in attach order.
    sinks: Vec<Arc<dyn EventSink>>,
    /// Held for the whole check-then-write sequence of a mutation.
    write_lock: Mutex<()>,
}

impl<S: Store> Registry<S> {
    /// Create a registry over a fresh store.
    pub fn new(store: S, config: RegistryConfig) -> Self {
        Self::with_store(Arc::new(store), config)
    }

    /// Create a registry over a shared store.
    ///
    /// Several registries may share one store; duplicate record ids are
    /// still rejected because the store re-checks them on commit.
    pub fn with_store(store: Arc<S>, config: RegistryConfig) -> Self {
        Self {
            directory: Directory::new(Arc::clone(&store)),
            store,
            config,
            clock: Arc::new(SystemClock),
            sinks: Vec::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an event consumer, such as an [`EventLog`](crate::EventLog)
    /// or a [`ChannelSink`](crate::ChannelSink).
    ///
    /// A registry with no sinks retains no events.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Directory Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `caller` the directory owner. Succeeds once per store.
    pub async fn initialize(&self, caller: &Address) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        rejected("initialize", self.directory.initialize(caller).await.map_err(Into::into))
    }

    /// Grant the institution role. Owner only; idempotent.
    pub async fn add_institution(&self, caller: &Address, identity: &Address) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        rejected(
            "add_institution",
            self.directory
                .add_institution(caller, identity)
                .await
                .map_err(Into::into),
        )
    }

    /// Revoke the institution role. Owner only; idempotent.
    pub async fn remove_institution(&self, caller: &Address, identity: &Address) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        rejected(
            "remove_institution",
            self.directory
                .remove_institution(caller, identity)
                .await
                .map_err(Into::into),
        )
    }

    pub async fn is_institution(&self, identity: &Address) -> Result<bool> {
        Ok(self.directory.is_institution(identity).await?)
    }

    /// The directory owner, or `NotInitialized`.
    pub async fn owner(&self) -> Result<Address> {
        Ok(self.directory.owner().await?)
    }

    /// Current institutions, sorted by address.
    pub async fn institutions(&self) -> Result<Vec<Address>> {
        Ok(self.directory.institutions().await?)
    }

    /// Roles held by `identity`.
    ///
    /// Owner and institution come from the directory; student is reported
    /// when at least one record names the identity, visitor when it holds at
    /// least one access key.
    pub async fn roles(&self, identity: &Address) -> Result<RoleSet> {
        let mut roles = self.directory.roles(identity).await?;
        if !self.store.records_by_student(identity).await?.is_empty() {
            roles.insert(Role::Student);
        }
        if self.store.has_grants_for_visitor(identity).await? {
            roles.insert(Role::Visitor);
        }
        Ok(roles)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Register a batch of records as institution `caller`.
    ///
    /// Entries are checked in order. The first failing entry aborts the
    /// batch; otherwise every record commits with `institution_address =
    /// caller` and one shared timestamp, and one `RecordRegistered` event is
    /// emitted per entry in input order. `policy` is not stored.
    ///
    /// Returns the registered ids in input order.
    pub async fn register_batch_records(
        &self,
        caller: &Address,
        entries: Vec<RecordInput>,
    ) -> Result<Vec<RecordId>> {
        let _guard = self.write_lock.lock().await;
        rejected("register_batch_records", self.register_locked(caller, entries).await)
    }

    /// Register a column-form batch.
    ///
    /// Columns of unequal length fail with `LengthMismatch` before any other
    /// check.
    pub async fn register_record_batch(
        &self,
        caller: &Address,
        batch: RecordBatch,
    ) -> Result<Vec<RecordId>> {
        let entries = rejected(
            "register_record_batch",
            batch.into_inputs().map_err(RegistryError::from),
        )?;
        self.register_batch_records(caller, entries).await
    }

    async fn register_locked(
        &self,
        caller: &Address,
        entries: Vec<RecordInput>,
    ) -> Result<Vec<RecordId>> {
        self.directory.require_institution(caller).await?;

        if entries.is_empty() {
            return Err(RegistryError::EmptyBatch);
        }
        if let Some(limit) = self.config.max_batch_size {
            if entries.len() > limit {
                return Err(RegistryError::BatchTooLarge {
                    size: entries.len(),
                    limit,
                });
            }
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.record_id) || self.store.has_record(&entry.record_id).await? {
                return Err(RegistryError::DuplicateRecordId(entry.record_id));
            }
            require_identity(&entry.student_address, "student")?;
        }

        let timestamp = self.clock.now_millis();
        let records: Vec<Record> = entries
            .into_iter()
            .map(|entry| entry.into_record(*caller, timestamp))
            .collect();

        match self.store.insert_records(&records).await? {
            InsertResult::Inserted { count } => {
                tracing::info!(institution = %caller, count, timestamp, "registered record batch");
            }
            InsertResult::Duplicate { record_id } => {
                return Err(RegistryError::DuplicateRecordId(record_id));
            }
        }

        for record in &records {
            self.emit(RegistryEvent::RecordRegistered {
                record_id: record.record_id,
                student_address: record.student_address,
                institution_address: record.institution_address,
                timestamp: record.timestamp,
            });
        }

        Ok(records.iter().map(|r| r.record_id).collect())
    }

    /// Get a record by id. Unrestricted.
    pub async fn get_record(&self, record_id: &RecordId) -> Result<Record> {
        tracing::debug!(record_id = %record_id, "get_record");
        self.store
            .get_record(record_id)
            .await?
            .ok_or(RegistryError::RecordNotFound(*record_id))
    }

    /// Ids of the records naming `student`, in registration order.
    pub async fn records_for_student(&self, student: &Address) -> Result<Vec<RecordId>> {
        Ok(self.store.records_by_student(student).await?)
    }

    /// Ids of the records registered by `institution`, in registration order.
    pub async fn records_for_institution(&self, institution: &Address) -> Result<Vec<RecordId>> {
        Ok(self.store.records_by_institution(institution).await?)
    }

    pub async fn record_count(&self) -> Result<u64> {
        Ok(self.store.record_count().await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Give `visitor` access to a record by storing their wrapped key.
    ///
    /// Only the record's student may call this. Any earlier key for the
    /// same visitor is replaced.
    pub async fn grant_visitor_access(
        &self,
        caller: &Address,
        record_id: &RecordId,
        visitor: &Address,
        encrypted_key_visitor: impl Into<Bytes>,
    ) -> Result<()> {
        let key = encrypted_key_visitor.into();
        let _guard = self.write_lock.lock().await;
        rejected(
            "grant_visitor_access",
            self.grant_locked(caller, record_id, visitor, key).await,
        )
    }

    async fn grant_locked(
        &self,
        caller: &Address,
        record_id: &RecordId,
        visitor: &Address,
        key: Bytes,
    ) -> Result<()> {
        let record = self.get_record(record_id).await?;
        let grant = AccessGrant::authorize(&record, caller, visitor, key)?;

        self.store
            .put_visitor_key(&grant.record_id, &grant.visitor, &grant.encrypted_key)
            .await?;
        tracing::info!(record_id = %grant.record_id, visitor = %grant.visitor, "access granted");

        self.emit(RegistryEvent::AccessGranted {
            record_id: grant.record_id,
            student_address: grant.student,
            visitor_address: grant.visitor,
        });
        Ok(())
    }

    /// Withdraw `visitor`'s access to a record.
    ///
    /// Only the record's student may call this. Fails with `NoActiveAccess`
    /// when the visitor holds no key.
    pub async fn revoke_visitor_access(
        &self,
        caller: &Address,
        record_id: &RecordId,
        visitor: &Address,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        rejected(
            "revoke_visitor_access",
            self.revoke_locked(caller, record_id, visitor).await,
        )
    }

    async fn revoke_locked(
        &self,
        caller: &Address,
        record_id: &RecordId,
        visitor: &Address,
    ) -> Result<()> {
        let record = self.get_record(record_id).await?;
        authorize_revoke(&record, caller, visitor)?;

        if !self.store.remove_visitor_key(record_id, visitor).await? {
            return Err(RegistryError::NoActiveAccess {
                record_id: *record_id,
                visitor: *visitor,
            });
        }
        tracing::info!(record_id = %record_id, visitor = %visitor, "access revoked");

        self.emit(RegistryEvent::AccessRevoked {
            record_id: *record_id,
            student_address: record.student_address,
            visitor_address: *visitor,
        });
        Ok(())
    }

    /// The wrapped key held by `visitor` for a record, if any.
    pub async fn visitor_key(&self, record_id: &RecordId, visitor: &Address) -> Result<Option<Bytes>> {
        Ok(self.store.get_visitor_key(record_id, visitor).await?)
    }

    pub async fn has_access(&self, record_id: &RecordId, visitor: &Address) -> Result<bool> {
        Ok(self.visitor_key(record_id, visitor).await?.is_some())
    }

    /// Visitors currently holding a key for a record, sorted by address.
    pub async fn visitors(&self, record_id: &RecordId) -> Result<Vec<Address>> {
        Ok(self.store.list_visitors(record_id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    fn emit(&self, event: RegistryEvent) {
        if !self.config.emit_events {
            return;
        }
        tracing::debug!(event = event.name(), record_id = %event.record_id(), "emit");
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

/// Log a rejected mutation, passing the result through.
fn rejected<T>(operation: &'static str, result: Result<T>) -> Result<T> {
    if let Err(err) = &result {
        tracing::warn!(operation, kind = err.kind(), error = %err, "operation rejected");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::EventLog;
    use scholar_ledger_store::MemoryStore;

    const OWNER: Address = Address::from_bytes([1; 20]);
    const INST: Address = Address::from_bytes([2; 20]);
    const STUDENT: Address = Address::from_bytes([3; 20]);
    const VISITOR: Address = Address::from_bytes([4; 20]);

    async fn registry() -> Registry<MemoryStore> {
        registry_with_log(Arc::new(EventLog::new())).await
    }

    async fn registry_with_log(log: Arc<EventLog>) -> Registry<MemoryStore> {
        let registry = Registry::new(MemoryStore::new(), RegistryConfig::default())
            .with_clock(Arc::new(ManualClock::new(1_700_000_000_000)))
            .with_event_sink(log);
        registry.initialize(&OWNER).await.unwrap();
        registry.add_institution(&OWNER, &INST).await.unwrap();
        registry
    }

    fn entry(n: u8) -> RecordInput {
        RecordInput::new(RecordId::from_bytes([n; 32]), STUDENT)
            .encrypted_data(vec![n; 16])
            .keys(vec![n, 0xa], vec![n, 0xb])
            .signature(vec![n; 64])
    }

    #[tokio::test]
    async fn test_register_stamps_institution_and_time() {
        let registry = registry().await;
        let ids = registry
            .register_batch_records(&INST, vec![entry(1), entry(2)])
            .await
            .unwrap();
        assert_eq!(ids, vec![RecordId::from_bytes([1; 32]), RecordId::from_bytes([2; 32])]);

        let record = registry.get_record(&ids[0]).await.unwrap();
        assert_eq!(record.institution_address, INST);
        assert_eq!(record.timestamp, 1_700_000_000_000);
        assert_eq!(record.encrypted_data, Bytes::from(vec![1u8; 16]));
        assert_eq!(registry.record_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let registry = registry().await;
        assert!(matches!(
            registry.register_batch_records(&INST, vec![]).await,
            Err(RegistryError::EmptyBatch)
        ));
    }

    #[tokio::test]
    async fn test_unauthorized_checked_before_empty() {
        let registry = registry().await;
        assert!(matches!(
            registry.register_batch_records(&STUDENT, vec![]).await,
            Err(RegistryError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_batch_limit() {
        let registry = Registry::new(
            MemoryStore::new(),
            RegistryConfig::default().max_batch_size(2),
        );
        registry.initialize(&OWNER).await.unwrap();
        registry.add_institution(&OWNER, &INST).await.unwrap();

        let err = registry
            .register_batch_records(&INST, vec![entry(1), entry(2), entry(3)])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::BatchTooLarge { size: 3, limit: 2 }));
        assert_eq!(registry.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_student_rejected() {
        let registry = registry().await;
        let bad = RecordInput::new(RecordId::from_bytes([9; 32]), Address::ZERO);

        let err = registry
            .register_batch_records(&INST, vec![entry(1), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidIdentity(_)));
        assert!(matches!(
            registry.get_record(&RecordId::from_bytes([1; 32])).await,
            Err(RegistryError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_reported_before_later_invalid_identity() {
        let registry = registry().await;
        registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap();

        let bad = RecordInput::new(RecordId::from_bytes([9; 32]), Address::ZERO);
        let err = registry
            .register_batch_records(&INST, vec![entry(1), bad])
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRecordId(_)));
    }

    #[tokio::test]
    async fn test_grant_and_revoke_events() {
        let log = Arc::new(EventLog::new());
        let registry = registry_with_log(Arc::clone(&log)).await;
        let id = registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap()[0];

        registry
            .grant_visitor_access(&STUDENT, &id, &VISITOR, b"wrapped".to_vec())
            .await
            .unwrap();
        registry.revoke_visitor_access(&STUDENT, &id, &VISITOR).await.unwrap();

        let names: Vec<_> = log.snapshot().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["record_registered", "access_granted", "access_revoked"]);
    }

    #[tokio::test]
    async fn test_grant_on_missing_record() {
        let registry = registry().await;
        let missing = RecordId::from_bytes([0x77; 32]);

        assert!(matches!(
            registry
                .grant_visitor_access(&STUDENT, &missing, &VISITOR, b"k".to_vec())
                .await,
            Err(RegistryError::RecordNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_events_disabled() {
        let log = Arc::new(EventLog::new());
        let registry = Registry::new(MemoryStore::new(), RegistryConfig::default().without_events())
            .with_event_sink(Arc::<EventLog>::clone(&log));
        registry.initialize(&OWNER).await.unwrap();
        registry.add_institution(&OWNER, &INST).await.unwrap();
        registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap();

        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_roles_include_student() {
        let registry = registry().await;
        assert!(registry.roles(&STUDENT).await.unwrap().is_empty());

        registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap();
        let roles = registry.roles(&STUDENT).await.unwrap();
        assert!(roles.contains(Role::Student));
        assert!(!roles.contains(Role::Institution));

        assert!(registry.roles(&OWNER).await.unwrap().contains(Role::Owner));
    }

    #[tokio::test]
    async fn test_roles_follow_visitor_grants() {
        let registry = registry().await;
        let id = registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap()[0];
        assert!(!registry.roles(&VISITOR).await.unwrap().contains(Role::Visitor));

        registry
            .grant_visitor_access(&STUDENT, &id, &VISITOR, b"wrapped".to_vec())
            .await
            .unwrap();
        let roles = registry.roles(&VISITOR).await.unwrap();
        assert!(roles.contains(Role::Visitor));
        assert!(!roles.contains(Role::Student));

        registry.revoke_visitor_access(&STUDENT, &id, &VISITOR).await.unwrap();
        assert!(registry.roles(&VISITOR).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bounded_log_stays_bounded() {
        let log = Arc::new(EventLog::bounded(4));
        let registry = registry_with_log(Arc::clone(&log)).await;
        let id = registry.register_batch_records(&INST, vec![entry(1)]).await.unwrap()[0];

        for n in 0..100u8 {
            registry
                .grant_visitor_access(&STUDENT, &id, &VISITOR, vec![n + 1])
                .await
                .unwrap();
        }

        assert_eq!(log.len(), 4);
        assert_eq!(log.drain().len(), 4);
        assert!(log.is_empty());
    }
}
