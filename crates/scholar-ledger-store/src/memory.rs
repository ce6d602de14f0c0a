//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use scholar_ledger_core::{Address, Record, RecordId};

use crate::error::{Result, StoreError};
use crate::traits::{InsertResult, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    owner: Option<Address>,

    institutions: BTreeSet<Address>,

    /// Records indexed by id.
    records: HashMap<RecordId, Record>,

    /// Registration order.
    order: Vec<RecordId>,

    /// Visitor keys per record.
    visitor_keys: HashMap<RecordId, BTreeMap<Address, Bytes>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_owner(&self) -> Result<Option<Address>> {
        Ok(self.read()?.owner)
    }

    async fn init_owner(&self, owner: &Address) -> Result<bool> {
        let mut inner = self.write()?;
        if inner.owner.is_some() {
            return Ok(false);
        }
        inner.owner = Some(*owner);
        Ok(true)
    }

    async fn is_institution(&self, address: &Address) -> Result<bool> {
        Ok(self.read()?.institutions.contains(address))
    }

    async fn set_institution(&self, address: &Address, member: bool) -> Result<()> {
        let mut inner = self.write()?;
        if member {
            inner.institutions.insert(*address);
        } else {
            inner.institutions.remove(address);
        }
        Ok(())
    }

    async fn list_institutions(&self) -> Result<Vec<Address>> {
        Ok(self.read()?.institutions.iter().copied().collect())
    }

    async fn insert_records(&self, records: &[Record]) -> Result<InsertResult> {
        let mut inner = self.write()?;

        // Validate the whole batch before touching anything.
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            if inner.records.contains_key(&record.record_id) || !seen.insert(record.record_id) {
                return Ok(InsertResult::Duplicate {
                    record_id: record.record_id,
                });
            }
        }

        for record in records {
            inner.order.push(record.record_id);
            inner.records.insert(record.record_id, record.clone());
        }

        Ok(InsertResult::Inserted {
            count: records.len(),
        })
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        Ok(self.read()?.records.get(id).cloned())
    }

    async fn has_record(&self, id: &RecordId) -> Result<bool> {
        Ok(self.read()?.records.contains_key(id))
    }

    async fn records_by_student(&self, student: &Address) -> Result<Vec<RecordId>> {
        let inner = self.read()?;
        Ok(inner
            .order
            .iter()
            .filter(|id| {
                inner
                    .records
                    .get(id)
                    .is_some_and(|r| &r.student_address == student)
            })
            .copied()
            .collect())
    }

    async fn records_by_institution(&self, institution: &Address) -> Result<Vec<RecordId>> {
        let inner = self.read()?;
        Ok(inner
            .order
            .iter()
            .filter(|id| {
                inner
                    .records
                    .get(id)
                    .is_some_and(|r| &r.institution_address == institution)
            })
            .copied()
            .collect())
    }

    async fn record_count(&self) -> Result<u64> {
        Ok(self.read()?.records.len() as u64)
    }

    async fn get_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<Option<Bytes>> {
        let inner = self.read()?;
        Ok(inner
            .visitor_keys
            .get(id)
            .and_then(|keys| keys.get(visitor))
            .cloned())
    }

    async fn put_visitor_key(&self, id: &RecordId, visitor: &Address, key: &Bytes) -> Result<()> {
        let mut inner = self.write()?;
        inner
            .visitor_keys
            .entry(*id)
            .or_default()
            .insert(*visitor, key.clone());
        Ok(())
    }

    async fn remove_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<bool> {
        let mut inner = self.write()?;
        let Some(keys) = inner.visitor_keys.get_mut(id) else {
            return Ok(false);
        };
        let removed = keys.remove(visitor).is_some();
        if keys.is_empty() {
            inner.visitor_keys.remove(id);
        }
        Ok(removed)
    }

    async fn list_visitors(&self, id: &RecordId) -> Result<Vec<Address>> {
        let inner = self.read()?;
        Ok(inner
            .visitor_keys
            .get(id)
            .map(|keys| keys.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn has_grants_for_visitor(&self, visitor: &Address) -> Result<bool> {
        let inner = self.read()?;
        Ok(inner
            .visitor_keys
            .values()
            .any(|keys| keys.contains_key(visitor)))
    }
}
