//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend for Scholar Ledger. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use scholar_ledger_core::{Address, Record, RecordId};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{InsertResult, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection from a blocking worker.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await?
    }
}

fn conversion_error(
    column: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Blob, Box::new(err))
}

fn address_column(row: &rusqlite::Row<'_>, column: usize) -> rusqlite::Result<Address> {
    let bytes: Vec<u8> = row.get(column)?;
    Address::try_from(bytes.as_slice()).map_err(|e| conversion_error(column, e))
}

fn record_id_column(row: &rusqlite::Row<'_>, column: usize) -> rusqlite::Result<RecordId> {
    let bytes: Vec<u8> = row.get(column)?;
    RecordId::try_from(bytes.as_slice()).map_err(|e| conversion_error(column, e))
}

// Column order matches RECORD_COLUMNS.
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    Ok(Record {
        record_id: record_id_column(row, 0)?,
        student_address: address_column(row, 1)?,
        institution_address: address_column(row, 2)?,
        encrypted_data: Bytes::from(row.get::<_, Vec<u8>>(3)?),
        encrypted_key_institution: Bytes::from(row.get::<_, Vec<u8>>(4)?),
        encrypted_key_student: Bytes::from(row.get::<_, Vec<u8>>(5)?),
        signature_institution: Bytes::from(row.get::<_, Vec<u8>>(6)?),
        timestamp: row.get(7)?,
    })
}

const RECORD_COLUMNS: &str = "record_id, student_address, institution_address, encrypted_data,
     encrypted_key_institution, encrypted_key_student, signature_institution, timestamp";

#[async_trait]
impl Store for SqliteStore {
    async fn get_owner(&self) -> Result<Option<Address>> {
        self.run(|conn| {
            conn.query_row(
                "SELECT owner FROM directory_owner WHERE id = 0",
                [],
                |row| address_column(row, 0),
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn init_owner(&self, owner: &Address) -> Result<bool> {
        let owner = *owner;
        self.run(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO directory_owner (id, owner) VALUES (0, ?1)",
                params![owner.as_bytes().as_slice()],
            )?;
            Ok(changed == 1)
        })
        .await
    }

    async fn is_institution(&self, address: &Address) -> Result<bool> {
        let address = *address;
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM institutions WHERE address = ?1)",
                params![address.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn set_institution(&self, address: &Address, member: bool) -> Result<()> {
        let address = *address;
        self.run(move |conn| {
            if member {
                conn.execute(
                    "INSERT OR IGNORE INTO institutions (address) VALUES (?1)",
                    params![address.as_bytes().as_slice()],
                )?;
            } else {
                conn.execute(
                    "DELETE FROM institutions WHERE address = ?1",
                    params![address.as_bytes().as_slice()],
                )?;
            }
            Ok(())
        })
        .await
    }

    async fn list_institutions(&self) -> Result<Vec<Address>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT address FROM institutions ORDER BY address")?;
            let addresses = stmt
                .query_map([], |row| address_column(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(addresses)
        })
        .await
    }

    async fn insert_records(&self, records: &[Record]) -> Result<InsertResult> {
        let records = records.to_vec();
        self.run(move |conn| {
            let tx = conn.transaction()?;

            for record in &records {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM records WHERE record_id = ?1)",
                    params![record.record_id.as_bytes().as_slice()],
                    |row| row.get(0),
                )?;
                if exists {
                    // Dropping the transaction rolls back earlier rows of this batch.
                    tracing::debug!(record_id = %record.record_id, "duplicate record id in batch");
                    return Ok(InsertResult::Duplicate {
                        record_id: record.record_id,
                    });
                }

                tx.execute(
                    "INSERT INTO records (
                        record_id, student_address, institution_address, encrypted_data,
                        encrypted_key_institution, encrypted_key_student,
                        signature_institution, timestamp
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.record_id.as_bytes().as_slice(),
                        record.student_address.as_bytes().as_slice(),
                        record.institution_address.as_bytes().as_slice(),
                        &record.encrypted_data[..],
                        &record.encrypted_key_institution[..],
                        &record.encrypted_key_student[..],
                        &record.signature_institution[..],
                        record.timestamp,
                    ],
                )?;
            }

            tx.commit()?;
            Ok(InsertResult::Inserted {
                count: records.len(),
            })
        })
        .await
    }

    async fn get_record(&self, id: &RecordId) -> Result<Option<Record>> {
        let id = *id;
        self.run(move |conn| {
            conn.query_row(
                &format!("SELECT {} FROM records WHERE record_id = ?1", RECORD_COLUMNS),
                params![id.as_bytes().as_slice()],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn has_record(&self, id: &RecordId) -> Result<bool> {
        let id = *id;
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE record_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn records_by_student(&self, student: &Address) -> Result<Vec<RecordId>> {
        let student = *student;
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record_id FROM records WHERE student_address = ?1 ORDER BY seq",
            )?;
            let ids = stmt
                .query_map(params![student.as_bytes().as_slice()], |row| {
                    record_id_column(row, 0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn records_by_institution(&self, institution: &Address) -> Result<Vec<RecordId>> {
        let institution = *institution;
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT record_id FROM records WHERE institution_address = ?1 ORDER BY seq",
            )?;
            let ids = stmt
                .query_map(params![institution.as_bytes().as_slice()], |row| {
                    record_id_column(row, 0)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn record_count(&self) -> Result<u64> {
        self.run(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
            u64::try_from(count)
                .map_err(|_| StoreError::InvalidData(format!("negative record count {}", count)))
        })
        .await
    }

    async fn get_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<Option<Bytes>> {
        let id = *id;
        let visitor = *visitor;
        self.run(move |conn| {
            let key: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT encrypted_key FROM visitor_keys
                     WHERE record_id = ?1 AND visitor_address = ?2",
                    params![id.as_bytes().as_slice(), visitor.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(key.map(Bytes::from))
        })
        .await
    }

    async fn put_visitor_key(&self, id: &RecordId, visitor: &Address, key: &Bytes) -> Result<()> {
        let id = *id;
        let visitor = *visitor;
        let key = key.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO visitor_keys (record_id, visitor_address, encrypted_key)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(record_id, visitor_address)
                 DO UPDATE SET encrypted_key = excluded.encrypted_key",
                params![
                    id.as_bytes().as_slice(),
                    visitor.as_bytes().as_slice(),
                    &key[..]
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn remove_visitor_key(&self, id: &RecordId, visitor: &Address) -> Result<bool> {
        let id = *id;
        let visitor = *visitor;
        self.run(move |conn| {
            let removed = conn.execute(
                "DELETE FROM visitor_keys WHERE record_id = ?1 AND visitor_address = ?2",
                params![id.as_bytes().as_slice(), visitor.as_bytes().as_slice()],
            )?;
            Ok(removed > 0)
        })
        .await
    }

    async fn list_visitors(&self, id: &RecordId) -> Result<Vec<Address>> {
        let id = *id;
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT visitor_address FROM visitor_keys
                 WHERE record_id = ?1 ORDER BY visitor_address",
            )?;
            let visitors = stmt
                .query_map(params![id.as_bytes().as_slice()], |row| address_column(row, 0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(visitors)
        })
        .await
    }

    async fn has_grants_for_visitor(&self, visitor: &Address) -> Result<bool> {
        let visitor = *visitor;
        self.run(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM visitor_keys WHERE visitor_address = ?1)",
                params![visitor.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_ledger_core::RecordInput;

    fn make_record(id: u8, student: u8) -> Record {
        RecordInput::new(RecordId::from_bytes([id; 32]), Address::from_bytes([student; 20]))
            .encrypted_data(format!("ciphertext {}", id).into_bytes())
            .keys(vec![id, 1], vec![id, 2])
            .signature(vec![id; 64])
            .into_record(Address::from_bytes([0xee; 20]), 1_700_000_000_000)
    }

    #[tokio::test]
    async fn test_insert_and_get_record() {
        let store = SqliteStore::open_memory().unwrap();
        let record = make_record(1, 10);

        let result = store.insert_records(&[record.clone()]).await.unwrap();
        assert_eq!(result, InsertResult::Inserted { count: 1 });

        let retrieved = store.get_record(&record.record_id).await.unwrap().unwrap();
        assert_eq!(retrieved, record);
    }

    #[tokio::test]
    async fn test_duplicate_rolls_back_batch() {
        let store = SqliteStore::open_memory().unwrap();
        store.insert_records(&[make_record(1, 10)]).await.unwrap();

        let result = store
            .insert_records(&[make_record(2, 10), make_record(3, 10), make_record(1, 10)])
            .await
            .unwrap();
        assert_eq!(
            result,
            InsertResult::Duplicate {
                record_id: RecordId::from_bytes([1; 32])
            }
        );

        assert_eq!(store.record_count().await.unwrap(), 1);
        assert!(!store.has_record(&RecordId::from_bytes([2; 32])).await.unwrap());
    }

    #[tokio::test]
    async fn test_in_batch_duplicate_rolls_back() {
        let store = SqliteStore::open_memory().unwrap();
        let result = store
            .insert_records(&[make_record(4, 1), make_record(4, 2)])
            .await
            .unwrap();

        assert!(matches!(result, InsertResult::Duplicate { .. }));
        assert_eq!(store.record_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_directory_rows() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = Address::from_bytes([1; 20]);
        let inst = Address::from_bytes([2; 20]);

        assert_eq!(store.get_owner().await.unwrap(), None);
        assert!(store.init_owner(&owner).await.unwrap());
        assert!(!store.init_owner(&inst).await.unwrap());
        assert_eq!(store.get_owner().await.unwrap(), Some(owner));

        store.set_institution(&inst, true).await.unwrap();
        store.set_institution(&inst, true).await.unwrap();
        assert!(store.is_institution(&inst).await.unwrap());
        assert_eq!(store.list_institutions().await.unwrap(), vec![inst]);

        store.set_institution(&inst, false).await.unwrap();
        store.set_institution(&inst, false).await.unwrap();
        assert!(!store.is_institution(&inst).await.unwrap());
    }

    #[tokio::test]
    async fn test_visitor_key_upsert_and_remove() {
        let store = SqliteStore::open_memory().unwrap();
        let id = RecordId::from_bytes([1; 32]);
        let visitor = Address::from_bytes([3; 20]);

        store.put_visitor_key(&id, &visitor, &Bytes::from_static(b"first")).await.unwrap();
        store.put_visitor_key(&id, &visitor, &Bytes::from_static(b"second")).await.unwrap();
        assert_eq!(
            store.get_visitor_key(&id, &visitor).await.unwrap(),
            Some(Bytes::from_static(b"second"))
        );
        assert_eq!(store.list_visitors(&id).await.unwrap(), vec![visitor]);
        assert!(store.has_grants_for_visitor(&visitor).await.unwrap());

        assert!(store.remove_visitor_key(&id, &visitor).await.unwrap());
        assert!(!store.remove_visitor_key(&id, &visitor).await.unwrap());
        assert_eq!(store.get_visitor_key(&id, &visitor).await.unwrap(), None);
        assert!(!store.has_grants_for_visitor(&visitor).await.unwrap());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");
        let record = make_record(7, 8);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_records(&[record.clone()]).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_record(&record.record_id).await.unwrap(), Some(record));
        assert_eq!(
            store.records_by_institution(&Address::from_bytes([0xee; 20])).await.unwrap(),
            vec![RecordId::from_bytes([7; 32])]
        );
    }
}
