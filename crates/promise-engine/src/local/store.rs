//! Store — redb-backed persistence for the local engine.
//!
//! Every engine message runs inside a single write transaction through
//! [`Store::write`], so a message either applies completely or not at all.
//! The store supports both on-disk and in-memory backends.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use promise_core::{EngineError, EngineResult};

use super::tables::*;

/// Convert any `Display` error into `EngineError::Storage` with a context label.
macro_rules! storage_err {
    ($what:literal) => {
        |e| EngineError::Storage(format!(concat!($what, ": {}"), e))
    };
}

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub(crate) struct Store {
    db: Arc<Database>,
}

impl Store {
    /// Open (or create) a persistent store at the given path.
    pub(crate) fn open(path: &Path) -> EngineResult<Self> {
        let db = Database::create(path).map_err(storage_err!("open database"))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "engine store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub(crate) fn open_in_memory() -> EngineResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(storage_err!("open database"))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory engine store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> EngineResult<()> {
        let txn = self.db.begin_write().map_err(storage_err!("begin"))?;
        for table in [PROMISES, TASKS, SCHEDULES, CALLBACKS] {
            txn.open_table(table).map_err(storage_err!("open table"))?;
        }
        txn.commit().map_err(storage_err!("commit"))?;
        Ok(())
    }

    /// Run `f` in one write transaction. Commits on `Ok`, aborts on `Err`.
    pub(crate) fn write<T>(&self, f: impl FnOnce(Txn<'_>) -> EngineResult<T>) -> EngineResult<T> {
        let txn = self.db.begin_write().map_err(storage_err!("begin"))?;
        match f(Txn { txn: &txn }) {
            Ok(out) => {
                txn.commit().map_err(storage_err!("commit"))?;
                Ok(out)
            }
            Err(e) => {
                txn.abort().map_err(storage_err!("abort"))?;
                Err(e)
            }
        }
    }
}

/// Typed view over an open write transaction.
#[derive(Clone, Copy)]
pub(crate) struct Txn<'a> {
    txn: &'a WriteTransaction,
}

impl Txn<'_> {
    pub(crate) fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> EngineResult<Option<T>> {
        let table = self.txn.open_table(table).map_err(storage_err!("open table"))?;
        match table.get(key).map_err(storage_err!("read"))? {
            Some(guard) => {
                let record = serde_json::from_slice(guard.value())
                    .map_err(storage_err!("deserialize"))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    pub(crate) fn put<T: Serialize>(&self, table: Table, key: &str, record: &T) -> EngineResult<()> {
        let value = serde_json::to_vec(record).map_err(storage_err!("serialize"))?;
        let mut table = self.txn.open_table(table).map_err(storage_err!("open table"))?;
        table
            .insert(key, value.as_slice())
            .map_err(storage_err!("write"))?;
        Ok(())
    }

    /// Remove a key. Returns true if it existed.
    pub(crate) fn remove(&self, table: Table, key: &str) -> EngineResult<bool> {
        let mut table = self.txn.open_table(table).map_err(storage_err!("open table"))?;
        let existed = table.remove(key).map_err(storage_err!("write"))?.is_some();
        Ok(existed)
    }

    /// All records whose key starts with `prefix`, in key order.
    pub(crate) fn scan<T: DeserializeOwned>(&self, table: Table, prefix: &str) -> EngineResult<Vec<T>> {
        let table = self.txn.open_table(table).map_err(storage_err!("open table"))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(storage_err!("read"))? {
            let (key, value) = entry.map_err(storage_err!("read"))?;
            if key.value().starts_with(prefix) {
                let record = serde_json::from_slice(value.value())
                    .map_err(storage_err!("deserialize"))?;
                results.push(record);
            }
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Row {
        n: u32,
    }

    #[test]
    fn put_get_remove() {
        let store = Store::open_in_memory().unwrap();
        store
            .write(|txn| txn.put(PROMISES, "a", &Row { n: 1 }))
            .unwrap();

        let row: Option<Row> = store.write(|txn| txn.get(PROMISES, "a")).unwrap();
        assert_eq!(row, Some(Row { n: 1 }));

        assert!(store.write(|txn| txn.remove(PROMISES, "a")).unwrap());
        assert!(!store.write(|txn| txn.remove(PROMISES, "a")).unwrap());
    }

    #[test]
    fn failed_write_is_rolled_back() {
        let store = Store::open_in_memory().unwrap();
        let result: EngineResult<()> = store.write(|txn| {
            txn.put(TASKS, "t", &Row { n: 7 })?;
            Err(EngineError::Invalid("boom".to_string()))
        });
        assert!(result.is_err());

        let row: Option<Row> = store.write(|txn| txn.get(TASKS, "t")).unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn scan_filters_by_prefix() {
        let store = Store::open_in_memory().unwrap();
        store
            .write(|txn| {
                txn.put(CALLBACKS, &callback_key("p1", "a"), &Row { n: 1 })?;
                txn.put(CALLBACKS, &callback_key("p1", "b"), &Row { n: 2 })?;
                txn.put(CALLBACKS, &callback_key("p2", "a"), &Row { n: 3 })
            })
            .unwrap();

        let rows: Vec<Row> = store.write(|txn| txn.scan(CALLBACKS, "p1/")).unwrap();
        assert_eq!(rows, vec![Row { n: 1 }, Row { n: 2 }]);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("engine.redb");

        {
            let store = Store::open(&db_path).unwrap();
            store
                .write(|txn| txn.put(SCHEDULES, "s1", &Row { n: 9 }))
                .unwrap();
        }

        let store = Store::open(&db_path).unwrap();
        let row: Option<Row> = store.write(|txn| txn.get(SCHEDULES, "s1")).unwrap();
        assert_eq!(row, Some(Row { n: 9 }));
    }
}
