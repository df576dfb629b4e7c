//! Persistent single-file store on redb.
//!
//! Uses the redb embedded database for:
//! - ACID transactions (a write is acknowledged only after commit)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! All toggle records live in one text -> text table. Ordered keys make a
//! prefix scan a bounded range read.

use super::{Connection, Connector};
use crate::error::StoreUnavailable;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const RECORDS: TableDefinition<&str, &str> = TableDefinition::new("records");

/// Handle to a redb file. Clones share the open database.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreUnavailable> {
        let db = Database::create(path.as_ref()).map_err(StoreUnavailable::backend)?;

        // Create the table up front so readers never see it missing.
        let txn = db.begin_write().map_err(StoreUnavailable::backend)?;
        txn.open_table(RECORDS).map_err(StoreUnavailable::backend)?;
        txn.commit().map_err(StoreUnavailable::backend)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Connector for RedbStore {
    type Conn = RedbConnection;

    fn connect(&self) -> Result<RedbConnection, StoreUnavailable> {
        Ok(RedbConnection {
            db: Arc::clone(&self.db),
        })
    }
}

pub struct RedbConnection {
    db: Arc<Database>,
}

impl Connection for RedbConnection {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreUnavailable> {
        let txn = self.db.begin_read().map_err(StoreUnavailable::backend)?;
        let table = txn.open_table(RECORDS).map_err(StoreUnavailable::backend)?;
        let value = table.get(key).map_err(StoreUnavailable::backend)?;
        Ok(value.map(|guard| guard.value().to_string()))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<bool, StoreUnavailable> {
        let txn = self.db.begin_write().map_err(StoreUnavailable::backend)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(StoreUnavailable::backend)?;
            table.insert(key, value).map_err(StoreUnavailable::backend)?;
        }
        txn.commit().map_err(StoreUnavailable::backend)?;
        Ok(true)
    }

    fn scan_prefix(&mut self, prefix: &str) -> Result<Vec<String>, StoreUnavailable> {
        let txn = self.db.begin_read().map_err(StoreUnavailable::backend)?;
        let table = txn.open_table(RECORDS).map_err(StoreUnavailable::backend)?;

        let mut keys = Vec::new();
        for entry in table.range(prefix..).map_err(StoreUnavailable::backend)? {
            let (key, _) = entry.map_err(StoreUnavailable::backend)?;
            let key = key.value();
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key.to_string());
        }
        Ok(keys)
    }
}
