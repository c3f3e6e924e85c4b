//! RocksDB-backed document store.
//!
//! Implements [`DocumentStore`] with one column family per [`Collection`].
//! Batch writes go through a single [`WriteBatch`]; `update` is serialised
//! by a write mutex so its read and write cannot interleave with another
//! update.

use std::path::Path;

use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use tracing::info;

use tether_core::error::TetherError;
use tether_core::traits::{Collection, DocumentStore, UpdateFn};

pub struct RocksStore {
    db: DB,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a database at `path`, creating missing column families.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TetherError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = Collection::ALL
            .iter()
            .map(|collection| ColumnFamilyDescriptor::new(collection.name(), Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&db_opts, path.as_ref(), cf_descriptors)
            .map_err(storage_err)?;
        info!(path = %path.as_ref().display(), "opened score store");

        Ok(Self {
            db,
            write_lock: Mutex::new(()),
        })
    }

    fn cf_handle(&self, collection: Collection) -> Result<&ColumnFamily, TetherError> {
        self.db
            .cf_handle(collection.name())
            .ok_or_else(|| TetherError::Storage(format!("missing column family: {collection}")))
    }
}

fn storage_err(e: rocksdb::Error) -> TetherError {
    TetherError::Storage(e.to_string())
}

impl DocumentStore for RocksStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Vec<u8>>, TetherError> {
        let cf = self.cf_handle(collection)?;
        self.db.get_cf(cf, key.as_bytes()).map_err(storage_err)
    }

    fn put(&self, collection: Collection, key: &str, value: Vec<u8>) -> Result<(), TetherError> {
        let cf = self.cf_handle(collection)?;
        self.db.put_cf(cf, key.as_bytes(), value).map_err(storage_err)
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), TetherError> {
        let cf = self.cf_handle(collection)?;
        self.db.delete_cf(cf, key.as_bytes()).map_err(storage_err)
    }

    fn scan_prefix(
        &self,
        collection: Collection,
        prefix: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, TetherError> {
        let cf = self.cf_handle(collection)?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(storage_err)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.into_vec())
                .map_err(|e| TetherError::Storage(format!("non-utf8 key: {e}")))?;
            found.push((key, value.into_vec()));
        }
        Ok(found)
    }

    fn batch_get(
        &self,
        collection: Collection,
        keys: &[String],
    ) -> Result<Vec<Option<Vec<u8>>>, TetherError> {
        let cf = self.cf_handle(collection)?;
        self.db
            .multi_get_cf(keys.iter().map(|key| (cf, key.as_bytes())))
            .into_iter()
            .map(|result| result.map_err(storage_err))
            .collect()
    }

    fn batch_put(
        &self,
        collection: Collection,
        items: Vec<(String, Vec<u8>)>,
    ) -> Result<(), TetherError> {
        let cf = self.cf_handle(collection)?;
        let mut batch = WriteBatch::default();
        for (key, value) in items {
            batch.put_cf(cf, key.as_bytes(), value);
        }
        self.db.write(batch).map_err(storage_err)
    }

    fn batch_delete(&self, collection: Collection, keys: &[String]) -> Result<(), TetherError> {
        let cf = self.cf_handle(collection)?;
        let mut batch = WriteBatch::default();
        for key in keys {
            batch.delete_cf(cf, key.as_bytes());
        }
        self.db.write(batch).map_err(storage_err)
    }

    fn update(
        &self,
        collection: Collection,
        key: &str,
        f: &mut UpdateFn<'_>,
    ) -> Result<Vec<u8>, TetherError> {
        let _guard = self.write_lock.lock();
        let cf = self.cf_handle(collection)?;
        let current = self.db.get_cf(cf, key.as_bytes()).map_err(storage_err)?;
        let next = f(current)?;
        self.db.put_cf(cf, key.as_bytes(), &next).map_err(storage_err)?;
        Ok(next)
    }
}
