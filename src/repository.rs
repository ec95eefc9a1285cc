//! Metadata repository backed by [redb](https://docs.rs/redb).
//!
//! Two independent tables, one per record kind, both keyed by the 16-byte
//! binary form of the record id with JSON-encoded values:
//!
//! | Table | Record |
//! |---|---|
//! | `pictures` | [`PictureRecord`] |
//! | `instagram` | [`SocialPostRecord`] |
//!
//! Tables are created lazily by the first [`put`](MetadataRepository::put).
//! Every write runs in its own redb write transaction, and redb admits one
//! writer at a time, so a `put` and a `delete` on the same id never
//! interleave.

use crate::diagnostics::Diagnostics;
use crate::types::{PictureRecord, SocialPostRecord};
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const PICTURES_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("pictures");
const POSTS_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("instagram");

/// The two record namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Pictures,
    SocialPosts,
}

impl Collection {
    fn table(self) -> TableDefinition<'static, &'static [u8], &'static [u8]> {
        match self {
            Collection::Pictures => PICTURES_TABLE,
            Collection::SocialPosts => POSTS_TABLE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Collection::Pictures => "pictures",
            Collection::SocialPosts => "instagram",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A record type stored in one collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

impl Record for PictureRecord {
    const COLLECTION: Collection = Collection::Pictures;

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Record for SocialPostRecord {
    const COLLECTION: Collection = Collection::SocialPosts;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("no record {id} in {collection}")]
    RecordNotFound { collection: Collection, id: Uuid },
    #[error("collection {0} does not exist yet")]
    CollectionNotFound(Collection),
    #[error("failed to open database: {0}")]
    Database(#[from] redb::DatabaseError),
    #[error("transaction failed: {0}")]
    Transaction(#[from] redb::TransactionError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),
    #[error("commit failed: {0}")]
    Commit(#[from] redb::CommitError),
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepositoryError::RecordNotFound { .. } | RepositoryError::CollectionNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Process-wide handle on the metadata store.
///
/// Open once at startup and share by reference; dropping it closes the
/// database file.
pub struct MetadataRepository {
    db: Database,
    diagnostics: Arc<dyn Diagnostics>,
}

impl MetadataRepository {
    /// Open the database file, creating it if it does not exist.
    pub fn open(path: &Path, diagnostics: Arc<dyn Diagnostics>) -> Result<Self> {
        let db = Database::create(path)?;
        Ok(Self { db, diagnostics })
    }

    /// Insert or replace a record in a single write transaction.
    pub fn put<R: Record>(&self, record: &R) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        let id = record.id();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(R::COLLECTION.table())?;
            table.insert(id.as_bytes().as_slice(), value.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn get<R: Record>(&self, id: Uuid) -> Result<R> {
        let collection = R::COLLECTION;
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(collection.table()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => {
                return Err(RepositoryError::CollectionNotFound(collection));
            }
            Err(e) => return Err(e.into()),
        };
        let guard = table
            .get(id.as_bytes().as_slice())?
            .ok_or(RepositoryError::RecordNotFound { collection, id })?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    /// Every decodable record in the collection, in key order.
    ///
    /// Values that fail to deserialize are reported to the diagnostics
    /// collaborator and left out. A collection that was never written to is
    /// empty rather than an error.
    pub fn list_all<R: Record>(&self) -> Result<Vec<R>> {
        let collection = R::COLLECTION;
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(collection.table()) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            match serde_json::from_slice::<R>(value.value()) {
                Ok(record) => records.push(record),
                Err(e) => self.diagnostics.record_skipped(collection, key.value(), &e),
            }
        }
        Ok(records)
    }

    /// Remove a record.
    ///
    /// Returns whether the key was present. Fails with
    /// [`RepositoryError::CollectionNotFound`] when the collection itself
    /// has never been created.
    pub fn delete<R: Record>(&self, id: Uuid) -> Result<bool> {
        let collection = R::COLLECTION;
        let txn = self.db.begin_write()?;

        let exists = txn
            .list_tables()?
            .any(|handle| handle.name() == collection.name());
        if !exists {
            txn.abort()?;
            return Err(RepositoryError::CollectionNotFound(collection));
        }

        let removed = {
            let mut table = txn.open_table(collection.table())?;
            let previous = table.remove(id.as_bytes().as_slice())?;
            previous.is_some()
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Store raw bytes under a key, bypassing serialization.
    #[cfg(test)]
    pub(crate) fn put_raw(&self, collection: Collection, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(collection.table())?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }
}
