//! Secondary index files.
//!
//! An index is itself a record store: every entry is the key window of
//! one source record followed by that record's position as four bytes
//! little-endian. [`IndexFile::build`] scans the source once and sorts
//! the entries, after which [`IndexFile::search`] resolves a key to a
//! source record number by bisection without touching the source store.
//!
//! Entries capture positions at build or insert time only. Deleting,
//! sorting, or overwriting source records afterwards leaves the index
//! stale; keeping it current (or rebuilding) is the caller's job.
//!
//! # Example
//!
//! ```ignore
//! use open_terminal_db::{IndexFile, KeyField, RecordStore};
//!
//! let mut items = RecordStore::open("items.dat", 32)?;
//! let mut index = IndexFile::build(&mut items, KeyField::new(0, 12), "items.idx")?;
//!
//! let position = index.search(b"490123456789")?;
//! items.goto(position)?;
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::DbError;
use crate::key::KeyField;
use crate::search::binary_search;
use crate::sort::{insertion_sort, quick_sort};
use crate::store::{scratch, RecordStore, WriteMode};

/// Width of the record-number suffix at the end of every index entry.
const POSITION_SUFFIX: usize = 4;

/// A sorted key-to-position index over a source record store.
///
/// The index owns its own open [`RecordStore`] with
/// `record_size = key_size + 4` and keeps its entries sorted ascending
/// on the leading `key_size` bytes between public operations.
#[derive(Debug)]
pub struct IndexFile {
    store: RecordStore,
    key_size: usize,
}

impl IndexFile {
    /// Builds an index over `source` at `index_path`.
    ///
    /// `key` names the window of each source record to index. Every
    /// source record contributes one entry holding its window bytes and
    /// its position; the entries are then quick-sorted on the key. The
    /// source must be open and non-empty, and its order is not touched.
    ///
    /// If anything fails after the index file is created, the partial
    /// file is removed before the error is returned.
    pub fn build<P: AsRef<Path>>(
        source: &mut RecordStore,
        key: KeyField,
        index_path: P,
    ) -> Result<IndexFile, DbError> {
        source.require_open()?;
        key.check(source.record_size())?;
        if source.total() == 0 {
            return Err(DbError::Empty);
        }
        // Positions are stored as four bytes; a source this large
        // cannot be indexed.
        if source.total() > u32::MAX as u64 + 1 {
            return Err(DbError::InvalidRecordNumber {
                requested: u32::MAX as i64 + 1,
                total: source.total(),
            });
        }
        let index_path = index_path.as_ref();
        let store = RecordStore::create(index_path, key.length + POSITION_SUFFIX)?;
        let mut index = IndexFile {
            store,
            key_size: key.length,
        };
        match index.fill(source, key) {
            Ok(()) => Ok(index),
            Err(err) => {
                index.store.close();
                let _ = std::fs::remove_file(index_path);
                Err(err)
            }
        }
    }

    fn fill(&mut self, source: &mut RecordStore, key: KeyField) -> Result<(), DbError> {
        let mut record = scratch(source.record_size())?;
        let mut entry = scratch(self.store.record_size())?;
        for position in 0..source.total() {
            source.goto(position)?;
            source.read_current(&mut record)?;
            entry[..self.key_size].copy_from_slice(key.extract(&record));
            entry[self.key_size..].copy_from_slice(&(position as u32).to_le_bytes());
            self.store.write(&entry, WriteMode::Append)?;
        }
        quick_sort(&mut self.store, KeyField::leading(self.key_size))?;
        debug!(
            "built index '{}' on window ({}, {}) with {} entries",
            self.store.path().display(),
            key.offset,
            key.length,
            self.store.total()
        );
        Ok(())
    }

    /// Opens an existing index file built with keys of `key_size` bytes.
    pub fn open<P: AsRef<Path>>(path: P, key_size: usize) -> Result<IndexFile, DbError> {
        let store = RecordStore::open(path, key_size + POSITION_SUFFIX)?;
        Ok(IndexFile { store, key_size })
    }

    /// Resolves `key` to the source record number it was indexed with.
    ///
    /// `key` must be exactly `key_size` bytes. With duplicate keys,
    /// which entry resolves is unspecified. The index cursor is left on
    /// the matched entry.
    pub fn search(&mut self, key: &[u8]) -> Result<u64, DbError> {
        self.store.require_open()?;
        if key.len() != self.key_size {
            return Err(DbError::WrongRecordLength {
                expected: self.key_size,
                actual: key.len(),
            });
        }
        if self.store.total() == 0 {
            return Err(DbError::Empty);
        }
        binary_search(&mut self.store, key, 0)?;
        let mut entry = scratch(self.store.record_size())?;
        self.store.read_current(&mut entry)?;
        let mut suffix = [0u8; POSITION_SUFFIX];
        suffix.copy_from_slice(&entry[self.key_size..]);
        Ok(u32::from_le_bytes(suffix) as u64)
    }

    /// Adds one entry mapping `key` to `record_number`.
    ///
    /// The entry is appended and the index re-sorted; with one record
    /// out of place the insertion sort shifts just that entry into its
    /// slot. The caller is trusted about `record_number`; the source
    /// store is not consulted.
    pub fn insert(&mut self, key: &[u8], record_number: u64) -> Result<(), DbError> {
        self.store.require_open()?;
        if key.len() != self.key_size {
            return Err(DbError::WrongRecordLength {
                expected: self.key_size,
                actual: key.len(),
            });
        }
        if record_number > u32::MAX as u64 {
            return Err(DbError::InvalidRecordNumber {
                requested: i64::try_from(record_number).unwrap_or(i64::MAX),
                total: self.store.total(),
            });
        }
        let mut entry = scratch(self.store.record_size())?;
        entry[..self.key_size].copy_from_slice(key);
        entry[self.key_size..].copy_from_slice(&(record_number as u32).to_le_bytes());
        self.store.write(&entry, WriteMode::Append)?;
        insertion_sort(&mut self.store, KeyField::leading(self.key_size))?;
        Ok(())
    }

    /// Returns the key width this index was built with.
    pub fn key_size(&self) -> usize {
        self.key_size
    }

    /// Returns the number of entries.
    pub fn len(&self) -> u64 {
        self.store.total()
    }

    /// Returns `true` when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.store.total() == 0
    }

    /// Returns the underlying entry store.
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Returns the underlying entry store mutably, for hosts that
    /// scroll index entries like any other store.
    pub fn store_mut(&mut self) -> &mut RecordStore {
        &mut self.store
    }

    /// Closes the underlying store.
    pub fn close(&mut self) {
        self.store.close();
    }

    /// Consumes the index, yielding the underlying store.
    pub fn into_store(self) -> RecordStore {
        self.store
    }
}
