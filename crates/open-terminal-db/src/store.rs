//! Fixed-record store over a single flat file.
//!
//! A [`RecordStore`] is a file divided into records of one fixed size,
//! addressed by zero-based record number. The store keeps a single
//! cursor; reads and writes go through it, so every operation that
//! touches a record also positions the cursor. There is no header, no
//! free list and no per-record metadata: record `n` lives at byte
//! offset `n * record_size`, and the record count is always
//! `file_len / record_size`.
//!
//! # Example
//!
//! ```ignore
//! use open_terminal_db::{RecordStore, WriteMode};
//!
//! let mut store = RecordStore::create("items.dat", 32)?;
//! store.write(&[0u8; 32], WriteMode::Append)?;
//!
//! let mut buf = vec![0u8; 32];
//! store.read_first(&mut buf)?;
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;

/// How [`RecordStore::write`] places a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteMode {
    /// Replace the record under the cursor in place.
    Overwrite,
    /// Add a new record at the end of the store.
    Append,
}

impl WriteMode {
    /// Decodes the numeric write flag used by terminal applications
    /// (1 = overwrite, 2 = append).
    pub fn from_flag(flag: u8) -> Result<Self, DbError> {
        match flag {
            1 => Ok(WriteMode::Overwrite),
            2 => Ok(WriteMode::Append),
            other => Err(DbError::InvalidWriteFlag { flag: other }),
        }
    }

    /// Returns the numeric write flag for this mode.
    pub fn flag(&self) -> u8 {
        match self {
            WriteMode::Overwrite => 1,
            WriteMode::Append => 2,
        }
    }
}

/// Allocates a zeroed scratch buffer, reporting allocation failure
/// instead of aborting.
pub(crate) fn scratch(len: usize) -> Result<Vec<u8>, DbError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| DbError::AllocationFailed { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// A flat file of fixed-size records with a single cursor.
///
/// The cursor is `None` only while the store holds no records; as soon
/// as a record exists the cursor points at a valid record number. All
/// record I/O is unbuffered and hits the file directly, so a store can
/// be arbitrarily larger than memory.
#[derive(Debug)]
pub struct RecordStore {
    /// Path of the backing file.
    path: PathBuf,
    /// Open handle, `None` once the store is closed.
    file: Option<File>,
    /// Fixed size of every record in bytes.
    record_size: usize,
    /// Current record, `None` while the store is empty.
    cursor: Option<u64>,
    /// Number of records in the store.
    total: u64,
}

impl RecordStore {
    /// Creates a new store at `path`, truncating any existing file.
    ///
    /// The new store is open, empty, and has no cursor.
    pub fn create<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        if record_size == 0 {
            return Err(DbError::RecordSizeMismatch {
                record_size,
                file_len: 0,
            });
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| DbError::OpenFailed {
                path: path.display().to_string(),
                source,
            })?;
        debug!(
            "created record store '{}' with record size {}",
            path.display(),
            record_size
        );
        Ok(RecordStore {
            path,
            file: Some(file),
            record_size,
            cursor: None,
            total: 0,
        })
    }

    /// Opens an existing store at `path`.
    ///
    /// The file length must be an exact multiple of `record_size`;
    /// anything else means the file does not hold records of that size
    /// and the open is refused. On success the cursor sits on record 0,
    /// or nowhere if the store is empty.
    pub fn open<P: AsRef<Path>>(path: P, record_size: usize) -> Result<Self, DbError> {
        let path = path.as_ref().to_path_buf();
        let (file, total) = open_file(&path, record_size)?;
        debug!(
            "opened record store '{}' with {} records of {} bytes",
            path.display(),
            total,
            record_size
        );
        Ok(RecordStore {
            path,
            file: Some(file),
            record_size,
            cursor: if total > 0 { Some(0) } else { None },
            total,
        })
    }

    /// Closes the store, releasing the file handle.
    ///
    /// Closing an already closed store does nothing. Every record
    /// operation on a closed store fails with [`DbError::NotOpen`].
    pub fn close(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            debug!("closed record store '{}'", self.path.display());
        }
    }

    /// Reopens a store that was previously closed.
    ///
    /// Fails with [`DbError::AlreadyOpen`] if the store is still open.
    /// The record count is re-read from the file, so records appended
    /// by another writer while the store was closed are picked up.
    pub fn reopen(&mut self) -> Result<(), DbError> {
        if self.file.is_some() {
            return Err(DbError::AlreadyOpen {
                path: self.path.display().to_string(),
            });
        }
        let (file, total) = open_file(&self.path, self.record_size)?;
        debug!(
            "reopened record store '{}' with {} records",
            self.path.display(),
            total
        );
        self.file = Some(file);
        self.total = total;
        self.cursor = if total > 0 { Some(0) } else { None };
        Ok(())
    }

    /// Moves the cursor to `record_number` without reading.
    pub fn goto(&mut self, record_number: u64) -> Result<(), DbError> {
        self.require_open()?;
        if record_number >= self.total {
            return Err(DbError::InvalidRecordNumber {
                requested: record_number as i64,
                total: self.total,
            });
        }
        self.cursor = Some(record_number);
        Ok(())
    }

    /// Reads the record under the cursor into `buf`.
    ///
    /// `buf` must be exactly one record long. If the read fails partway
    /// the first byte of `buf` is zeroed so a stale buffer cannot pass
    /// for a record.
    pub fn read_current(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        let current = self.require_current()?;
        if buf.len() != self.record_size {
            return Err(DbError::WrongRecordLength {
                expected: self.record_size,
                actual: buf.len(),
            });
        }
        self.read_record_at(current, buf)
    }

    /// Moves the cursor to the first record and reads it.
    pub fn read_first(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        self.goto(0)?;
        self.read_current(buf)
    }

    /// Moves the cursor to the last record and reads it.
    pub fn read_last(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        self.require_open()?;
        match self.total.checked_sub(1) {
            Some(last) => {
                self.goto(last)?;
                self.read_current(buf)
            }
            None => Err(DbError::InvalidRecordNumber {
                requested: -1,
                total: 0,
            }),
        }
    }

    /// Advances the cursor one record and reads it.
    ///
    /// Fails with [`DbError::InvalidRecordNumber`] when the cursor is
    /// already on the last record; the cursor does not move.
    pub fn read_next(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        let current = self.require_current()?;
        self.goto(current + 1)?;
        self.read_current(buf)
    }

    /// Steps the cursor back one record and reads it.
    ///
    /// Fails with [`DbError::InvalidRecordNumber`] when the cursor is
    /// already on the first record; the cursor does not move.
    pub fn read_previous(&mut self, buf: &mut [u8]) -> Result<(), DbError> {
        let current = self.require_current()?;
        match current.checked_sub(1) {
            Some(previous) => {
                self.goto(previous)?;
                self.read_current(buf)
            }
            None => Err(DbError::InvalidRecordNumber {
                requested: -1,
                total: self.total,
            }),
        }
    }

    /// Writes `record` according to `mode`.
    ///
    /// [`WriteMode::Overwrite`] replaces the record under the cursor and
    /// leaves the cursor where it was. [`WriteMode::Append`] adds the
    /// record at the end of the store and moves the cursor onto it.
    pub fn write(&mut self, record: &[u8], mode: WriteMode) -> Result<(), DbError> {
        self.require_open()?;
        if record.len() != self.record_size {
            return Err(DbError::WrongRecordLength {
                expected: self.record_size,
                actual: record.len(),
            });
        }
        match mode {
            WriteMode::Overwrite => {
                let current = self.require_current()?;
                self.write_record_at(current, record)
            }
            WriteMode::Append => {
                let position = self.total;
                let file = self.handle()?;
                file.seek(SeekFrom::End(0)).map_err(|source| DbError::SeekFailed {
                    record: position,
                    source,
                })?;
                file.write_all(record).map_err(|source| DbError::WriteFailed {
                    record: position,
                    source,
                })?;
                self.total += 1;
                self.cursor = Some(position);
                Ok(())
            }
        }
    }

    /// Deletes record `record_number`, shifting every later record down
    /// one slot and shrinking the file by one record.
    ///
    /// On success the cursor sits on the record that slid into the
    /// freed slot, or on the new last record when the deleted record
    /// was the last one. A failure while shifting leaves the record
    /// count unchanged. A failure while shrinking the file closes the
    /// store, because the tail record now exists twice and the count
    /// can no longer be trusted.
    pub fn delete(&mut self, record_number: u64) -> Result<(), DbError> {
        self.require_open()?;
        self.goto(record_number)?;
        let mut shuttle = scratch(self.record_size)?;
        for from in record_number + 1..self.total {
            self.read_record_at(from, &mut shuttle)?;
            self.write_record_at(from - 1, &shuttle)?;
        }
        let new_len = (self.total - 1) * self.record_size as u64;
        let file = self.handle()?;
        if let Err(source) = file.set_len(new_len) {
            self.close();
            return Err(DbError::ChangeSizeFailed {
                expected_len: new_len,
                source,
            });
        }
        self.total -= 1;
        self.cursor = if self.total == 0 {
            None
        } else {
            Some(record_number.min(self.total - 1))
        };
        debug!(
            "deleted record {} from '{}', {} records remain",
            record_number,
            self.path.display(),
            self.total
        );
        Ok(())
    }

    /// Returns the number of records in the store.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns the cursor position, or `None` while the store is empty.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Returns the fixed record size in bytes.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Returns `true` while the backing file is open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn require_open(&self) -> Result<(), DbError> {
        if self.file.is_some() {
            Ok(())
        } else {
            Err(DbError::NotOpen)
        }
    }

    fn require_current(&self) -> Result<u64, DbError> {
        self.require_open()?;
        self.cursor.ok_or(DbError::Empty)
    }

    fn handle(&mut self) -> Result<&mut File, DbError> {
        self.file.as_mut().ok_or(DbError::NotOpen)
    }

    /// Seeks to `record` and fills `buf` from the file. `buf` is
    /// assumed to be exactly one record long.
    pub(crate) fn read_record_at(&mut self, record: u64, buf: &mut [u8]) -> Result<(), DbError> {
        let offset = record * self.record_size as u64;
        let file = self.handle()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| DbError::SeekFailed { record, source })?;
        if let Err(source) = file.read_exact(buf) {
            buf[0] = 0;
            return Err(DbError::ReadFailed { record, source });
        }
        Ok(())
    }

    /// Seeks to `record` and writes `buf` over it in place.
    pub(crate) fn write_record_at(&mut self, record: u64, buf: &[u8]) -> Result<(), DbError> {
        let offset = record * self.record_size as u64;
        let file = self.handle()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| DbError::SeekFailed { record, source })?;
        file.write_all(buf)
            .map_err(|source| DbError::WriteFailed { record, source })?;
        Ok(())
    }
}

fn open_file(path: &Path, record_size: usize) -> Result<(File, u64), DbError> {
    if record_size == 0 {
        return Err(DbError::RecordSizeMismatch {
            record_size,
            file_len: 0,
        });
    }
    let metadata = std::fs::metadata(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            DbError::NotExist {
                path: path.display().to_string(),
            }
        } else {
            DbError::OpenFailed {
                path: path.display().to_string(),
                source,
            }
        }
    })?;
    let file_len = metadata.len();
    if file_len % record_size as u64 != 0 {
        return Err(DbError::RecordSizeMismatch {
            record_size,
            file_len,
        });
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| DbError::OpenFailed {
            path: path.display().to_string(),
            source,
        })?;
    Ok((file, file_len / record_size as u64))
}
