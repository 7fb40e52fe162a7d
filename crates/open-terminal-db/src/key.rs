//! Key field definitions.
//!
//! Records are opaque byte blocks; every ordered operation (sort, search,
//! index) compares only a caller-chosen byte window of each record. A
//! [`KeyField`] names that window as an `(offset, length)` pair.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::DbError;

/// A byte window within a record, used as the comparison key.
///
/// Offsets are 0-based. Comparison is unsigned lexicographic over the raw
/// bytes, so stores that keep printable keys (barcodes, device ids) sort
/// the way their host application expects without any collation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyField {
    /// Window start within the record.
    pub offset: usize,
    /// Window length in bytes.
    pub length: usize,
}

impl KeyField {
    /// Creates a key field covering `[offset, offset + length)`.
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// Creates a key field covering the first `length` bytes of a record.
    pub fn leading(length: usize) -> Self {
        Self { offset: 0, length }
    }

    /// Validates that the window fits within a record of `record_size` bytes.
    pub fn check(&self, record_size: usize) -> Result<(), DbError> {
        match self.offset.checked_add(self.length) {
            Some(end) if end <= record_size => Ok(()),
            _ => Err(DbError::SortRangeTooLarge {
                offset: self.offset,
                length: self.length,
                record_size,
            }),
        }
    }

    /// Extracts the key window from a record.
    ///
    /// The window must fit the record; callers validate with [`check`]
    /// before touching record data.
    ///
    /// [`check`]: KeyField::check
    pub fn extract<'a>(&self, record: &'a [u8]) -> &'a [u8] {
        &record[self.offset..self.offset + self.length]
    }

    /// Compares the key windows of two records.
    pub fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        self.extract(a).cmp(self.extract(b))
    }
}
