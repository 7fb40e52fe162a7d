//! Record lookup by key window.
//!
//! Two lookups over a [`RecordStore`]: a bisection for stores kept
//! sorted on the key window, and a front-to-back scan for everything
//! else. Both compare the caller's key against the window starting at
//! `offset` in each record, probe records one at a time through the
//! cursor, and leave the cursor on the matching record so the caller
//! can fetch or overwrite it directly.

use std::cmp::Ordering;

use crate::error::DbError;
use crate::key::KeyField;
use crate::store::{scratch, RecordStore};

/// Finds a record by bisection over a store sorted ascending on the
/// key window at `offset`.
///
/// The window length is the length of `key`. Returns the position of a
/// record whose window equals `key`; when several records share the
/// key, which one is returned is unspecified. The cursor is left on
/// the returned record. Misses on either side of the key range report
/// [`DbError::NotFound`].
pub fn binary_search(
    store: &mut RecordStore,
    key: &[u8],
    offset: usize,
) -> Result<u64, DbError> {
    store.require_open()?;
    let window = KeyField::new(offset, key.len());
    window.check(store.record_size())?;
    if store.total() == 0 {
        return Err(DbError::NotFound);
    }
    let mut buf = scratch(store.record_size())?;
    let mut min: u64 = 0;
    let mut max: u64 = store.total() - 1;
    while min <= max {
        let current = ((max - min) >> 1) + min;
        store.goto(current)?;
        store.read_current(&mut buf)?;
        match key.cmp(window.extract(&buf)) {
            Ordering::Equal => return Ok(current),
            Ordering::Less => match current.checked_sub(1) {
                Some(below) => max = below,
                None => break,
            },
            Ordering::Greater => min = current + 1,
        }
    }
    Err(DbError::NotFound)
}

/// Finds a record by scanning the store front to back.
///
/// No ordering requirement; the first record whose window at `offset`
/// equals `key` wins. The cursor is left on the returned record.
pub fn linear_search(
    store: &mut RecordStore,
    key: &[u8],
    offset: usize,
) -> Result<u64, DbError> {
    store.require_open()?;
    let window = KeyField::new(offset, key.len());
    window.check(store.record_size())?;
    let mut buf = scratch(store.record_size())?;
    for position in 0..store.total() {
        store.goto(position)?;
        store.read_current(&mut buf)?;
        if window.extract(&buf) == key {
            return Ok(position);
        }
    }
    Err(DbError::NotFound)
}
