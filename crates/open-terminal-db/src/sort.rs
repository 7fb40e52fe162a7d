//! In-place record sorts driven through the store cursor.
//!
//! Three classic sorts rearrange a store's records in ascending order of
//! a [`KeyField`] window. All record movement goes through the store
//! cursor one record at a time; only a fixed handful of scratch records
//! is ever held in memory, so a store far larger than RAM still sorts.
//!
//! - [`insertion_sort`] is stable and fastest on nearly sorted stores;
//!   the index manager relies on it after appending a single entry.
//! - [`heap_sort`] has a fixed worst case and no extra stack.
//! - [`quick_sort`] is fastest on average and keeps a small segment
//!   stack sized on the digit count of the record total.
//!
//! A store with fewer than two records sorts trivially. Any I/O failure
//! aborts the sort at once; the record count never changes, but the
//! record order is whatever the aborted pass left behind.
//!
//! # Example
//!
//! ```ignore
//! use open_terminal_db::{quick_sort, KeyField, RecordStore};
//!
//! let mut store = RecordStore::open("items.dat", 9)?;
//! let stats = quick_sort(&mut store, KeyField::new(0, 4))?;
//! println!("sorted {} records", stats.records);
//! ```

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;
use crate::key::KeyField;
use crate::store::{scratch, RecordStore, WriteMode};

/// Selects which sort rearranges the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortAlgorithm {
    /// Stable shift sort, fastest when the store is already nearly sorted.
    Insertion,
    /// Heap sort, best on stores with no pre-existing order.
    Heap,
    /// Iterative quicksort with a midpoint-value pivot.
    Quick,
}

/// Cursor traffic of one sort run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortStats {
    /// Records in the store when the sort ran.
    pub records: u64,
    /// Record reads issued.
    pub reads: u64,
    /// Record writes issued.
    pub writes: u64,
}

/// Sorts `store` ascending on `key` with the chosen algorithm.
pub fn sort_with(
    store: &mut RecordStore,
    key: KeyField,
    algorithm: SortAlgorithm,
) -> Result<SortStats, DbError> {
    match algorithm {
        SortAlgorithm::Insertion => insertion_sort(store, key),
        SortAlgorithm::Heap => heap_sort(store, key),
        SortAlgorithm::Quick => quick_sort(store, key),
    }
}

/// Validates the store and window shared by every sort entry point.
fn prepare(store: &RecordStore, key: KeyField) -> Result<u64, DbError> {
    store.require_open()?;
    key.check(store.record_size())?;
    Ok(store.total())
}

// ---------------------------------------------------------------------------
// Insertion sort
// ---------------------------------------------------------------------------

/// Stable insertion sort ascending on the `key` window.
///
/// Walks positions `1..total`; each record shifts its sorted
/// predecessors up one slot until its place is found. Equal keys keep
/// their relative order. Two scratch records.
pub fn insertion_sort(store: &mut RecordStore, key: KeyField) -> Result<SortStats, DbError> {
    let total = prepare(store, key)?;
    let mut stats = SortStats {
        records: total,
        ..SortStats::default()
    };
    if total <= 1 {
        return Ok(stats);
    }
    let mut current = scratch(store.record_size())?;
    let mut predecessor = scratch(store.record_size())?;
    for i in 1..total {
        store.goto(i)?;
        store.read_current(&mut current)?;
        stats.reads += 1;
        let mut j = i;
        while j > 0 {
            store.goto(j - 1)?;
            store.read_current(&mut predecessor)?;
            stats.reads += 1;
            if key.compare(&current, &predecessor) != Ordering::Less {
                break;
            }
            store.goto(j)?;
            store.write(&predecessor, WriteMode::Overwrite)?;
            stats.writes += 1;
            j -= 1;
        }
        if j != i {
            store.goto(j)?;
            store.write(&current, WriteMode::Overwrite)?;
            stats.writes += 1;
        }
    }
    debug!(
        "insertion sort of {} records: {} reads, {} writes",
        stats.records, stats.reads, stats.writes
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Heap sort
// ---------------------------------------------------------------------------

struct HeapScratch {
    root: Vec<u8>,
    child: Vec<u8>,
    sibling: Vec<u8>,
}

/// Sinks heap position `k` (1-based; disk position `k - 1`) until the
/// max-heap property holds over the first `max` records.
fn downheap(
    store: &mut RecordStore,
    key: KeyField,
    max: u64,
    mut k: u64,
    bufs: &mut HeapScratch,
    stats: &mut SortStats,
) -> Result<(), DbError> {
    store.goto(k - 1)?;
    store.read_current(&mut bufs.root)?;
    stats.reads += 1;
    let half = max >> 1;
    while k <= half {
        let mut j = k + k;
        store.goto(j - 1)?;
        store.read_current(&mut bufs.child)?;
        stats.reads += 1;
        if j < max {
            store.goto(j)?;
            store.read_current(&mut bufs.sibling)?;
            stats.reads += 1;
            if key.compare(&bufs.child, &bufs.sibling) == Ordering::Less {
                bufs.child.copy_from_slice(&bufs.sibling);
                j += 1;
            }
        }
        store.goto(k - 1)?;
        if key.compare(&bufs.root, &bufs.child) != Ordering::Less {
            break;
        }
        store.write(&bufs.child, WriteMode::Overwrite)?;
        stats.writes += 1;
        k = j;
    }
    store.goto(k - 1)?;
    store.write(&bufs.root, WriteMode::Overwrite)?;
    stats.writes += 1;
    Ok(())
}

/// Heap sort ascending on the `key` window.
///
/// Builds a max-heap over the record positions, then repeatedly swaps
/// the root with the last record of a shrinking heap. Three scratch
/// records. Not stable.
pub fn heap_sort(store: &mut RecordStore, key: KeyField) -> Result<SortStats, DbError> {
    let total = prepare(store, key)?;
    let mut stats = SortStats {
        records: total,
        ..SortStats::default()
    };
    if total <= 1 {
        return Ok(stats);
    }
    let mut bufs = HeapScratch {
        root: scratch(store.record_size())?,
        child: scratch(store.record_size())?,
        sibling: scratch(store.record_size())?,
    };
    for k in (1..=(total >> 1)).rev() {
        downheap(store, key, total, k, &mut bufs, &mut stats)?;
    }
    let mut heap = total;
    while heap > 1 {
        store.read_first(&mut bufs.root)?;
        stats.reads += 1;
        store.goto(heap - 1)?;
        store.read_current(&mut bufs.child)?;
        stats.reads += 1;
        store.write(&bufs.root, WriteMode::Overwrite)?;
        stats.writes += 1;
        store.goto(0)?;
        store.write(&bufs.child, WriteMode::Overwrite)?;
        stats.writes += 1;
        heap -= 1;
        downheap(store, key, heap, 1, &mut bufs, &mut stats)?;
    }
    debug!(
        "heap sort of {} records: {} reads, {} writes",
        stats.records, stats.reads, stats.writes
    );
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Quick sort
// ---------------------------------------------------------------------------

/// Iterative quicksort ascending on the `key` window.
///
/// Hoare partition around the record value found at the midpoint of
/// each segment; the right part of every split is stacked, the left is
/// iterated. Three scratch records plus the segment stack. Not stable.
pub fn quick_sort(store: &mut RecordStore, key: KeyField) -> Result<SortStats, DbError> {
    let total = prepare(store, key)?;
    let mut stats = SortStats {
        records: total,
        ..SortStats::default()
    };
    if total <= 1 {
        return Ok(stats);
    }
    let mut pivot = scratch(store.record_size())?;
    let mut lower = scratch(store.record_size())?;
    let mut upper = scratch(store.record_size())?;

    let mut digits = 1usize;
    let mut n = total / 10;
    while n != 0 {
        digits += 1;
        n /= 10;
    }
    let capacity = digits * 4 + 10;
    let mut segments: Vec<(i64, i64)> = Vec::new();
    segments
        .try_reserve_exact(capacity)
        .map_err(|_| DbError::AllocationFailed {
            bytes: capacity * std::mem::size_of::<(i64, i64)>(),
        })?;

    // Signed positions: the upper scan walks one slot below the
    // segment before the final bound check.
    segments.push((0, total as i64 - 1));
    while let Some((l, mut r)) = segments.pop() {
        loop {
            let mut i = l;
            let mut j = r;
            store.goto(((l + r) >> 1) as u64)?;
            store.read_current(&mut pivot)?;
            stats.reads += 1;
            loop {
                store.goto(i as u64)?;
                store.read_current(&mut lower)?;
                stats.reads += 1;
                while key.compare(&lower, &pivot) == Ordering::Less {
                    i += 1;
                    store.goto(i as u64)?;
                    store.read_current(&mut lower)?;
                    stats.reads += 1;
                }
                store.goto(j as u64)?;
                store.read_current(&mut upper)?;
                stats.reads += 1;
                while key.compare(&upper, &pivot) == Ordering::Greater {
                    j -= 1;
                    store.goto(j as u64)?;
                    store.read_current(&mut upper)?;
                    stats.reads += 1;
                }
                if i <= j {
                    // Cursor sits on j after the upper scan.
                    store.write(&lower, WriteMode::Overwrite)?;
                    stats.writes += 1;
                    store.goto(i as u64)?;
                    store.write(&upper, WriteMode::Overwrite)?;
                    stats.writes += 1;
                    i += 1;
                    j -= 1;
                }
                if i > j {
                    break;
                }
            }
            if i < r {
                segments.push((i, r));
            }
            r = j;
            if l >= r {
                break;
            }
        }
    }
    debug!(
        "quick sort of {} records: {} reads, {} writes",
        stats.records, stats.reads, stats.writes
    );
    Ok(stats)
}
