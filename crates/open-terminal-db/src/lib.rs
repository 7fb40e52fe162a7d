//! Fixed-record flat-file database for data-collection terminals.
//!
//! This crate provides the record storage facility of a portable
//! terminal: a headerless file of fixed-size records driven through a
//! single cursor, with in-place sorts, key searches, and secondary
//! index files. Records are opaque byte blocks; every ordered
//! operation compares one caller-chosen byte window, so the same store
//! holds barcodes, article data, or count lists without any schema.
//!
//! All record movement happens one record at a time through the
//! cursor, so memory use stays flat no matter how large the store
//! grows.
//!
//! # Example
//!
//! ```ignore
//! use open_terminal_db::{quick_sort, KeyField, RecordStore, WriteMode};
//!
//! // Collect scans, then sort them by the article code.
//! let mut store = RecordStore::create("scans.dat", 16)?;
//! store.write(b"4902300112345678", WriteMode::Append)?;
//! store.write(b"1203800499990001", WriteMode::Append)?;
//! quick_sort(&mut store, KeyField::new(0, 8))?;
//!
//! let mut buf = [0u8; 16];
//! store.read_first(&mut buf)?;
//! ```
//!
//! # Features
//!
//! - Cursor navigation: first, last, next, previous, direct goto
//! - Overwrite-in-place and append writes, delete with compaction
//! - Insertion, heap, and quick sort over any key window
//! - Binary and linear search
//! - Secondary index files mapping keys to record numbers

pub mod error;
pub mod index;
pub mod key;
pub mod search;
pub mod sort;
pub mod store;

pub use error::DbError;
pub use index::IndexFile;
pub use key::KeyField;
pub use search::{binary_search, linear_search};
pub use sort::{heap_sort, insertion_sort, quick_sort, sort_with, SortAlgorithm, SortStats};
pub use store::{RecordStore, WriteMode};
