//! Error types for record store operations.

use miette::Diagnostic;
use thiserror::Error;

/// Errors returned by record store, sort, search, and index operations.
///
/// Every operation reports its own outcome; there is no retry and no
/// shared error state. The one special case is [`DbError::ChangeSizeFailed`]:
/// the store closes itself before returning it, and stays unusable until
/// the caller revalidates with `RecordStore::reopen`.
#[derive(Debug, Error, Diagnostic)]
pub enum DbError {
    /// The store already holds an open file handle.
    #[error("store is already open: {path}")]
    #[diagnostic(
        code(db::already_open),
        help("close() the store before reopening it")
    )]
    AlreadyOpen {
        /// Path of the open file.
        path: String,
    },

    /// The store has been closed (or never opened).
    #[error("store is not open")]
    #[diagnostic(code(db::not_open))]
    NotOpen,

    /// The file does not exist.
    #[error("database file not found: {path}")]
    #[diagnostic(code(db::not_exist))]
    NotExist {
        /// Path that was looked up.
        path: String,
    },

    /// Creating or opening the file failed at the filesystem level.
    #[error("failed to open {path}")]
    #[diagnostic(code(db::open_failed))]
    OpenFailed {
        /// Path that failed to open.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store holds no records, so there is no current record.
    #[error("database is empty")]
    #[diagnostic(code(db::empty))]
    Empty,

    /// The file length is not an exact multiple of the record size.
    #[error("file length {file_len} is not a multiple of record size {record_size}")]
    #[diagnostic(
        code(db::record_size_mismatch),
        help("the record size must match the one the store was created with")
    )]
    RecordSizeMismatch {
        /// Record size supplied by the caller.
        record_size: usize,
        /// Actual file length in bytes.
        file_len: u64,
    },

    /// A record number outside `[0, total)` was requested.
    #[error("invalid record number {requested}: store has {total} records")]
    #[diagnostic(code(db::invalid_record_number))]
    InvalidRecordNumber {
        /// The out-of-range position (-1 for one-before-first).
        requested: i64,
        /// Total records in the store.
        total: u64,
    },

    /// Seeking to a record position failed.
    #[error("seek to record {record} failed")]
    #[diagnostic(code(db::seek_failed))]
    SeekFailed {
        /// Record position being sought.
        record: u64,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading a record failed, or fewer bytes than one record came back.
    #[error("read of record {record} failed")]
    #[diagnostic(code(db::read_failed))]
    ReadFailed {
        /// Record position being read.
        record: u64,
        /// Underlying I/O error (short reads surface as `UnexpectedEof`).
        #[source]
        source: std::io::Error,
    },

    /// Writing a record failed.
    #[error("write of record {record} failed")]
    #[diagnostic(code(db::write_failed))]
    WriteFailed {
        /// Record position being written.
        record: u64,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A legacy write flag byte was neither overwrite (1) nor append (2).
    #[error("invalid write flag {flag}")]
    #[diagnostic(code(db::invalid_write_flag))]
    InvalidWriteFlag {
        /// The rejected flag value.
        flag: u8,
    },

    /// Truncating the file after a delete failed. The store closes itself
    /// before reporting this: the record count and the file length have
    /// diverged, and only a fresh open may derive the count again.
    #[error("failed to resize database file to {expected_len} bytes")]
    #[diagnostic(
        code(db::change_size_failed),
        help("the store is closed; reopen() it to revalidate the record count")
    )]
    ChangeSizeFailed {
        /// File length the truncation should have produced.
        expected_len: u64,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Allocating a scratch buffer failed.
    #[error("failed to allocate {bytes} bytes of scratch space")]
    #[diagnostic(code(db::allocation_failed))]
    AllocationFailed {
        /// Requested allocation size.
        bytes: usize,
    },

    /// The key window extends past the end of the record.
    #[error("key window at offset {offset}, length {length} exceeds record size {record_size}")]
    #[diagnostic(code(db::sort_range_too_large))]
    SortRangeTooLarge {
        /// Window start within the record.
        offset: usize,
        /// Window length in bytes.
        length: usize,
        /// Record size of the store.
        record_size: usize,
    },

    /// No record matched the search key.
    #[error("search key not found")]
    #[diagnostic(code(db::not_found))]
    NotFound,

    /// A caller-supplied buffer or key has the wrong length.
    #[error("buffer of {actual} bytes does not match expected length {expected}")]
    #[diagnostic(code(db::wrong_record_length))]
    WrongRecordLength {
        /// Length the operation requires.
        expected: usize,
        /// Length the caller supplied.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DbError::InvalidRecordNumber {
            requested: 5,
            total: 3,
        };
        assert_eq!(err.to_string(), "invalid record number 5: store has 3 records");

        let err = DbError::SortRangeTooLarge {
            offset: 4,
            length: 8,
            record_size: 9,
        };
        assert!(err.to_string().contains("exceeds record size 9"));

        assert_eq!(DbError::NotFound.to_string(), "search key not found");
    }

    #[test]
    fn test_previous_of_first_reads_as_minus_one() {
        let err = DbError::InvalidRecordNumber {
            requested: -1,
            total: 4,
        };
        assert!(err.to_string().contains("-1"));
    }
}
