//! Custom error types for the xbase-reader crate.

use thiserror::Error;

use super::column_types::TableDialect;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum XbaseError {
    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    /// A fixed-size header or region could not be read in full, or its size is inconsistent.
    #[error("Invalid format: {0}")]
    Format(String),

    /// Fewer bytes were available than a primitive read requested.
    #[error("Truncated read at offset {offset}: requested {requested} bytes, {available} available")]
    TruncatedRead {
        offset: u64,
        requested: usize,
        available: usize,
    },

    /// The declared column type has no decoding in the table's dialect.
    #[error("Unsupported column type {declared:#04x} for {dialect:?} tables")]
    UnsupportedColumnType { declared: u8, dialect: TableDialect },

    /// A deliberately unsupported feature was requested.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Decoding exists in the format but is not provided by this crate (memo files).
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    /// A column's declared length does not match the width its type requires.
    #[error("Column '{column}' has length {found}, expected {expected}")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// A column's declared decimal count does not match what its type requires.
    #[error("Column '{column}' has decimal count {found}, expected {expected}")]
    ColumnDecimalCountMismatch {
        column: String,
        expected: u8,
        found: u8,
    },

    #[error("Column '{column}' holds invalid boolean byte {byte:#04x}")]
    InvalidBoolean { column: String, byte: u8 },

    #[error("Column '{column}' holds unparseable number {text:?}")]
    InvalidNumber { column: String, text: String },

    #[error("Column '{column}' holds unparseable date {text:?}")]
    InvalidDate { column: String, text: String },

    #[error("Column '{column}' holds invalid datetime (days={days}, milliseconds={milliseconds})")]
    InvalidDateTime {
        column: String,
        days: i32,
        milliseconds: i32,
    },

    /// The decoded columns did not consume exactly one record's worth of bytes.
    #[error("Record at offset {offset}: decoded {actual} bytes, record length is {expected}")]
    RecordLengthMismatch {
        offset: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Node at offset {offset} has invalid attributes {attributes:#06x}")]
    InvalidNodeAttributes { offset: u64, attributes: u16 },

    #[error("Interior node at offset {offset}: {key_count} keys of length {key_length} overflow the key block")]
    InvalidInteriorNodeKeyCount {
        offset: u64,
        key_count: u16,
        key_length: u16,
    },

    #[error("Interior node at offset {offset} has no keys")]
    EmptyInteriorNode { offset: u64 },

    #[error("Leaf node at offset {offset}: first key entry has {duplicate_bytes} duplicate bytes")]
    FirstLeafNodeKeyEntryHasDuplicateBytes { offset: u64, duplicate_bytes: u32 },

    #[error("Leaf node at offset {offset}: key {key_index} starts at pool index {start}, below {limit}")]
    InvalidLeafNodeCalculatedKeyStartIndex {
        offset: u64,
        key_index: usize,
        start: isize,
        limit: usize,
    },

    #[error("Leaf node at offset {offset}: key {key_index} copies {duplicate_bytes} bytes from a {previous_len}-byte predecessor")]
    InvalidLeafNodeDuplicateBytes {
        offset: u64,
        key_index: usize,
        duplicate_bytes: u32,
        previous_len: usize,
    },

    #[error("Leaf node at offset {offset}: key {key_index} strips {stripped} of {key_length} key bytes")]
    InvalidLeafNodeKeyLength {
        offset: u64,
        key_index: usize,
        stripped: u32,
        key_length: u16,
    },

    #[error("Leaf node at offset {offset}: invalid packing descriptor ({detail})")]
    InvalidLeafNodePacking { offset: u64, detail: String },

    #[error("Leftmost leaf at offset {offset} has left sibling {left_sibling}")]
    LeftmostNodeHasLeftSibling { offset: u64, left_sibling: u64 },

    #[error("Leaf at offset {offset} links to already visited leaf {right_sibling}")]
    LeafChainCycle { offset: u64, right_sibling: u64 },

    #[error("Column index {index} is out of range for a table with {count} columns")]
    ColumnIndexOutOfRange { index: usize, count: usize },

    #[error("The data reader has been closed")]
    ReaderClosed,

    /// A mutex lock was poisoned, indicating a panic in another thread holding the lock.
    #[error("A mutex lock was poisoned, indicating a panic in another thread holding the lock.")]
    LockPoisoned,
}

/// Coarse classification of an [`XbaseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    /// Short read or size mismatch of a fixed region.
    Format,
    /// A structural invariant of the file is violated.
    Corruption,
    /// Out-of-scope feature or dialect combination.
    Unsupported,
    /// A single field's bytes are malformed.
    ValueFormat,
    /// The API was used incorrectly.
    Usage,
}

impl XbaseError {
    pub fn kind(&self) -> ErrorKind {
        use XbaseError::*;
        match self {
            Io(_) => ErrorKind::Io,
            Format(_) | TruncatedRead { .. } | ColumnLengthMismatch { .. }
            | ColumnDecimalCountMismatch { .. } => ErrorKind::Format,
            RecordLengthMismatch { .. }
            | InvalidNodeAttributes { .. }
            | InvalidInteriorNodeKeyCount { .. }
            | EmptyInteriorNode { .. }
            | FirstLeafNodeKeyEntryHasDuplicateBytes { .. }
            | InvalidLeafNodeCalculatedKeyStartIndex { .. }
            | InvalidLeafNodeDuplicateBytes { .. }
            | InvalidLeafNodeKeyLength { .. }
            | InvalidLeafNodePacking { .. }
            | LeftmostNodeHasLeftSibling { .. }
            | LeafChainCycle { .. } => ErrorKind::Corruption,
            UnsupportedColumnType { .. } | Unsupported(_) | NotImplemented(_) => {
                ErrorKind::Unsupported
            }
            InvalidBoolean { .. }
            | InvalidNumber { .. }
            | InvalidDate { .. }
            | InvalidDateTime { .. } => ErrorKind::ValueFormat,
            ColumnIndexOutOfRange { .. } | ReaderClosed | LockPoisoned => ErrorKind::Usage,
        }
    }
}

/// A convenience `Result` type alias using the crate's `XbaseError` type.
pub type Result<T> = std::result::Result<T, XbaseError>;
