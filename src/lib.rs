//! # xbase-reader
//!
//! A reader for xBase tables (`.dbf`) and their compact/compound indexes
//! (`.idx`/`.cdx`). Supports dBase III/IV/V and FoxPro table dialects.
//!
//! **Note:** Memo file (`.dbt`/`.fpt`) contents are not decoded; memo columns
//! surface their block pointer only.
pub mod xbase;

// Re-export the main types for convenience
pub use xbase::{
    codec::runs::{build_runs, compact_runs, ColumnRuns},
    search::{binary_search, exact_key, numeric_from_key, numeric_key, prefix_key},
    types::{
        column_types::{actual_type, ActualColumnType, DbfColumnType, TableDialect},
        index_models::{CdxIndexHeader, CdxLeafEntry, CdxNode, SortOrder},
        models::{DbfColumn, DbfHeader, DbfReadOptions, DbfRecord, DbfValue, RecordStatus},
    },
    utils::parse_encoding,
    CdxFile, DbfDataReader, DbfTable, ErrorKind, IndexSearcher, Result, XbaseError,
};
