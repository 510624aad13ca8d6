//! xBase table and index reading.
//!
//! - [`table`] / [`reader`]: DBF metadata and record streams
//! - [`index`] / [`search`]: compact and compound index B-trees
//! - [`iter`]: iterator adapters over both

pub mod codec;
pub mod format;
pub mod index;
pub mod iter;
pub mod reader;
pub mod search;
pub mod table;
pub mod types;
pub mod utils;

pub use index::CdxFile;
pub use reader::DbfDataReader;
pub use search::IndexSearcher;
pub use table::DbfTable;
pub use types::error::{ErrorKind, Result, XbaseError};
