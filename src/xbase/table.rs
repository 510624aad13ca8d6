use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use log::{debug, info, warn};

use super::codec::runs::ColumnRuns;
use super::format::dbf_header;
use super::reader::DbfDataReader;
use super::types::error::{Result, XbaseError};
use super::types::models::{DbfColumn, DbfHeader, DbfReadOptions, DbfValue};
use super::utils;

/// Metadata of an open DBF table.
///
/// Holds the parsed header and column descriptors. Record data is read through
/// [`DbfDataReader`]s, each owning its own stream, so any number of readers may
/// run over one table.
#[derive(Debug, Clone)]
pub struct DbfTable {
    path: Option<PathBuf>,
    pub header: DbfHeader,
    columns: Vec<DbfColumn>,
    /// Uppercased column name -> column indices.
    names: HashMap<String, Vec<usize>>,
    encoding: &'static Encoding,
}

impl DbfTable {
    /// Opens a table and reads its header and column descriptors.
    ///
    /// Priority for determining text encoding (highest → lowest):
    /// 1. `user_encoding` (explicit override provided by caller/CLI)
    /// 2. The code page implied by the header's language-driver byte
    /// 3. windows-1252
    ///
    /// # Errors
    /// Returns an error if:
    /// - File cannot be opened
    /// - The header or a column descriptor is short
    /// - A column's declared type has no mapping in the table's dialect
    pub fn open(path: impl AsRef<Path>, user_encoding: Option<&'static Encoding>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening DBF table: {}", path.display());
        let mut file = BufReader::new(File::open(path)?);
        let mut table = Self::from_reader(&mut file, user_encoding)?;
        table.path = Some(path.to_path_buf());
        Ok(table)
    }

    /// Reads table metadata from any byte source positioned at the header.
    ///
    /// A table built this way has no path; read its records with
    /// [`data_reader_from`](Self::data_reader_from).
    pub fn from_reader<R: Read>(
        reader: &mut R,
        user_encoding: Option<&'static Encoding>,
    ) -> Result<Self> {
        let header = dbf_header::parse_header(reader)?;
        let columns = dbf_header::parse_columns(reader, &header)?;

        let mut names: HashMap<String, Vec<usize>> = HashMap::new();
        for column in &columns {
            names
                .entry(column.name.to_ascii_uppercase())
                .or_default()
                .push(column.index);
        }

        let encoding = resolve_encoding(user_encoding, header.language_driver);

        info!(
            "DBF table opened: version {:#04x} ({:?}), {} records, {} columns, encoding {}",
            header.version,
            header.family,
            header.record_count,
            columns.len(),
            encoding.name()
        );

        Ok(Self {
            path: None,
            header,
            columns,
            names,
            encoding,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn columns(&self) -> &[DbfColumn] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&DbfColumn> {
        self.columns.get(index)
    }

    /// All columns whose name matches `name` ignoring ASCII case.
    pub fn columns_named(&self, name: &str) -> Vec<&DbfColumn> {
        self.names
            .get(&name.to_ascii_uppercase())
            .map(|indices| indices.iter().map(|&i| &self.columns[i]).collect())
            .unwrap_or_default()
    }

    /// Record count declared in the header.
    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Opens a new reader over every column, with its own file handle.
    pub fn data_reader(&self, options: DbfReadOptions) -> Result<DbfDataReader<'_, BufReader<File>>> {
        let stream = self.open_stream()?;
        Ok(DbfDataReader::new(self, stream, options, None))
    }

    /// Opens a new reader that decodes only `selected` columns.
    ///
    /// # Errors
    /// [`XbaseError::ColumnIndexOutOfRange`] for an index past the last column.
    pub fn data_reader_with_columns(
        &self,
        selected: &[usize],
        options: DbfReadOptions,
    ) -> Result<DbfDataReader<'_, BufReader<File>>> {
        let runs = ColumnRuns::new(&self.columns, selected)?;
        let stream = self.open_stream()?;
        Ok(DbfDataReader::new(self, stream, options, Some(runs)))
    }

    /// Reads records from a caller-supplied stream over the whole table file.
    pub fn data_reader_from<R: Read + Seek>(
        &self,
        stream: R,
        options: DbfReadOptions,
    ) -> DbfDataReader<'_, R> {
        DbfDataReader::new(self, stream, options, None)
    }

    /// Like [`data_reader_from`](Self::data_reader_from), decoding only `selected` columns.
    pub fn data_reader_from_with_columns<R: Read + Seek>(
        &self,
        stream: R,
        selected: &[usize],
        options: DbfReadOptions,
    ) -> Result<DbfDataReader<'_, R>> {
        let runs = ColumnRuns::new(&self.columns, selected)?;
        Ok(DbfDataReader::new(self, stream, options, Some(runs)))
    }

    /// Memo contents live in a companion `.dbt`/`.fpt` file which this crate does not read.
    ///
    /// # Errors
    /// Always [`XbaseError::NotImplemented`].
    pub fn read_memo(&self, _pointer: &DbfValue) -> Result<Vec<u8>> {
        Err(XbaseError::NotImplemented("memo file decoding"))
    }

    fn open_stream(&self) -> Result<BufReader<File>> {
        let path = self.path.as_ref().ok_or_else(|| {
            XbaseError::Unsupported(
                "table was not opened from a path; use data_reader_from".to_string(),
            )
        })?;
        debug!("Opening data stream: {}", path.display());
        Ok(BufReader::new(File::open(path)?))
    }
}

fn resolve_encoding(user_encoding: Option<&'static Encoding>, language_driver: u8) -> &'static Encoding {
    if let Some(encoding) = user_encoding {
        debug!("Using caller-supplied encoding {}", encoding.name());
        return encoding;
    }
    match utils::encoding_for_language_driver(language_driver) {
        Some(encoding) => {
            debug!(
                "Language driver {:#04x} selects encoding {}",
                language_driver,
                encoding.name()
            );
            encoding
        }
        None => {
            if language_driver != 0 {
                warn!(
                    "Language driver {:#04x} has no known encoding; falling back to windows-1252",
                    language_driver
                );
            }
            encoding_rs::WINDOWS_1252
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_priority() {
        assert_eq!(
            resolve_encoding(Some(encoding_rs::UTF_8), 0xC9),
            encoding_rs::UTF_8
        );
        assert_eq!(resolve_encoding(None, 0xC9), encoding_rs::WINDOWS_1251);
        assert_eq!(resolve_encoding(None, 0x00), encoding_rs::WINDOWS_1252);
        assert_eq!(resolve_encoding(None, 0x02), encoding_rs::WINDOWS_1252);
    }
}
