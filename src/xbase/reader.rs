use std::io::{Read, Seek, SeekFrom};

use log::{debug, trace, warn};

use super::codec::runs::{ColumnRuns, Run};
use super::codec::value;
use super::iter::RecordIterator;
use super::table::DbfTable;
use super::types::error::{Result, XbaseError};
use super::types::models::{DbfReadOptions, DbfRecord, DbfValue, RecordStatus};
use super::utils::{self, ByteCursor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// A seek is pending before the next status byte.
    Positioned,
    Reading,
    Eof,
    Closed,
}

/// What the reader does with a record, given its status and the read options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Surface,
    Skip,
    End,
}

fn classify(status: RecordStatus, options: &DbfReadOptions) -> Disposition {
    match status {
        RecordStatus::Valid => Disposition::Surface,
        RecordStatus::Deleted if options.allow_deleted => Disposition::Surface,
        RecordStatus::Deleted => Disposition::Skip,
        RecordStatus::EofMarker if options.ignore_eof_marker => Disposition::Skip,
        RecordStatus::EofMarker => Disposition::End,
        RecordStatus::Unknown(_) if options.allow_invalid => Disposition::Surface,
        RecordStatus::Unknown(_) => Disposition::Skip,
    }
}

/// Forward cursor over the records of a [`DbfTable`].
///
/// Created by [`DbfTable::data_reader`] and friends. Each reader owns its
/// stream; the table only lends header and column metadata.
///
/// ```no_run
/// # use xbase_reader::{DbfTable, DbfReadOptions};
/// let table = DbfTable::open("customers.dbf", None).unwrap();
/// let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
/// while reader.read().unwrap() {
///     let record = reader.current().unwrap();
///     println!("{:?}", record.values);
/// }
/// ```
pub struct DbfDataReader<'a, R: Read + Seek> {
    table: &'a DbfTable,
    stream: Option<R>,
    options: DbfReadOptions,
    runs: Option<ColumnRuns>,
    state: ReaderState,
    /// Index of the record whose status byte is read next.
    next_index: u64,
    current: Option<DbfRecord>,
    buffer: Vec<u8>,
}

impl<'a, R: Read + Seek> DbfDataReader<'a, R> {
    pub(crate) fn new(
        table: &'a DbfTable,
        stream: R,
        options: DbfReadOptions,
        runs: Option<ColumnRuns>,
    ) -> Self {
        debug!(
            "Data reader created: options={:?}, columns={}",
            options,
            runs.as_ref()
                .map_or(table.columns().len(), ColumnRuns::selected_count)
        );
        Self {
            table,
            stream: Some(stream),
            options,
            runs,
            state: ReaderState::Positioned,
            next_index: 0,
            current: None,
            buffer: vec![0u8; table.header.record_data_length()],
        }
    }

    pub fn table(&self) -> &'a DbfTable {
        self.table
    }

    /// The record produced by the last successful [`read`](Self::read).
    pub fn current(&self) -> Option<&DbfRecord> {
        self.current.as_ref()
    }

    /// Advances to the next record that the read options surface.
    ///
    /// Returns `Ok(false)` at the end of data: an EOF marker (unless ignored),
    /// the physical end of the stream, or a record cut short by it. A record
    /// that fails to decode is not surfaced; the reader stays positioned on
    /// the following record.
    ///
    /// # Errors
    /// - [`XbaseError::ReaderClosed`] after [`close`](Self::close)
    /// - value format errors from decoding a field
    /// - [`XbaseError::RecordLengthMismatch`] when decoding does not consume exactly one record
    pub fn read(&mut self) -> Result<bool> {
        match self.state {
            ReaderState::Closed => return Err(XbaseError::ReaderClosed),
            ReaderState::Eof => return Ok(false),
            ReaderState::Positioned => {
                let Some(offset) = self.record_offset(self.next_index) else {
                    self.state = ReaderState::Eof;
                    return Ok(false);
                };
                self.stream()?.seek(SeekFrom::Start(offset))?;
                self.state = ReaderState::Reading;
            }
            ReaderState::Reading => {}
        }
        self.current = None;

        let data_length = self.buffer.len();
        loop {
            let index = self.next_index;
            let Some(offset) = self.record_offset(index) else {
                debug!("Record {} lies beyond any addressable offset", index);
                self.state = ReaderState::Eof;
                return Ok(false);
            };

            let mut status_byte = [0u8; 1];
            if utils::read_fully(self.stream()?, &mut status_byte)? == 0 {
                debug!("Physical end of data before record {}", index);
                self.state = ReaderState::Eof;
                return Ok(false);
            }
            self.next_index = index.saturating_add(1);
            let status = RecordStatus::from(status_byte[0]);

            match classify(status, &self.options) {
                Disposition::Surface => {}
                Disposition::Skip => {
                    trace!("Skipping record {} ({:?})", index, status);
                    self.stream()?.seek(SeekFrom::Current(data_length as i64))?;
                    continue;
                }
                Disposition::End => {
                    if index < self.table.header.record_count as u64 {
                        warn!(
                            "EOF marker at record {} but the header declares {} records",
                            index, self.table.header.record_count
                        );
                    }
                    self.state = ReaderState::Eof;
                    return Ok(false);
                }
            }

            let mut buffer = std::mem::take(&mut self.buffer);
            let read = utils::read_fully(self.stream()?, &mut buffer);
            self.buffer = buffer;
            let read = read?;
            if read < data_length {
                warn!(
                    "Record {} at offset {} is truncated ({} of {} bytes); treating as end of data",
                    index, offset, read, data_length
                );
                self.state = ReaderState::Eof;
                return Ok(false);
            }

            let values = decode_record(self.table, self.runs.as_ref(), &self.buffer, offset)?;
            trace!("Read record {} at offset {}", index, offset);
            self.current = Some(DbfRecord {
                status,
                offset,
                index,
                values,
            });
            return Ok(true);
        }
    }

    /// Positions the reader so the next [`read`](Self::read) starts at `record_index`.
    ///
    /// Returns `false` when the record's offset lies at or past the end of the
    /// stream; a following `read` then reports end of data.
    pub fn seek(&mut self, record_index: u64) -> Result<bool> {
        if self.state == ReaderState::Closed {
            return Err(XbaseError::ReaderClosed);
        }
        self.next_index = record_index;
        self.current = None;

        let end = self.stream()?.seek(SeekFrom::End(0))?;
        let target = match self.record_offset(record_index) {
            Some(target) if target < end => target,
            target => {
                trace!(
                    "Seek to record {} at offset {:?} is past the stream end {}",
                    record_index, target, end
                );
                self.state = ReaderState::Eof;
                return Ok(false);
            }
        };
        let position = self.stream()?.seek(SeekFrom::Start(target))?;
        self.state = ReaderState::Reading;
        trace!("Seek to record {} at offset {} (stream length {})", record_index, target, end);
        Ok(position == target)
    }

    /// Releases the stream. Further reads fail with [`XbaseError::ReaderClosed`].
    pub fn close(&mut self) {
        self.stream = None;
        self.current = None;
        self.state = ReaderState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        self.state == ReaderState::Closed
    }

    /// Iterator adapter over the remaining records.
    pub fn records(&mut self) -> RecordIterator<'_, 'a, R> {
        RecordIterator::new(self)
    }

    pub(crate) fn take_current(&mut self) -> Option<DbfRecord> {
        self.current.take()
    }

    /// File offset of a record's status byte; `None` when it is not representable.
    fn record_offset(&self, record_index: u64) -> Option<u64> {
        let header = &self.table.header;
        (header.record_length as u64)
            .checked_mul(record_index)?
            .checked_add(header.header_length as u64)
    }

    fn stream(&mut self) -> Result<&mut R> {
        self.stream.as_mut().ok_or(XbaseError::ReaderClosed)
    }
}

/// Decodes one record's data bytes (the bytes after its status byte).
///
/// Without a plan every column is decoded; with one, only the planned columns
/// are and the others stay `None`.
fn decode_record(
    table: &DbfTable,
    runs: Option<&ColumnRuns>,
    data: &[u8],
    offset: u64,
) -> Result<Vec<Option<DbfValue>>> {
    let columns = table.columns();
    let encoding = table.encoding();
    let mut cursor = ByteCursor::with_base_offset(data, offset + 1);

    let mut values = vec![None; columns.len()];
    match runs {
        None => {
            for column in columns {
                let start = cursor.position();
                values[column.index] = Some(
                    value::read_value(column, &mut cursor, encoding)
                        .map_err(|e| overrun(e, offset, data.len(), start + column.data_length()))?,
                );
            }
        }
        Some(plan) => {
            for run in plan.runs() {
                let start = cursor.position();
                match *run {
                    Run::Decode(index) => {
                        let column = &columns[index];
                        values[index] = Some(
                            value::read_value(column, &mut cursor, encoding).map_err(|e| {
                                overrun(e, offset, data.len(), start + column.data_length())
                            })?,
                        );
                    }
                    Run::Skip(bytes) => cursor
                        .skip(bytes)
                        .map_err(|e| overrun(e, offset, data.len(), start + bytes))?,
                }
            }
        }
    }

    if cursor.position() != data.len() {
        return Err(XbaseError::RecordLengthMismatch {
            offset,
            expected: data.len(),
            actual: cursor.position(),
        });
    }
    Ok(values)
}

/// A column running past the record's data bytes means the declared record
/// length disagrees with the column widths.
fn overrun(error: XbaseError, offset: u64, expected: usize, actual: usize) -> XbaseError {
    match error {
        XbaseError::TruncatedRead { .. } => XbaseError::RecordLengthMismatch {
            offset,
            expected,
            actual,
        },
        other => other,
    }
}
