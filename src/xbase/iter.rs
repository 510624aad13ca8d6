//! Iterators for sequential access to table records and index keys.
//!
//! 1. [`RecordIterator`] - decoded records of a [`DbfDataReader`]
//! 2. [`LeafKeyIterator`] - every key of an index in order, one leaf page at a time
//!
//! # Example
//! ```no_run
//! # use xbase_reader::{CdxFile, DbfReadOptions, DbfTable};
//! let table = DbfTable::open("customers.dbf", None).unwrap();
//! let mut reader = table.data_reader(DbfReadOptions::default()).unwrap();
//! for record in reader.records() {
//!     println!("{:?}", record.unwrap().values);
//! }
//!
//! let index = CdxFile::open("customers.idx").unwrap();
//! for entry in index.searcher().iter_all() {
//!     let entry = entry.unwrap();
//!     println!("{} -> {}", entry.key_text(table.encoding()), entry.record_number);
//! }
//! ```

use std::collections::HashSet;
use std::io::{Read, Seek};
use std::vec::IntoIter;

use super::reader::DbfDataReader;
use super::search::IndexSearcher;
use super::types::error::{Result, XbaseError};
use super::types::index_models::{CdxLeafEntry, LeafCdxNode};
use super::types::models::DbfRecord;

/// Iterator over the records a [`DbfDataReader`] surfaces.
///
/// Stops after the first error.
///
/// Created by [`DbfDataReader::records()`].
pub struct RecordIterator<'r, 'a, R: Read + Seek> {
    reader: &'r mut DbfDataReader<'a, R>,
    done: bool,
}

impl<'r, 'a, R: Read + Seek> RecordIterator<'r, 'a, R> {
    pub(super) fn new(reader: &'r mut DbfDataReader<'a, R>) -> Self {
        Self {
            reader,
            done: false,
        }
    }
}

impl<'r, 'a, R: Read + Seek> Iterator for RecordIterator<'r, 'a, R> {
    type Item = Result<DbfRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read() {
            Ok(true) => self.reader.take_current().map(Ok),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

enum LeafCursor {
    Start,
    Next { from: u64, to: u64 },
    Done,
}

/// Iterator over every leaf key of an index, in index order.
///
/// Starts at the leftmost leaf and follows right-sibling pointers, holding
/// one decoded leaf at a time. Stops after the first error; a sibling chain
/// that leads back to a visited leaf is reported as
/// [`XbaseError::LeafChainCycle`].
///
/// Created by [`IndexSearcher::iter_all()`].
pub struct LeafKeyIterator<'a, R: Read + Seek> {
    searcher: IndexSearcher<'a, R>,
    cursor: LeafCursor,
    visited: HashSet<u64>,
    current_entries: IntoIter<CdxLeafEntry>,
}

impl<'a, R: Read + Seek> LeafKeyIterator<'a, R> {
    pub(super) fn new(searcher: IndexSearcher<'a, R>) -> Self {
        Self {
            searcher,
            cursor: LeafCursor::Start,
            visited: HashSet::new(),
            current_entries: Vec::new().into_iter(),
        }
    }

    fn load(&mut self, leaf: LeafCdxNode) {
        self.visited.insert(leaf.offset);
        self.cursor = match leaf.right_sibling {
            Some(to) => LeafCursor::Next {
                from: leaf.offset,
                to,
            },
            None => LeafCursor::Done,
        };
        self.current_entries = leaf.entries.into_iter();
    }
}

impl<'a, R: Read + Seek> Iterator for LeafKeyIterator<'a, R> {
    type Item = Result<CdxLeafEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current_entries.next() {
                return Some(Ok(entry));
            }

            let leaf = match self.cursor {
                LeafCursor::Done => return None,
                LeafCursor::Start => self.searcher.leftmost_leaf(),
                LeafCursor::Next { from, to } if self.visited.contains(&to) => {
                    Err(XbaseError::LeafChainCycle {
                        offset: from,
                        right_sibling: to,
                    })
                }
                LeafCursor::Next { to, .. } => self.searcher.read_leaf(to),
            };
            match leaf {
                // Continue loop to yield the first entry of the new leaf
                Ok(leaf) => self.load(leaf),
                Err(e) => {
                    self.cursor = LeafCursor::Done;
                    return Some(Err(e));
                }
            }
        }
    }
}
