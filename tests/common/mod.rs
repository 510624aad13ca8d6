//! Builders for synthetic `.dbf` and `.cdx` files used by the integration tests.

#![allow(dead_code)]

use std::io::Write;

use tempfile::NamedTempFile;

pub const STATUS_VALID: u8 = 0x20;
pub const STATUS_DELETED: u8 = 0x2A;
pub const STATUS_EOF: u8 = 0x1A;

pub fn write_temp(bytes: &[u8], suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

struct ColumnDef {
    name: String,
    type_byte: u8,
    length: u8,
    decimals: u8,
}

/// Writes a DBF table byte for byte.
pub struct DbfBuilder {
    version: u8,
    language_driver: u8,
    columns: Vec<ColumnDef>,
    records: Vec<(u8, Vec<u8>)>,
    record_length: Option<u16>,
    eof_marker: bool,
    tail: Vec<u8>,
}

impl DbfBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            language_driver: 0x03,
            columns: Vec::new(),
            records: Vec::new(),
            record_length: None,
            eof_marker: true,
            tail: Vec::new(),
        }
    }

    pub fn language_driver(mut self, driver: u8) -> Self {
        self.language_driver = driver;
        self
    }

    pub fn column(mut self, name: &str, type_byte: u8, length: u8, decimals: u8) -> Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            type_byte,
            length,
            decimals,
        });
        self
    }

    /// Adds a record; each field is right-padded with spaces to its column width.
    pub fn record(mut self, status: u8, fields: &[&[u8]]) -> Self {
        assert_eq!(fields.len(), self.columns.len(), "one field per column");
        let mut data = Vec::new();
        for (field, column) in fields.iter().zip(&self.columns) {
            let width = column.width();
            assert!(field.len() <= width, "field wider than column {}", column.name);
            data.extend_from_slice(field);
            data.resize(data.len() + width - field.len(), b' ');
        }
        self.records.push((status, data));
        self
    }

    /// Declares a record length other than the column widths imply.
    pub fn record_length(mut self, length: u16) -> Self {
        self.record_length = Some(length);
        self
    }

    pub fn without_eof_marker(mut self) -> Self {
        self.eof_marker = false;
        self
    }

    /// Raw bytes appended after the records (and the EOF marker, if any).
    pub fn tail(mut self, bytes: &[u8]) -> Self {
        self.tail.extend_from_slice(bytes);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let header_length = 32 + 32 * self.columns.len() as u16 + 1;
        let natural_length = 1 + self.columns.iter().map(ColumnDef::width).sum::<usize>() as u16;
        let record_length = self.record_length.unwrap_or(natural_length);

        let mut out = vec![0u8; 32];
        out[0] = self.version;
        out[1] = 124;
        out[2] = 3;
        out[3] = 15;
        out[4..8].copy_from_slice(&(self.records.len() as u32).to_le_bytes());
        out[8..10].copy_from_slice(&header_length.to_le_bytes());
        out[10..12].copy_from_slice(&record_length.to_le_bytes());
        out[29] = self.language_driver;

        for column in &self.columns {
            let mut descriptor = [0u8; 32];
            descriptor[..column.name.len()].copy_from_slice(column.name.as_bytes());
            descriptor[11] = column.type_byte;
            descriptor[16] = column.length;
            descriptor[17] = column.decimals;
            out.extend_from_slice(&descriptor);
        }
        out.push(0x0D);

        for (status, data) in &self.records {
            out.push(*status);
            let mut data = data.clone();
            data.resize(record_length as usize - 1, b' ');
            out.extend_from_slice(&data);
        }
        if self.eof_marker {
            out.push(STATUS_EOF);
        }
        out.extend_from_slice(&self.tail);
        out
    }

    pub fn write(&self) -> NamedTempFile {
        write_temp(&self.build(), ".dbf")
    }
}

impl ColumnDef {
    fn width(&self) -> usize {
        if self.type_byte == b'C' && self.decimals > 0 {
            ((self.decimals as usize) << 8) | self.length as usize
        } else {
            self.length as usize
        }
    }
}

pub const CDX_HEADER_SIZE: usize = 1024;
pub const NODE_SIZE: usize = 512;
pub const ATTR_ROOT: u16 = 0x01;
pub const ATTR_LEAF: u16 = 0x02;

/// File offset of the `n`th node page after the header.
pub fn node_offset(n: usize) -> u32 {
    (CDX_HEADER_SIZE + NODE_SIZE * n) as u32
}

fn pad_key(key: &[u8], key_length: u16) -> Vec<u8> {
    let mut padded = key.to_vec();
    padded.resize(key_length as usize, b' ');
    padded
}

fn stored_key(key: &[u8], key_length: u16) -> Vec<u8> {
    let padded = pad_key(key, key_length);
    let end = padded.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    padded[..end].to_vec()
}

fn sibling(sibling: Option<u32>) -> [u8; 4] {
    sibling.map_or(-1i32, |offset| offset as i32).to_le_bytes()
}

/// Encodes a leaf page: 16-bit record numbers, 8-bit duplicate and trailing
/// counts, 4-byte entries, front-coded keys with trailing spaces stripped.
pub fn leaf_page(
    key_length: u16,
    keys: &[(&[u8], u32)],
    attributes: u16,
    left: Option<u32>,
    right: Option<u32>,
) -> Vec<u8> {
    const STRIDE: usize = 4;
    let mut page = vec![0u8; NODE_SIZE];
    page[0..2].copy_from_slice(&(attributes | ATTR_LEAF).to_le_bytes());
    page[2..4].copy_from_slice(&(keys.len() as u16).to_le_bytes());
    page[4..8].copy_from_slice(&sibling(left));
    page[8..12].copy_from_slice(&sibling(right));
    page[14..18].copy_from_slice(&0xFFFFu32.to_le_bytes());
    page[18] = 0xFF;
    page[19] = 0xFF;
    page[20] = 16;
    page[21] = 8;
    page[22] = 8;
    page[23] = STRIDE as u8;

    let region = &mut page[24..];
    let mut pool = region.len();
    let mut previous: Vec<u8> = Vec::new();
    for (i, (key, record_number)) in keys.iter().enumerate() {
        let stored = stored_key(key, key_length);
        let duplicate = if i == 0 {
            0
        } else {
            stored
                .iter()
                .zip(&previous)
                .take_while(|(a, b)| a == b)
                .count()
        };
        let trailing = key_length as usize - stored.len();
        let entry = &mut region[i * STRIDE..(i + 1) * STRIDE];
        entry[0..2].copy_from_slice(&(*record_number as u16).to_le_bytes());
        entry[2] = duplicate as u8;
        entry[3] = trailing as u8;

        let literal = &stored[duplicate..];
        pool -= literal.len();
        assert!(pool >= keys.len() * STRIDE, "leaf page overflow");
        region[pool..pool + literal.len()].copy_from_slice(literal);
        previous = stored;
    }
    let free_space = (pool - keys.len() * STRIDE) as u16;
    page[12..14].copy_from_slice(&free_space.to_le_bytes());
    page
}

/// Encodes an interior page from `(key, record number, child offset)` tuples.
pub fn interior_page(
    key_length: u16,
    entries: &[(&[u8], u32, u32)],
    attributes: u16,
    left: Option<u32>,
    right: Option<u32>,
) -> Vec<u8> {
    let mut page = vec![0u8; NODE_SIZE];
    page[0..2].copy_from_slice(&(attributes & !ATTR_LEAF).to_le_bytes());
    page[2..4].copy_from_slice(&(entries.len() as u16).to_le_bytes());
    page[4..8].copy_from_slice(&sibling(left));
    page[8..12].copy_from_slice(&sibling(right));
    let mut at = 12;
    for (key, record_number, child) in entries {
        let key = pad_key(key, key_length);
        page[at..at + key.len()].copy_from_slice(&key);
        at += key.len();
        page[at..at + 4].copy_from_slice(&record_number.to_be_bytes());
        page[at + 4..at + 8].copy_from_slice(&child.to_be_bytes());
        at += 8;
    }
    page
}

/// Assembles a header and node pages; page `n` lands at [`node_offset`]`(n)`.
pub fn cdx_file(key_length: u16, descending: bool, root: u32, key_expression: &str, pages: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0u8; CDX_HEADER_SIZE];
    out[0..4].copy_from_slice(&root.to_le_bytes());
    out[4..8].copy_from_slice(&(-1i32).to_le_bytes());
    out[12..14].copy_from_slice(&key_length.to_le_bytes());
    out[14] = 0x60;
    out[15] = 0x01;
    out[502..504].copy_from_slice(&(descending as u16).to_le_bytes());
    out[510..512].copy_from_slice(&(key_expression.len() as u16).to_le_bytes());
    out[512..512 + key_expression.len()].copy_from_slice(key_expression.as_bytes());
    for page in pages {
        assert_eq!(page.len(), NODE_SIZE);
        out.extend_from_slice(page);
    }
    out
}

/// A two-level index: one interior root (page 0) over leaves of `per_leaf`
/// keys each (pages 1..), linked through their sibling pointers.
pub fn two_level_index(key_length: u16, keys: &[(&[u8], u32)], per_leaf: usize) -> Vec<u8> {
    let chunks: Vec<&[(&[u8], u32)]> = keys.chunks(per_leaf).collect();
    let mut pages = Vec::with_capacity(chunks.len() + 1);

    let root_entries: Vec<(&[u8], u32, u32)> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let (last_key, last_record) = chunk[chunk.len() - 1];
            (last_key, last_record, node_offset(i + 1))
        })
        .collect();
    pages.push(interior_page(key_length, &root_entries, ATTR_ROOT, None, None));

    for (i, chunk) in chunks.iter().enumerate() {
        let left = (i > 0).then(|| node_offset(i));
        let right = (i + 1 < chunks.len()).then(|| node_offset(i + 2));
        pages.push(leaf_page(key_length, chunk, 0, left, right));
    }
    cdx_file(key_length, false, node_offset(0), "NAME", &pages)
}
