//! Low-level byte reading utilities

use std::io::{ErrorKind, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use encoding_rs::Encoding;

use super::types::error::{Result, XbaseError};

/// A cursor over an in-memory byte buffer with fixed-width primitive reads.
///
/// `base_offset` is the absolute file offset of `data[0]`; it only feeds error
/// messages so a truncated read can be located in the file.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base_offset: u64,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base_offset(data, 0)
    }

    pub fn with_base_offset(data: &'a [u8], base_offset: u64) -> Self {
        Self {
            data,
            pos: 0,
            base_offset,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Moves to an absolute position within the buffer.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.data.len() {
            return Err(XbaseError::TruncatedRead {
                offset: self.base_offset + position as u64,
                requested: position - self.data.len(),
                available: 0,
            });
        }
        self.pos = position;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(self.truncated(count));
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16_le(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32_le(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64_le(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64_le(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f32_le(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64_le(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    /// Reads a fixed-length ASCII field, cutting at the first NUL and trimming `pad` bytes at both ends.
    pub fn read_fixed_ascii_trimmed(&mut self, count: usize, pad: &[u8]) -> Result<String> {
        let raw = self.read_bytes(count)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        let trimmed = trim_bytes(&raw[..end], pad);
        Ok(String::from_utf8_lossy(trimmed).into_owned())
    }

    fn truncated(&self, requested: usize) -> XbaseError {
        XbaseError::TruncatedRead {
            offset: self.base_offset + self.pos as u64,
            requested,
            available: self.remaining(),
        }
    }
}

/// Strips `pad` bytes from both ends of `bytes`.
pub fn trim_bytes<'a>(bytes: &'a [u8], pad: &[u8]) -> &'a [u8] {
    let start = bytes.iter().position(|b| !pad.contains(b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !pad.contains(b)).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Strips trailing `pad` bytes from `bytes`.
pub fn trim_end_bytes<'a>(bytes: &'a [u8], pad: &[u8]) -> &'a [u8] {
    let end = bytes.iter().rposition(|b| !pad.contains(b)).map_or(0, |i| i + 1);
    &bytes[..end]
}

/// Reads until `buf` is full or the source is exhausted, returning the byte count.
///
/// Unlike `read_exact`, a short count is not an error: callers decide whether
/// it means a clean end of data or a truncated structure.
pub fn read_fully<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Assembles `length` bytes of `buffer` starting at `start` as a little-endian integer.
///
/// At most 8 bytes can be assembled; ranges reaching past the buffer fail
/// rather than reading beyond it.
pub fn packed_entry_as_u64(buffer: &[u8], start: usize, length: usize) -> Result<u64> {
    if length > 8 || start + length > buffer.len() {
        return Err(XbaseError::TruncatedRead {
            offset: start as u64,
            requested: length,
            available: buffer.len().saturating_sub(start),
        });
    }
    Ok(buffer[start..start + length]
        .iter()
        .rev()
        .fold(0u64, |acc, &byte| (acc << 8) | byte as u64))
}

/// Resolves an encoding label (e.g. `"cp1252"`, `"gbk"`, `"utf-8"`).
pub fn parse_encoding(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    let normalized = label
        .strip_prefix("cp")
        .or_else(|| label.strip_prefix("CP"))
        .filter(|rest| rest.chars().all(|c| c.is_ascii_digit()))
        .map(|code_page| format!("windows-{}", code_page));
    match normalized {
        Some(name) => Encoding::for_label(name.as_bytes())
            .or_else(|| Encoding::for_label(label.as_bytes())),
        None => Encoding::for_label(label.as_bytes()),
    }
}

/// Maps a DBF language-driver byte to a text encoding.
///
/// Only code pages `encoding_rs` implements are mapped; DOS code pages other
/// than 866 have no `encoding_rs` decoder and return `None`.
pub fn encoding_for_language_driver(driver: u8) -> Option<&'static Encoding> {
    let encoding = match driver {
        0x26 | 0x65 => encoding_rs::IBM866,
        0x03 | 0x57 | 0x58 | 0x59 => encoding_rs::WINDOWS_1252,
        0xC8 => encoding_rs::WINDOWS_1250,
        0x7C => encoding_rs::WINDOWS_874,
        0xC9 => encoding_rs::WINDOWS_1251,
        0xCA => encoding_rs::WINDOWS_1254,
        0xCB => encoding_rs::WINDOWS_1253,
        0x7D => encoding_rs::WINDOWS_1255,
        0x7E => encoding_rs::WINDOWS_1256,
        0xCC => encoding_rs::WINDOWS_1257,
        0x13 | 0x7B => encoding_rs::SHIFT_JIS,
        0x4D | 0x7A => encoding_rs::GBK,
        0x4E | 0x79 => encoding_rs::EUC_KR,
        0x4F | 0x78 => encoding_rs::BIG5,
        _ => return None,
    };
    Some(encoding)
}
