//! Index node page decoding.
//!
//! Every node is a 512-byte page starting with a 16-bit attribute field
//! (bit 0 root, bit 1 leaf) that selects the layout of the rest of the page.
//!
//! # Interior Node
//! ```text
//! [2 bytes]   Attributes
//! [2 bytes]   Key count
//! [4 bytes]   Left sibling (-1 if none)
//! [4 bytes]   Right sibling (-1 if none)
//! [500 bytes] keyCount x (key[keyLength], record number BE u32, child pointer BE u32)
//! ```
//!
//! # Leaf Node
//! ```text
//! [2 bytes]   Attributes
//! [2 bytes]   Key count
//! [4 bytes]   Left sibling (-1 if none)
//! [4 bytes]   Right sibling (-1 if none)
//! [2 bytes]   Free space
//! [4 bytes]   Record number mask
//! [1 byte]    Duplicate count mask
//! [1 byte]    Trailing count mask
//! [1 byte]    Record number bits
//! [1 byte]    Duplicate count bits
//! [1 byte]    Trailing count bits
//! [1 byte]    Bytes per packed entry
//! [488 bytes] Packed entries (growing forward) and key bytes (growing backward)
//! ```
//!
//! Leaf keys are front-coded: each entry stores how many leading bytes it
//! shares with the previous key and how many trailing pad bytes were
//! stripped; only the remaining bytes are stored, taken from the end of the
//! 488-byte region working toward its start.

use log::trace;

use crate::xbase::types::error::{Result, XbaseError};
use crate::xbase::types::index_models::{
    CdxLeafEntry, CdxNode, InteriorCdxNode, InteriorEntry, LeafCdxNode, LeafPacking,
    NodeAttributes, CDX_NODE_SIZE, INTERIOR_KEY_BLOCK_SIZE, LEAF_PACKED_REGION_SIZE,
};
use crate::xbase::utils::{packed_entry_as_u64, ByteCursor};

/// Decodes a node page read from `offset`.
///
/// The attribute field is read once here and handed to the variant decoder.
pub fn decode(page: &[u8], offset: u64, key_length: u16) -> Result<CdxNode> {
    if page.len() < CDX_NODE_SIZE {
        return Err(XbaseError::Format(format!(
            "Node at offset {} is {} bytes, expected {}",
            offset,
            page.len(),
            CDX_NODE_SIZE
        )));
    }
    let mut cursor = ByteCursor::with_base_offset(&page[..CDX_NODE_SIZE], offset);
    let attributes = cursor.read_u16_le()?;
    if attributes & !(NodeAttributes::ROOT | NodeAttributes::LEAF) != 0 {
        return Err(XbaseError::InvalidNodeAttributes { offset, attributes });
    }
    let attributes = NodeAttributes(attributes);

    if attributes.is_leaf() {
        decode_leaf(&mut cursor, attributes, offset, key_length).map(CdxNode::Leaf)
    } else {
        decode_interior(&mut cursor, attributes, offset, key_length).map(CdxNode::Interior)
    }
}

fn sibling(raw: i32) -> Option<u64> {
    if raw < 0 {
        None
    } else {
        Some(raw as u64)
    }
}

fn decode_interior(
    cursor: &mut ByteCursor<'_>,
    attributes: NodeAttributes,
    offset: u64,
    key_length: u16,
) -> Result<InteriorCdxNode> {
    let key_count = cursor.read_u16_le()?;
    let left_sibling = sibling(cursor.read_i32_le()?);
    let right_sibling = sibling(cursor.read_i32_le()?);
    let block = cursor.read_bytes(INTERIOR_KEY_BLOCK_SIZE)?;

    if key_count == 0 {
        return Err(XbaseError::EmptyInteriorNode { offset });
    }
    let stride = key_length as usize + 8;
    if key_count as usize * stride > INTERIOR_KEY_BLOCK_SIZE {
        return Err(XbaseError::InvalidInteriorNodeKeyCount {
            offset,
            key_count,
            key_length,
        });
    }

    let mut entries = Vec::with_capacity(key_count as usize);
    for tuple in block.chunks_exact(stride).take(key_count as usize) {
        let mut tuple = ByteCursor::new(tuple);
        let key = tuple.read_bytes(key_length as usize)?.to_vec();
        let record_number = tuple.read_u32_be()?;
        let child_pointer = tuple.read_u32_be()?;
        entries.push(InteriorEntry {
            key,
            record_number,
            child_pointer,
        });
    }

    trace!("Interior node {:#x}: {} keys", offset, entries.len());
    Ok(InteriorCdxNode {
        offset,
        attributes,
        left_sibling,
        right_sibling,
        entries,
    })
}

fn decode_leaf(
    cursor: &mut ByteCursor<'_>,
    attributes: NodeAttributes,
    offset: u64,
    key_length: u16,
) -> Result<LeafCdxNode> {
    let key_count = cursor.read_u16_le()? as usize;
    let left_sibling = sibling(cursor.read_i32_le()?);
    let right_sibling = sibling(cursor.read_i32_le()?);
    let free_space = cursor.read_u16_le()?;
    let packing = LeafPacking {
        record_number_mask: cursor.read_u32_le()?,
        duplicate_mask: cursor.read_u8()?,
        trailing_mask: cursor.read_u8()?,
        record_number_bits: cursor.read_u8()?,
        duplicate_bits: cursor.read_u8()?,
        trailing_bits: cursor.read_u8()?,
        entry_stride: cursor.read_u8()?,
    };
    let region = cursor.read_bytes(LEAF_PACKED_REGION_SIZE)?;

    let entries = if key_count == 0 {
        Vec::new()
    } else {
        validate_packing(&packing, key_count, offset)?;
        unpack_entries(region, &packing, key_count, key_length, offset)?
    };

    trace!(
        "Leaf node {:#x}: {} keys, stride={}, free={}",
        offset,
        entries.len(),
        packing.entry_stride,
        free_space
    );
    Ok(LeafCdxNode {
        offset,
        attributes,
        left_sibling,
        right_sibling,
        free_space,
        packing,
        entries,
    })
}

fn validate_packing(packing: &LeafPacking, key_count: usize, offset: u64) -> Result<()> {
    let stride = packing.entry_stride as usize;
    let used_bits = packing.record_number_bits as usize
        + packing.duplicate_bits as usize
        + packing.trailing_bits as usize;
    let detail = if stride == 0 || stride > 8 {
        format!("entry stride {} outside 1..=8", stride)
    } else if packing.record_number_bits > 32 {
        format!("{} record number bits", packing.record_number_bits)
    } else if used_bits > stride * 8 {
        format!("{} bits do not fit a {}-byte entry", used_bits, stride)
    } else if key_count * stride > LEAF_PACKED_REGION_SIZE {
        format!("{} entries of {} bytes overflow the packed region", key_count, stride)
    } else {
        return Ok(());
    };
    Err(XbaseError::InvalidLeafNodePacking { offset, detail })
}

/// Reconstructs the keys of a leaf from its packed region.
///
/// Entry descriptors are read front to back while their key bytes are taken
/// from a pool cursor that starts at the end of the region and moves toward
/// the descriptors.
fn unpack_entries(
    region: &[u8],
    packing: &LeafPacking,
    key_count: usize,
    key_length: u16,
    offset: u64,
) -> Result<Vec<CdxLeafEntry>> {
    let stride = packing.entry_stride as usize;
    let record_number_bytes = (packing.record_number_bits as usize).div_ceil(8);
    // Duplicate and trailing counts occupy the top bits of each entry.
    let count_shift =
        (stride * 8 - packing.duplicate_bits as usize - packing.trailing_bits as usize) as u32;
    let descriptors_end = key_count * stride;

    let mut entries: Vec<CdxLeafEntry> = Vec::with_capacity(key_count);
    let mut pool_cursor = region.len() as isize;

    for key_index in 0..key_count {
        let window = &region[key_index * stride..(key_index + 1) * stride];

        let record_number = (packed_entry_as_u64(window, 0, record_number_bytes)? as u32)
            & packing.record_number_mask;
        let counts = packed_entry_as_u64(window, 0, stride)?
            .checked_shr(count_shift)
            .unwrap_or(0);
        let duplicate_bytes = (counts as u32) & packing.duplicate_mask as u32;
        let trailing_bytes = (counts
            .checked_shr(packing.duplicate_bits as u32)
            .unwrap_or(0) as u32)
            & packing.trailing_mask as u32;

        let previous: &[u8] = entries.last().map_or(&[], |entry| entry.key.as_slice());
        if key_index == 0 && duplicate_bytes != 0 {
            return Err(XbaseError::FirstLeafNodeKeyEntryHasDuplicateBytes {
                offset,
                duplicate_bytes,
            });
        }
        let stripped = duplicate_bytes + trailing_bytes;
        if stripped > key_length as u32 {
            return Err(XbaseError::InvalidLeafNodeKeyLength {
                offset,
                key_index,
                stripped,
                key_length,
            });
        }
        if duplicate_bytes as usize > previous.len() {
            return Err(XbaseError::InvalidLeafNodeDuplicateBytes {
                offset,
                key_index,
                duplicate_bytes,
                previous_len: previous.len(),
            });
        }

        let new_bytes = (key_length as u32 - stripped) as usize;
        pool_cursor -= new_bytes as isize;
        if pool_cursor < descriptors_end as isize {
            return Err(XbaseError::InvalidLeafNodeCalculatedKeyStartIndex {
                offset,
                key_index,
                start: pool_cursor,
                limit: descriptors_end,
            });
        }
        let start = pool_cursor as usize;

        let mut key = Vec::with_capacity(duplicate_bytes as usize + new_bytes);
        key.extend_from_slice(&previous[..duplicate_bytes as usize]);
        key.extend_from_slice(&region[start..start + new_bytes]);

        entries.push(CdxLeafEntry {
            key,
            record_number,
            duplicate_bytes,
            trailing_bytes,
        });
    }

    Ok(entries)
}
