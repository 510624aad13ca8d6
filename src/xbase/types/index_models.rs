//! Data structures for compact (.idx) and compound (.cdx) index files.

use encoding_rs::Encoding;

/// Size of the index header page.
pub const CDX_HEADER_SIZE: usize = 1024;
/// Size of every node page.
pub const CDX_NODE_SIZE: usize = 512;
/// Key block of an interior node.
pub const INTERIOR_KEY_BLOCK_SIZE: usize = 500;
/// Packed entry region of a leaf node.
pub const LEAF_PACKED_REGION_SIZE: usize = 488;

/// Option bits stored at header byte 14.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CdxOptions {
    pub unique: bool,
    pub has_for_clause: bool,
    pub compact: bool,
    pub compound: bool,
}

impl From<u8> for CdxOptions {
    fn from(bits: u8) -> Self {
        Self {
            unique: bits & 0x01 != 0,
            has_for_clause: bits & 0x08 != 0,
            compact: bits & 0x20 != 0,
            compound: bits & 0x40 != 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Parsed 1024-byte index header.
#[derive(Debug, Clone)]
pub struct CdxIndexHeader {
    /// File offset of the root node.
    pub root_pointer: u32,
    /// File offset of the first free node, -1 when there is none.
    pub free_list_pointer: i32,
    pub key_length: u16,
    pub options: CdxOptions,
    pub signature: u8,
    pub order: SortOrder,
    pub for_expression_length: u16,
    pub key_expression_length: u16,
    pub key_expression: String,
    pub for_expression: Option<String>,
}

/// Node attribute bits at the start of every node page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttributes(pub u16);

impl NodeAttributes {
    pub const ROOT: u16 = 0x01;
    pub const LEAF: u16 = 0x02;

    pub fn is_root(&self) -> bool {
        self.0 & Self::ROOT != 0
    }

    pub fn is_leaf(&self) -> bool {
        self.0 & Self::LEAF != 0
    }
}

/// One key of an interior node with the subtree it bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteriorEntry {
    /// Full-width key: the largest key in the child subtree.
    pub key: Vec<u8>,
    pub record_number: u32,
    /// File offset of the child node.
    pub child_pointer: u32,
}

#[derive(Debug, Clone)]
pub struct InteriorCdxNode {
    pub offset: u64,
    pub attributes: NodeAttributes,
    pub left_sibling: Option<u64>,
    pub right_sibling: Option<u64>,
    pub entries: Vec<InteriorEntry>,
}

/// Bit layout of the packed leaf entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeafPacking {
    pub record_number_mask: u32,
    pub duplicate_mask: u8,
    pub trailing_mask: u8,
    pub record_number_bits: u8,
    pub duplicate_bits: u8,
    pub trailing_bits: u8,
    /// Bytes occupied by one packed entry.
    pub entry_stride: u8,
}

/// One reconstructed key of a leaf node.
///
/// `key` has its trailing pad bytes stripped; its length is
/// `key_length - trailing_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdxLeafEntry {
    pub key: Vec<u8>,
    pub record_number: u32,
    pub duplicate_bytes: u32,
    pub trailing_bytes: u32,
}

impl CdxLeafEntry {
    /// Decodes the key bytes with the table's text encoding.
    pub fn key_text(&self, encoding: &'static Encoding) -> String {
        let (text, _, _) = encoding.decode(&self.key);
        text.into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct LeafCdxNode {
    pub offset: u64,
    pub attributes: NodeAttributes,
    pub left_sibling: Option<u64>,
    pub right_sibling: Option<u64>,
    pub free_space: u16,
    pub packing: LeafPacking,
    pub entries: Vec<CdxLeafEntry>,
}

/// A decoded index node page.
#[derive(Debug, Clone)]
pub enum CdxNode {
    Interior(InteriorCdxNode),
    Leaf(LeafCdxNode),
}

impl CdxNode {
    pub fn offset(&self) -> u64 {
        match self {
            CdxNode::Interior(node) => node.offset,
            CdxNode::Leaf(node) => node.offset,
        }
    }

    pub fn attributes(&self) -> NodeAttributes {
        match self {
            CdxNode::Interior(node) => node.attributes,
            CdxNode::Leaf(node) => node.attributes,
        }
    }

    pub fn key_count(&self) -> usize {
        match self {
            CdxNode::Interior(node) => node.entries.len(),
            CdxNode::Leaf(node) => node.entries.len(),
        }
    }

    pub fn left_sibling(&self) -> Option<u64> {
        match self {
            CdxNode::Interior(node) => node.left_sibling,
            CdxNode::Leaf(node) => node.left_sibling,
        }
    }

    pub fn right_sibling(&self) -> Option<u64> {
        match self {
            CdxNode::Interior(node) => node.right_sibling,
            CdxNode::Leaf(node) => node.right_sibling,
        }
    }
}
