//! B-tree traversal and key search over an open index.
//!
//! All searches take a comparator `Fn(&[u8]) -> Ordering` that reports how a
//! stored key orders relative to whatever is being looked for: `Less` when the
//! key sorts before the target, `Equal` when it matches, `Greater` after. The
//! same traversal then serves exact lookups ([`exact_key`]), prefix ranges
//! ([`prefix_key`]) and caller-defined predicates.
//!
//! Stored leaf keys have their trailing pad bytes stripped, so comparators
//! should treat a short key as padded.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::io::{Read, Seek};

use log::{debug, trace};

use super::index::CdxFile;
use super::iter::LeafKeyIterator;
use super::types::error::{Result, XbaseError};
use super::types::index_models::{CdxLeafEntry, CdxNode, LeafCdxNode, SortOrder};
use super::utils::trim_end_bytes;

/// Deepest tree a descent follows before declaring the index corrupt.
const MAX_TREE_DEPTH: usize = 64;
/// Bytes treated as key padding.
const KEY_PAD: &[u8] = b" \0";

/// Read-only traversal of one index's B-tree.
///
/// Created by [`CdxFile::searcher`].
pub struct IndexSearcher<'a, R: Read + Seek> {
    index: &'a CdxFile<R>,
}

impl<'a, R: Read + Seek> Clone for IndexSearcher<'a, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, R: Read + Seek> Copy for IndexSearcher<'a, R> {}

impl<'a, R: Read + Seek> IndexSearcher<'a, R> {
    pub fn new(index: &'a CdxFile<R>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &'a CdxFile<R> {
        self.index
    }

    /// Descends from the root through every interior node's first child.
    ///
    /// # Errors
    /// [`XbaseError::LeftmostNodeHasLeftSibling`] when the leaf reached this
    /// way claims a left sibling.
    pub fn leftmost_leaf(&self) -> Result<LeafCdxNode> {
        let mut node = self.index.root()?;
        for _ in 0..MAX_TREE_DEPTH {
            match node {
                CdxNode::Leaf(leaf) => {
                    if let Some(left_sibling) = leaf.left_sibling {
                        return Err(XbaseError::LeftmostNodeHasLeftSibling {
                            offset: leaf.offset,
                            left_sibling,
                        });
                    }
                    return Ok(leaf);
                }
                CdxNode::Interior(interior) => {
                    let first = interior
                        .entries
                        .first()
                        .ok_or(XbaseError::EmptyInteriorNode {
                            offset: interior.offset,
                        })?;
                    node = self.index.read_node(first.child_pointer as u64)?;
                }
            }
        }
        Err(too_deep())
    }

    /// Lazily yields every leaf key in index order, one leaf page at a time.
    pub fn iter_all(&self) -> LeafKeyIterator<'a, R> {
        LeafKeyIterator::new(*self)
    }

    /// Every leaf key in index order.
    pub fn get_all(&self) -> Result<Vec<CdxLeafEntry>> {
        self.iter_all().collect()
    }

    /// Counts every key by walking the whole leaf chain.
    pub fn count_all(&self) -> Result<u64> {
        self.count_matching(|_| true)
    }

    /// Counts the keys accepted by `predicate` by walking the whole leaf chain.
    pub fn count_matching<P>(&self, predicate: P) -> Result<u64>
    where
        P: Fn(&CdxLeafEntry) -> bool,
    {
        self.iter_all().try_fold(0u64, |count, entry| {
            Ok(count + u64::from(predicate(&entry?)))
        })
    }

    /// Finds every leaf entry the comparator reports as `Equal`.
    ///
    /// Interior nodes are descended through the first entry that is not
    /// `Less`; leaves are scanned until a `Greater` key. When a leaf's last
    /// key still matches, the scan continues into its right sibling.
    ///
    /// # Errors
    /// [`XbaseError::Unsupported`] for descending-order indexes.
    pub fn search<F>(&self, comparator: F) -> Result<Vec<CdxLeafEntry>>
    where
        F: Fn(&[u8]) -> Ordering,
    {
        if self.index.header.order == SortOrder::Descending {
            return Err(XbaseError::Unsupported(
                "search over a descending-order index".to_string(),
            ));
        }

        let Some(mut leaf) = self.descend(&comparator)? else {
            debug!("Search: no interior entry bounds the target");
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        let mut visited = HashSet::from([leaf.offset]);
        loop {
            let mut last_matched = false;
            for (position, entry) in leaf.entries.iter().enumerate() {
                match comparator(&entry.key) {
                    Ordering::Less => {}
                    Ordering::Equal => {
                        matches.push(entry.clone());
                        last_matched = position + 1 == leaf.entries.len();
                    }
                    Ordering::Greater => break,
                }
            }
            match (last_matched, leaf.right_sibling) {
                (true, Some(next)) => {
                    if !visited.insert(next) {
                        return Err(XbaseError::LeafChainCycle {
                            offset: leaf.offset,
                            right_sibling: next,
                        });
                    }
                    trace!("Search continues into right sibling {:#x}", next);
                    leaf = self.read_leaf(next)?;
                }
                _ => break,
            }
        }

        debug!("Search matched {} keys", matches.len());
        Ok(matches)
    }

    /// Follows single branches from the root to the leaf that may hold the target.
    fn descend<F>(&self, comparator: &F) -> Result<Option<LeafCdxNode>>
    where
        F: Fn(&[u8]) -> Ordering,
    {
        let mut node = self.index.root()?;
        for _ in 0..MAX_TREE_DEPTH {
            match node {
                CdxNode::Leaf(leaf) => return Ok(Some(leaf)),
                CdxNode::Interior(interior) => {
                    let Some(entry) = interior
                        .entries
                        .iter()
                        .find(|entry| comparator(&entry.key) != Ordering::Less)
                    else {
                        return Ok(None);
                    };
                    trace!(
                        "Descending from {:#x} to {:#x}",
                        interior.offset, entry.child_pointer
                    );
                    node = self.index.read_node(entry.child_pointer as u64)?;
                }
            }
        }
        Err(too_deep())
    }

    pub(crate) fn read_leaf(&self, offset: u64) -> Result<LeafCdxNode> {
        match self.index.read_node(offset)? {
            CdxNode::Leaf(leaf) => Ok(leaf),
            CdxNode::Interior(interior) => Err(XbaseError::InvalidNodeAttributes {
                offset,
                attributes: interior.attributes.0,
            }),
        }
    }
}

fn too_deep() -> XbaseError {
    XbaseError::Format(format!(
        "index tree is deeper than {} levels",
        MAX_TREE_DEPTH
    ))
}

/// Binary search over an ordered slice.
///
/// Returns the index of a matching element, or the bitwise complement of the
/// insertion point (always negative) when `target` is absent. `compare`
/// orders an element relative to the target; with `ascending == false` the
/// slice is taken to be sorted in reverse.
pub fn binary_search<T, K, C>(entries: &[T], target: &K, compare: C, ascending: bool) -> isize
where
    K: ?Sized,
    C: Fn(&T, &K) -> Ordering,
{
    let mut low = 0isize;
    let mut high = entries.len() as isize - 1;
    while low <= high {
        let middle = low + (high - low) / 2;
        let ordering = compare(&entries[middle as usize], target);
        let ordering = if ascending { ordering } else { ordering.reverse() };
        match ordering {
            Ordering::Equal => return middle,
            Ordering::Less => low = middle + 1,
            Ordering::Greater => high = middle - 1,
        }
    }
    !low
}

/// Comparator matching keys equal to `target`, ignoring trailing spaces and NULs on both sides.
pub fn exact_key(target: &[u8]) -> impl Fn(&[u8]) -> Ordering {
    let target = trim_end_bytes(target, KEY_PAD).to_vec();
    move |key: &[u8]| trim_end_bytes(key, KEY_PAD).cmp(target.as_slice())
}

/// Comparator matching every key that starts with `prefix`.
///
/// A stored key shorter than the prefix still matches when the missing
/// prefix bytes are all padding.
pub fn prefix_key(prefix: &[u8]) -> impl Fn(&[u8]) -> Ordering {
    let prefix = prefix.to_vec();
    move |key: &[u8]| {
        let shared = key.len().min(prefix.len());
        match key[..shared].cmp(&prefix[..shared]) {
            Ordering::Equal if prefix[shared..].iter().all(|b| KEY_PAD.contains(b)) => {
                Ordering::Equal
            }
            Ordering::Equal => Ordering::Less,
            other => other,
        }
    }
}

/// Encodes a number the way numeric index keys store it: big-endian IEEE 754
/// bits with the sign bit flipped for positives and every bit flipped for
/// negatives, so byte order matches numeric order.
pub fn numeric_key(value: f64) -> [u8; 8] {
    let bits = value.to_bits();
    let sortable = if bits & (1 << 63) == 0 {
        bits | (1 << 63)
    } else {
        !bits
    };
    sortable.to_be_bytes()
}

/// Decodes a numeric index key; stripped trailing bytes are restored as zeros.
///
/// Returns `None` for keys longer than 8 bytes.
pub fn numeric_from_key(key: &[u8]) -> Option<f64> {
    if key.len() > 8 {
        return None;
    }
    let mut raw = [0u8; 8];
    raw[..key.len()].copy_from_slice(key);
    let sortable = u64::from_be_bytes(raw);
    let bits = if sortable & (1 << 63) != 0 {
        sortable & !(1 << 63)
    } else {
        !sortable
    };
    Some(f64::from_bits(bits))
}
