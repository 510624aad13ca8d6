use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

use log::{debug, info};

use super::format::{cdx_header, cdx_node};
use super::search::IndexSearcher;
use super::types::error::{Result, XbaseError};
use super::types::index_models::{CdxIndexHeader, CdxNode, CDX_NODE_SIZE};
use super::utils;

/// An open compact (`.idx`) or compound (`.cdx`) index file.
///
/// Only the header is read up front. Nodes are paged in by offset on every
/// [`read_node`](Self::read_node) call and are never cached.
#[derive(Debug)]
pub struct CdxFile<R: Read + Seek = BufReader<File>> {
    source: Arc<Mutex<R>>,
    pub header: CdxIndexHeader,
}

impl CdxFile<BufReader<File>> {
    /// Opens an index file and parses its 1024-byte header.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or its header is short.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening index file: {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}

impl<R: Read + Seek> CdxFile<R> {
    /// Parses the index header from a stream positioned anywhere.
    pub fn from_reader(mut source: R) -> Result<Self> {
        source.seek(SeekFrom::Start(0))?;
        let header = cdx_header::parse(&mut source)?;
        info!(
            "Index opened: key length {}, root {:#x}, {:?}, key '{}'",
            header.key_length, header.root_pointer, header.order, header.key_expression
        );
        Ok(Self {
            source: Arc::new(Mutex::new(source)),
            header,
        })
    }

    pub fn header(&self) -> &CdxIndexHeader {
        &self.header
    }

    /// Reads and decodes the 512-byte node at `offset`.
    ///
    /// # Errors
    /// - [`XbaseError::Format`] when fewer than 512 bytes are available at `offset`
    /// - corruption errors from node decoding
    pub fn read_node(&self, offset: u64) -> Result<CdxNode> {
        let mut page = vec![0u8; CDX_NODE_SIZE];
        let read = {
            let mut source = self.source.lock().map_err(|_| XbaseError::LockPoisoned)?;
            source.seek(SeekFrom::Start(offset))?;
            utils::read_fully(&mut *source, &mut page)?
        };
        if read < CDX_NODE_SIZE {
            return Err(XbaseError::Format(format!(
                "Node at offset {} is {} bytes, expected {}",
                offset, read, CDX_NODE_SIZE
            )));
        }
        let node = cdx_node::decode(&page, offset, self.header.key_length)?;
        debug!(
            "Read {} node at {:#x} with {} keys",
            if matches!(node, CdxNode::Leaf(_)) { "leaf" } else { "interior" },
            offset,
            node.key_count()
        );
        Ok(node)
    }

    /// Reads the root node named by the header.
    pub fn root(&self) -> Result<CdxNode> {
        self.read_node(self.header.root_pointer as u64)
    }

    /// Searcher over this index's B-tree.
    pub fn searcher(&self) -> IndexSearcher<'_, R> {
        IndexSearcher::new(self)
    }

    /// Looks up a named tag inside a compound index.
    ///
    /// # Errors
    /// Always [`XbaseError::Unsupported`]: tag directories are not decoded.
    pub fn read_index(&self, tag: &str) -> Result<CdxIndexHeader> {
        Err(XbaseError::Unsupported(format!(
            "compound index tag lookup ('{}')",
            tag
        )))
    }
}
