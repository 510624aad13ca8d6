//! File format parsing layer for xBase tables and compact indexes.
//!
//! This module turns raw bytes into the structures defined in
//! [`types`](crate::xbase::types). It never decodes field values; that is the
//! job of [`codec`](crate::xbase::codec).
//!
//! # Module Organization
//!
//! - [`dbf_header`]: Table header and column descriptors
//! - [`cdx_header`]: Index header with key and FOR expressions
//! - [`cdx_node`]: Interior and compressed leaf B-tree pages
//!
//! # Architecture
//!
//! ```text
//! .dbf                              .cdx / .idx
//! ┌──────────────────────┐          ┌──────────────────────┐
//! │ 32-byte header       │ ←        │ 1024-byte header     │ ← cdx_header::parse()
//! ├──────────────────────┤  dbf_    ├──────────────────────┤
//! │ 32-byte descriptors  │  header  │ 512-byte nodes       │ ← cdx_node::decode()
//! │ ... 0x0D             │          │  interior: key/rec/  │
//! ├──────────────────────┤          │            child     │
//! │ records              │          │  leaf: bit-packed    │
//! │ (status byte + data) │          │        entries + keys│
//! └──────────────────────┘          └──────────────────────┘
//! ```

pub mod cdx_header;
pub mod cdx_node;
pub mod dbf_header;
