//! Decoding layer for record data.
//!
//! # Submodules
//!
//! - [`value`][]: Typed field decoding for every column type
//! - [`runs`][]: Column-subset plans that decode chosen columns and skip the rest

pub mod runs;
pub mod value;
