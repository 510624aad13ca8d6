//! Foundational data structures, error types, and column type definitions.

pub mod column_types;
pub mod error;
pub mod index_models;
pub mod models;
