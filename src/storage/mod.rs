//! Storage module - Persistent file index.
//!
//! This module contains:
//! - SQLite `file_index` table management
//! - Batched writer used by the indexer

pub mod index;

pub use index::{AppendStats, FileIndex, IndexWriter};
