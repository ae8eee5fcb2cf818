//! hotplug-indexer Library
//!
//! Records every file found on hot-plugged storage volumes in a local
//! SQLite table. Provides the following capabilities:
//! - Detect mounted hot-plug volumes via `lsblk` (or any `VolumeLister`)
//! - Walk each volume and produce one record per regular file
//! - Append records to the `file_index` table in one transaction
//!
//! Pipeline: Detect (lsblk) -> Scan (walkdir) -> Store (SQLite)

pub mod config;
pub mod error;
pub mod indexer;
pub mod scanner;
pub mod storage;
pub mod volumes;

// Re-export main types
pub use config::Config;
pub use error::{DetectError, ScanError, StoreError};
pub use indexer::{index_roots, run, IndexEvent, IndexSummary, RunOutcome};
pub use scanner::{scan_root, FileRecord};
pub use storage::FileIndex;
pub use volumes::{
    detect_volumes, BlockDevice, LsblkLister, MountFilter, StaticLister, VolumeLister,
};
