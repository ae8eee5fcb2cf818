//! Error types for hotplug-indexer.
//!
//! Errors are grouped by the scope at which they are handled:
//! - `DetectError`: device listing failed, the detector degrades to "no drives"
//! - `ScanError`: one file or one root could not be read, it is skipped
//! - `StoreError`: the SQLite store failed, the run is aborted

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Block-device listing errors
#[derive(Error, Debug)]
pub enum DetectError {
    /// The listing command could not be started
    #[error("Cannot execute '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The listing command ran but reported failure
    #[error("'{program}' exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The listing command printed something that is not the expected JSON
    #[error("Cannot parse block device listing: {0}")]
    Parse(#[from] serde_json::Error),

    /// Static failure injected by a test lister
    #[error("{0}")]
    Other(String),
}

/// Filesystem errors raised while walking a root
#[derive(Error, Debug)]
pub enum ScanError {
    /// The whole root cannot be listed (unmounted, permission denied, ...)
    #[error("Cannot access root '{}': {source}", path.display())]
    RootUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A directory entry below the root could not be read
    #[error("Cannot read entry '{}': {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Size or modification time could not be resolved
    #[error("Cannot stat '{}': {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The path resolved to something other than a regular file
    #[error("Not a regular file: '{}'", path.display())]
    NotAFile { path: PathBuf },
}

impl ScanError {
    /// Path the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::RootUnavailable { path, .. }
            | Self::Walk { path, .. }
            | Self::Metadata { path, .. }
            | Self::NotAFile { path } => path,
        }
    }
}

/// SQLite store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database file cannot be opened or created
    #[error("Cannot open index database '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Parent directory of the database file cannot be created
    #[error("Cannot create directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Any other SQLite failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
