//! Scanner module - Walk a volume and produce file records.
//!
//! `scan_root` returns a lazy iterator over every regular file below a root.
//! Each item is a `Result`, so one unreadable file or directory surfaces as
//! a single `Err` and the walk goes on with the next entry.
//!
//! Symlinks are not followed for descent. A symlink pointing to a regular
//! file is recorded with the target's size and mtime.

use crate::error::ScanError;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use walkdir::WalkDir;

/// Metadata of one file, as stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Full path (root joined with every directory level)
    pub path: PathBuf,
    /// Base file name
    pub name: String,
    /// File size (bytes)
    pub size: u64,
    /// Modification time (seconds since Unix epoch)
    pub modified_at: f64,
}

impl FileRecord {
    /// Stat a path and build its record.
    pub fn from_path(path: &Path) -> Result<Self, ScanError> {
        let metadata = fs::metadata(path).map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        if !metadata.is_file() {
            return Err(ScanError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let modified = metadata.modified().map_err(|source| ScanError::Metadata {
            path: path.to_path_buf(),
            source,
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            modified_at: unix_seconds(modified),
        })
    }
}

/// Convert a timestamp to fractional seconds since the Unix epoch.
/// Times before the epoch come out negative.
pub fn unix_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

/// Lazy walk over one root.
pub struct RootScan {
    root: PathBuf,
    walker: walkdir::IntoIter,
}

impl Iterator for RootScan {
    type Item = Result<FileRecord, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(ScanError::Walk { path, source: err }));
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            match FileRecord::from_path(entry.path()) {
                // Sockets, FIFOs, device nodes, symlinks to directories
                Err(ScanError::NotAFile { path }) => {
                    debug!("[Scan] Not a regular file, ignoring: {}", path.display());
                    continue;
                }
                other => return Some(other),
            }
        }
    }
}

/// Start walking `root`.
///
/// Fails up front with `ScanError::RootUnavailable` when the root itself
/// cannot be listed, so callers can skip the whole volume.
pub fn scan_root(root: &Path) -> Result<RootScan, ScanError> {
    fs::read_dir(root).map_err(|source| ScanError::RootUnavailable {
        path: root.to_path_buf(),
        source,
    })?;

    Ok(RootScan {
        root: root.to_path_buf(),
        walker: WalkDir::new(root).sort_by_file_name().into_iter(),
    })
}
