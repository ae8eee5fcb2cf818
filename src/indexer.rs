//! Indexer module - Detect volumes and record their files.
//!
//! Pipeline: ensure table -> detect volumes -> walk each root -> insert rows
//! -> commit once. Skips happen at the narrowest scope: one file, then one
//! root. Only store failures abort the run.

use crate::config::Config;
use crate::error::{ScanError, StoreResult};
use crate::scanner::scan_root;
use crate::storage::{AppendStats, FileIndex};
use crate::volumes::{detect_volumes, MountFilter, VolumeLister};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Notifications emitted while indexing, for console output.
#[derive(Debug)]
pub enum IndexEvent<'a> {
    /// Volume detection finished (only emitted by `run`)
    VolumesDetected(&'a [PathBuf]),
    /// Walking a root begins
    RootStarted(&'a Path),
    /// A root could not be opened and was skipped
    RootSkipped { root: &'a Path, error: &'a ScanError },
    /// Total files indexed so far, every `progress_interval` files
    Progress(usize),
    /// A root has been fully walked
    RootFinished { root: &'a Path, stats: AppendStats },
}

/// Totals of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    /// Rows inserted
    pub indexed: usize,
    /// Files skipped because stat or insert failed
    pub skipped_files: usize,
    /// Roots walked
    pub roots_scanned: usize,
    /// Roots that could not be opened
    pub skipped_roots: usize,
}

/// Result of `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Detection found nothing to index
    NoVolumes,
    /// Volumes were detected and walked (possibly finding zero files)
    Indexed {
        volumes: Vec<PathBuf>,
        summary: IndexSummary,
    },
}

/// Walk every root and append one row per regular file.
///
/// All inserts share one transaction, committed after the last root.
/// `progress_interval` of 0 disables `IndexEvent::Progress`.
pub fn index_roots<F>(
    index: &mut FileIndex,
    roots: &[PathBuf],
    progress_interval: usize,
    mut on_event: F,
) -> StoreResult<IndexSummary>
where
    F: FnMut(IndexEvent<'_>),
{
    let writer = index.writer()?;
    let mut summary = IndexSummary::default();

    for root in roots {
        debug!("[Index] Scanning drive: {}", root.display());
        on_event(IndexEvent::RootStarted(root));

        let scan = match scan_root(root) {
            Ok(scan) => scan,
            Err(e) => {
                debug!("[Index] Error accessing drive {}: {}", root.display(), e);
                summary.skipped_roots += 1;
                on_event(IndexEvent::RootSkipped { root, error: &e });
                continue;
            }
        };

        let stats = writer.append(scan, |_| {
            summary.indexed += 1;
            if progress_interval > 0 && summary.indexed % progress_interval == 0 {
                on_event(IndexEvent::Progress(summary.indexed));
            }
        });

        summary.skipped_files += stats.skipped;
        summary.roots_scanned += 1;
        on_event(IndexEvent::RootFinished { root, stats });
    }

    writer.commit()?;

    debug!(
        "[Index] Indexing complete! Total files indexed: {} ({} skipped)",
        summary.indexed, summary.skipped_files
    );

    Ok(summary)
}

/// Full run: ensure the table exists, detect volumes, index them.
pub fn run<F>(config: &Config, lister: &dyn VolumeLister, mut on_event: F) -> StoreResult<RunOutcome>
where
    F: FnMut(IndexEvent<'_>),
{
    let mut index = FileIndex::open(&config.database_path)?;
    debug!("[Index] Using database {}", config.database_path.display());

    let volumes = detect_volumes(lister, &MountFilter::from_config(&config.filter));
    on_event(IndexEvent::VolumesDetected(&volumes));

    if volumes.is_empty() {
        debug!("[Index] No external drives detected");
        return Ok(RunOutcome::NoVolumes);
    }

    let summary = index_roots(&mut index, &volumes, config.progress_interval, on_event)?;
    Ok(RunOutcome::Indexed { volumes, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volumes::{BlockDevice, StaticLister};
    use std::fs;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Shared sink for formatted log lines.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Index `roots` under a subscriber capped at `level`, return what it logged.
    fn logged_while_indexing(roots: &[PathBuf], level: tracing::Level) -> String {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();

        let mut index = FileIndex::open_in_memory().unwrap();
        tracing::subscriber::with_default(subscriber, || {
            index_roots(&mut index, roots, 1, |_| {}).unwrap();
        });

        let bytes = logs.0.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes).to_string()
    }

    fn populate(dir: &Path, count: usize) {
        for i in 0..count {
            let sub = dir.join(format!("d{}", i % 3));
            fs::create_dir_all(&sub).unwrap();
            fs::write(sub.join(format!("f{}.bin", i)), vec![0u8; i]).unwrap();
        }
    }

    #[test]
    fn test_progress_every_interval() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 25);

        let mut index = FileIndex::open_in_memory().unwrap();
        let mut progress = Vec::new();
        let summary = index_roots(&mut index, &[temp.path().to_path_buf()], 10, |event| {
            if let IndexEvent::Progress(n) = event {
                progress.push(n);
            }
        })
        .unwrap();

        assert_eq!(summary.indexed, 25);
        assert_eq!(progress, vec![10, 20]);
        assert_eq!(index.count().unwrap(), 25);
    }

    #[test]
    fn test_reported_events_stay_below_info() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 3);
        let roots = vec![temp.path().to_path_buf(), temp.path().join("unmounted")];

        let info = logged_while_indexing(&roots, tracing::Level::INFO);
        assert!(info.is_empty(), "unexpected output at info: {}", info);

        let debug = logged_while_indexing(&roots, tracing::Level::DEBUG);
        assert!(debug.contains("[Index] Scanning drive"));
        assert!(debug.contains("[Index] Error accessing drive"));
    }

    #[test]
    fn test_progress_disabled() {
        let temp = TempDir::new().unwrap();
        populate(temp.path(), 5);

        let mut index = FileIndex::open_in_memory().unwrap();
        let mut progress = 0;
        index_roots(&mut index, &[temp.path().to_path_buf()], 0, |event| {
            if let IndexEvent::Progress(_) = event {
                progress += 1;
            }
        })
        .unwrap();
        assert_eq!(progress, 0);
    }

    #[test]
    fn test_progress_counts_across_roots() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        populate(a.path(), 3);
        populate(b.path(), 3);

        let mut index = FileIndex::open_in_memory().unwrap();
        let mut progress = Vec::new();
        let roots = vec![a.path().to_path_buf(), b.path().to_path_buf()];
        index_roots(&mut index, &roots, 4, |event| {
            if let IndexEvent::Progress(n) = event {
                progress.push(n);
            }
        })
        .unwrap();
        assert_eq!(progress, vec![4]);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let good = TempDir::new().unwrap();
        populate(good.path(), 4);
        let missing = good.path().join("not-mounted");

        let mut index = FileIndex::open_in_memory().unwrap();
        let mut skipped = Vec::new();
        let roots = vec![missing.clone(), good.path().to_path_buf()];
        let summary = index_roots(&mut index, &roots, 100, |event| {
            if let IndexEvent::RootSkipped { root, .. } = event {
                skipped.push(root.to_path_buf());
            }
        })
        .unwrap();

        assert_eq!(skipped, vec![missing]);
        assert_eq!(
            summary,
            IndexSummary {
                indexed: 4,
                skipped_files: 0,
                roots_scanned: 1,
                skipped_roots: 1,
            }
        );
    }

    #[test]
    fn test_run_without_volumes() {
        let temp = TempDir::new().unwrap();
        let config = Config::with_database_path(temp.path().join("storage_index.db"));
        let lister = StaticLister::new(vec![BlockDevice::mounted("/", false)]);

        let outcome = run(&config, &lister, |_| {}).unwrap();
        assert_eq!(outcome, RunOutcome::NoVolumes);

        // Table is created even when nothing is indexed
        let index = FileIndex::open(&config.database_path).unwrap();
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_run_with_failing_lister() {
        let temp = TempDir::new().unwrap();
        let config = Config::with_database_path(temp.path().join("storage_index.db"));
        let lister = StaticLister::failing("exit status: 32");

        let outcome = run(&config, &lister, |_| {}).unwrap();
        assert_eq!(outcome, RunOutcome::NoVolumes);
    }

    #[test]
    fn test_run_indexes_detected_volume() {
        let temp = TempDir::new().unwrap();
        let volume = temp.path().join("usb1");
        populate(&volume, 6);
        let config = Config::with_database_path(temp.path().join("storage_index.db"));
        let lister = StaticLister::new(vec![BlockDevice::mounted(
            volume.to_str().unwrap(),
            true,
        )]);

        let mut detected = Vec::new();
        let outcome = run(&config, &lister, |event| {
            if let IndexEvent::VolumesDetected(v) = event {
                detected = v.to_vec();
            }
        })
        .unwrap();

        assert_eq!(detected, vec![volume.clone()]);
        match outcome {
            RunOutcome::Indexed { volumes, summary } => {
                assert_eq!(volumes, vec![volume]);
                assert_eq!(summary.indexed, 6);
            }
            other => panic!("expected Indexed, got {:?}", other),
        }
    }
}
