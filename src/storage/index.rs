//! SQLite file index - Append-only table of scanned files.
//!
//! The table is created on open if missing and never altered afterwards.
//! Rows are only ever inserted: re-indexing the same volume appends a
//! second copy of every file.

use crate::error::{ScanError, StoreError, StoreResult};
use crate::scanner::FileRecord;
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use tracing::warn;

const INSERT_SQL: &str = "INSERT INTO file_index (file_path, file_name, file_size, date_modified)
     VALUES (?1, ?2, ?3, ?4)";

/// SQLite index of file records
pub struct FileIndex {
    conn: Connection,
}

impl FileIndex {
    /// Open or create the index database
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(db_path).map_err(|source| StoreError::Open {
            path: db_path.to_path_buf(),
            source,
        })?;

        let index = Self { conn };
        index.init_schema()?;

        Ok(index)
    }

    /// Open index database in memory (for testing)
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let index = Self { conn };
        index.init_schema()?;
        Ok(index)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS file_index (
                id INTEGER PRIMARY KEY,
                file_path TEXT NOT NULL,
                file_name TEXT NOT NULL,
                file_size INTEGER NOT NULL,
                date_modified REAL NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Insert a single record outside of any batch
    pub fn insert(&self, record: &FileRecord) -> StoreResult<i64> {
        self.conn.execute(
            INSERT_SQL,
            params![
                path_text(record),
                record.name,
                record.size as i64,
                record.modified_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Number of rows in the index
    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_index", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Start a batch. Nothing is visible to other connections until
    /// `IndexWriter::commit`.
    pub fn writer(&mut self) -> StoreResult<IndexWriter<'_>> {
        Ok(IndexWriter {
            tx: self.conn.transaction()?,
        })
    }
}

fn path_text(record: &FileRecord) -> String {
    record.path.to_string_lossy().to_string()
}

/// Outcome of one `IndexWriter::append` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendStats {
    /// Rows written
    pub inserted: usize,
    /// Records dropped because stat or insert failed
    pub skipped: usize,
}

/// One transaction over the index
pub struct IndexWriter<'a> {
    tx: Transaction<'a>,
}

impl IndexWriter<'_> {
    /// Insert one record inside the batch
    pub fn insert(&self, record: &FileRecord) -> StoreResult<()> {
        let mut stmt = self.tx.prepare_cached(INSERT_SQL)?;
        stmt.execute(params![
            path_text(record),
            record.name,
            record.size as i64,
            record.modified_at,
        ])?;
        Ok(())
    }

    /// Drain a record stream into the batch.
    ///
    /// Scan errors and failed inserts are logged and counted, never returned.
    /// `on_inserted` runs after every successful insert.
    pub fn append<I, F>(&self, records: I, mut on_inserted: F) -> AppendStats
    where
        I: IntoIterator<Item = Result<FileRecord, ScanError>>,
        F: FnMut(&FileRecord),
    {
        let mut stats = AppendStats::default();

        for item in records {
            let record = match item {
                Ok(record) => record,
                Err(e) => {
                    warn!("[Index] Skipping file {}: {}", e.path().display(), e);
                    stats.skipped += 1;
                    continue;
                }
            };

            match self.insert(&record) {
                Ok(()) => {
                    stats.inserted += 1;
                    on_inserted(&record);
                }
                Err(e) => {
                    warn!("[Index] Skipping file {}: {}", record.name, e);
                    stats.skipped += 1;
                }
            }
        }

        stats
    }

    /// Commit every insert of the batch
    pub fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}
