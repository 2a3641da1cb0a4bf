//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for durability and concurrency (WAL mode), running migrations, and
//! measuring how much disk the store occupies.

use super::migrations;
use crate::Error;
use crate::eviction::EvictionPolicy;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio_rusqlite::{Connection, rusqlite};
use walkdir::WalkDir;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=FULL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Where the store lives, which decides how its size is measured.
#[derive(Clone, Debug)]
pub(crate) enum Location {
    Memory,
    File(PathBuf),
}

impl Location {
    /// Measure the persisted size; runs on the connection thread.
    pub(crate) fn measure(&self, conn: &rusqlite::Connection) -> Result<u64, Error> {
        match self {
            Location::Memory => {
                let pages: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
                let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
                Ok((pages * page_size).max(0) as u64)
            }
            Location::File(path) => measure_files(path),
        }
    }
}

/// Persistent store handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations
/// on a background thread, one at a time. Clones share that thread.
#[derive(Clone, Debug)]
pub struct Store {
    pub(crate) conn: Connection,
    location: Location,
    eviction: EvictionPolicy,
}

impl Store {
    /// Open a store at the specified path.
    ///
    /// Creates the parent directory and the file if they don't exist,
    /// applies pragmas, and runs any pending migrations. Opening the same
    /// file repeatedly is safe.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Storage(format!("failed to create {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(&path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, Location::File(path)).await
    }

    /// Open an in-memory store for testing.
    ///
    /// Creates a temporary in-memory SQLite database with the same
    /// pragma configuration as file-based stores.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, Location::Memory).await
    }

    async fn init(conn: Connection, location: Location) -> Result<Self, Error> {
        conn.call(|conn| conn.execute_batch(PRAGMAS))
            .await
            .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, location, eviction: EvictionPolicy::default() })
    }

    /// Replace the eviction policy applied after conversation writes.
    pub fn with_eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    /// The eviction policy applied after conversation writes.
    pub fn eviction(&self) -> &EvictionPolicy {
        &self.eviction
    }

    pub(crate) fn location(&self) -> &Location {
        &self.location
    }

    /// Path of the store file, or `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    /// Total persisted size in bytes.
    ///
    /// File-backed stores count every file in the store's directory, which
    /// covers WAL side files and export snapshots kept next to the store.
    /// In-memory stores report their page footprint.
    pub async fn size_bytes(&self) -> Result<u64, Error> {
        let location = self.location.clone();
        self.conn
            .call(move |conn| location.measure(conn))
            .await
            .map_err(Error::from)
    }
}

fn measure_files(db_path: &Path) -> Result<u64, Error> {
    let Some(dir) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        // A bare file name: only the store file and its side files.
        let mut total = 0;
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut name = db_path.as_os_str().to_owned();
            name.push(suffix);
            total += file_len(Path::new(&name))?;
        }
        return Ok(total);
    };

    let mut total = 0;
    for entry in WalkDir::new(dir) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.io_error().is_some_and(|io| io.kind() == ErrorKind::NotFound) => continue,
            Err(e) => return Err(Error::Storage(format!("failed to measure {}: {e}", dir.display()))),
        };
        if entry.file_type().is_file() {
            total += file_len(entry.path())?;
        }
    }
    Ok(total)
}

fn file_len(path: &Path) -> Result<u64, Error> {
    match std::fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(Error::Storage(format!("failed to stat {}: {e}", path.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = Store::open_in_memory().await.unwrap();
        let version = store
            .conn
            .call(|conn| conn.query_row("SELECT sqlite_version()", [], |row| row.get::<_, String>(0)))
            .await
            .unwrap();
        assert!(!version.is_empty());
        assert!(store.path().is_none());
        assert!(store.size_bytes().await.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_open_twice_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("offline_data.db");

        let first = Store::open(&path).await.unwrap();
        drop(first);
        let second = Store::open(&path).await.unwrap();

        let tables: i64 = second
            .conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN
                     ('conversations', 'cache_entries', 'user_preferences')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 3);
        assert_eq!(second.path(), Some(path.as_path()));
    }

    #[tokio::test]
    async fn test_size_counts_sibling_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("offline_data.db")).await.unwrap();
        let before = store.size_bytes().await.unwrap();

        std::fs::write(dir.path().join("offline_backup_test.json"), vec![b'x'; 4096]).unwrap();

        let after = store.size_bytes().await.unwrap();
        assert!(after >= before + 4096);
    }

    #[test]
    fn test_measure_missing_bare_file() {
        let total = measure_files(Path::new("definitely-not-here.db")).unwrap();
        assert_eq!(total, 0);
    }
}
