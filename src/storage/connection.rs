//! Database connection management
//!
//! Wraps a single rusqlite connection behind a mutex. The pipeline runs
//! single-writer (each commit must be visible to the next recall), so one
//! connection with WAL mode covers the access pattern.

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Arc;

use super::migrations::run_migrations;
use super::queries;
use crate::error::{Result, RetellError};
use crate::types::{MemoryEntry, NewEntry, StorageConfig};

/// Translation memory store over SQLite
pub struct Storage {
    config: StorageConfig,
    conn: Arc<Mutex<Connection>>,
}

impl Storage {
    /// Open or create a database with the given configuration
    pub fn open(config: StorageConfig) -> Result<Self> {
        let conn = Self::create_connection(&config)?;

        run_migrations(&conn)?;

        Ok(Self {
            config,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(dimensions: usize) -> Result<Self> {
        Self::open(StorageConfig {
            db_path: ":memory:".to_string(),
            dimensions,
        })
    }

    fn create_connection(config: &StorageConfig) -> Result<Connection> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = if config.db_path == ":memory:" {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = Path::new(&config.db_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            Connection::open_with_flags(&config.db_path, flags)?
        };

        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=30000;
            PRAGMA temp_store=MEMORY;
            PRAGMA foreign_keys=ON;
            "#,
        )?;

        Ok(conn)
    }

    /// Execute a function with the connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Upsert a source/translation pair, keyed by id.
    ///
    /// Replaces `source_text`/`translation_text`/`embedding`/`reference_url`
    /// when the id already exists; `created_at` is preserved (first write
    /// wins). Idempotent, safe to retry.
    pub fn upsert(&self, entry: &NewEntry) -> Result<MemoryEntry> {
        if entry.embedding.len() != self.config.dimensions {
            return Err(RetellError::InvalidInput(format!(
                "embedding has {} dimensions, store expects {}",
                entry.embedding.len(),
                self.config.dimensions
            )));
        }
        self.with_connection(|conn| queries::upsert_entry(conn, entry))
    }

    /// Nearest neighbors by cosine similarity, descending, at most `limit`.
    ///
    /// Only rows whose stored dimensionality matches the query participate.
    /// Ordering is deterministic: equal similarities tie-break on
    /// `created_at` descending, then id.
    pub fn similarity_search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(MemoryEntry, f32)>> {
        self.with_connection(|conn| queries::similarity_search(conn, query, limit))
    }

    /// Fetch a single entry by id
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        self.with_connection(|conn| queries::get_entry(conn, id))
    }

    /// Total number of stored pairs
    pub fn count(&self) -> Result<i64> {
        self.with_connection(queries::count_entries)
    }

    /// Get configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }
}

impl Clone for Storage {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            conn: self.conn.clone(),
        }
    }
}
