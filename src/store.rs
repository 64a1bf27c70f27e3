//! Persistent translation cache store backed by SQLite.
//!
//! One row per exact (document, content fingerprint, target language)
//! combination; the uniqueness lives in the schema so it holds under
//! concurrent inserts and across process instances. The insert path is an
//! `INSERT ... ON CONFLICT DO NOTHING` followed by a re-query: the loser of
//! a duplicate-insert race gets the winner's row back instead of an error.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// A persisted translation record.
#[derive(Debug, Clone)]
pub struct Translation {
    pub id: String,
    pub document_id: String,
    pub fingerprint: String,
    pub source_language: String,
    pub target_language: String,
    pub original_text: String,
    pub translated_text: String,
    /// User who triggered the translation. Informational only; any user can
    /// hit the cache for the same fingerprint.
    pub owner_user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A translation about to be persisted.
#[derive(Debug, Clone)]
pub struct NewTranslation {
    pub document_id: String,
    pub fingerprint: String,
    pub source_language: String,
    pub target_language: String,
    pub original_text: String,
    pub translated_text: String,
    pub owner_user_id: String,
}

/// SQLite-backed translation cache store.
///
/// Cheap to clone; all clones share one connection. Calls are blocking and
/// are expected to run under `tokio::task::spawn_blocking` on async paths.
#[derive(Clone)]
pub struct TranslationStore {
    conn: Arc<Mutex<Connection>>,
}

impl TranslationStore {
    /// Open (or create) the store at the given path.
    pub fn open(path: impl AsRef<Path>) -> ApiResult<Self> {
        let conn = Connection::open(path)?;

        // WAL mode: readers don't block writers and vice versa. NORMAL sync
        // is sufficient for a cache of recomputable data.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Open an in-memory store. Used by tests; the schema matches `open`.
    pub fn open_in_memory() -> ApiResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> ApiResult<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS translations (
                id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                source_language TEXT NOT NULL,
                target_language TEXT NOT NULL,
                original_text TEXT NOT NULL,
                translated_text TEXT NOT NULL,
                owner_user_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE(document_id, fingerprint, target_language)
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Look up a cached translation by its unique key.
    pub fn lookup(
        &self,
        document_id: &str,
        fingerprint: &str,
        target_language: &str,
    ) -> ApiResult<Option<Translation>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT id, document_id, fingerprint, source_language, target_language,
                        original_text, translated_text, owner_user_id, created_at
                 FROM translations
                 WHERE document_id = ?1 AND fingerprint = ?2 AND target_language = ?3",
                params![document_id, fingerprint, target_language],
                from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Insert a new record, or return the existing row when a concurrent
    /// insert already created one for the same unique key.
    ///
    /// Returns the stored record plus whether this call's insert won. The
    /// loser's freshly translated text is discarded in favor of the row that
    /// won the race, so every caller observes identical stored content.
    pub fn insert_or_get(&self, new: NewTranslation) -> ApiResult<(Translation, bool)> {
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().timestamp();

        let conn = self.lock()?;
        let changes = conn.execute(
            "INSERT INTO translations
                (id, document_id, fingerprint, source_language, target_language,
                 original_text, translated_text, owner_user_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(document_id, fingerprint, target_language) DO NOTHING",
            params![
                id,
                new.document_id,
                new.fingerprint,
                new.source_language,
                new.target_language,
                new.original_text,
                new.translated_text,
                new.owner_user_id,
                created_at,
            ],
        )?;
        let inserted = changes == 1;

        // Re-query in both cases: the winner reads its own row back, the
        // loser reads the winner's.
        let row = conn.query_row(
            "SELECT id, document_id, fingerprint, source_language, target_language,
                    original_text, translated_text, owner_user_id, created_at
             FROM translations
             WHERE document_id = ?1 AND fingerprint = ?2 AND target_language = ?3",
            params![new.document_id, new.fingerprint, new.target_language],
            from_row,
        )?;

        Ok((row, inserted))
    }

    /// Cheap connectivity check for the readiness probe.
    pub fn ping(&self) -> ApiResult<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ApiError::Storage("store mutex poisoned".to_string()))
    }
}

fn from_row(row: &Row) -> rusqlite::Result<Translation> {
    let created_at: i64 = row.get(8)?;
    Ok(Translation {
        id: row.get(0)?,
        document_id: row.get(1)?,
        fingerprint: row.get(2)?,
        source_language: row.get(3)?,
        target_language: row.get(4)?,
        original_text: row.get(5)?,
        translated_text: row.get(6)?,
        owner_user_id: row.get(7)?,
        created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
    })
}
