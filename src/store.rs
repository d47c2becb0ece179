use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::config::CACHE_SIZE_KIB;
use crate::error::{Error, Result};
use crate::fts::{self, FtsMode};
use crate::models::{Article, IndexEntry};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    namespace INTEGER NOT NULL,
    content TEXT,
    redirect TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_articles_title ON articles(title);
CREATE INDEX IF NOT EXISTS idx_articles_namespace ON articles(namespace);
CREATE INDEX IF NOT EXISTS idx_articles_redirect ON articles(redirect);

CREATE TABLE IF NOT EXISTS index_entries (
    seek INTEGER NOT NULL,
    article_id INTEGER NOT NULL,
    PRIMARY KEY (seek, article_id)
);
CREATE INDEX IF NOT EXISTS idx_index_entries_seek ON index_entries(seek);
";

const ARTICLE_COLUMNS: &str = "id, title, namespace, content, redirect";

/// Embedded SQLite persistence for articles, index entries, and the
/// derived full-text view.
///
/// One connection per store; access is serialized by the owning [`Wiki`]
/// handle. Batch boundaries are explicit: the ingestion orchestrator
/// brackets runs of inserts with [`begin_batch`]/[`commit_batch`].
///
/// [`Wiki`]: crate::wiki::Wiki
/// [`begin_batch`]: Store::begin_batch
/// [`commit_batch`]: Store::commit_batch
pub struct Store {
    conn: Connection,
    fts_mode: FtsMode,
}

impl Store {
    /// Open (creating if necessary) the database at `db_path`, apply the
    /// pragma profile, create the schema, and probe full-text support.
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// In-memory store, used by tests and capability probing.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL for concurrent readers, relaxed fsync for bulk ingestion
        // throughput, bounded page cache for multi-gigabyte corpora.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "OFF")?;
        conn.pragma_update(None, "cache_size", CACHE_SIZE_KIB)?;

        conn.execute_batch(SCHEMA_SQL)?;
        let fts_mode = fts::detect_or_create(&conn);
        info!(fts = fts_mode.as_str(), "store opened");

        Ok(Self { conn, fts_mode })
    }

    pub fn fts_mode(&self) -> FtsMode {
        self.fts_mode
    }

    /// Sticky process-local demotion, taken when an FTS query fails at
    /// query time.
    pub fn demote_fts(&mut self) {
        if self.fts_mode.is_enabled() {
            warn!(from = self.fts_mode.as_str(), "demoting full-text mode to LIKE scans");
            self.fts_mode = FtsMode::None;
        }
    }

    pub fn begin_batch(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit_batch(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback_batch(&self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Insert or replace by id. The full-text triggers fire within the
    /// same transaction.
    pub fn upsert_article(&self, article: &Article) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR REPLACE INTO articles (id, title, namespace, content, redirect)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        stmt.execute(params![
            article.id,
            article.title,
            article.namespace,
            article.content,
            article.redirect,
        ])?;
        Ok(())
    }

    /// Insert an index entry; duplicate `(seek, article_id)` pairs are
    /// silently dropped.
    pub fn insert_index_entry(&self, entry: IndexEntry) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT OR IGNORE INTO index_entries (seek, article_id) VALUES (?1, ?2)",
        )?;
        stmt.execute(params![entry.seek, entry.article_id])?;
        Ok(())
    }

    /// The set of article ids referenced by the index. Materialized in
    /// memory; the index is small relative to the dump text.
    pub fn distinct_article_ids_from_index(&self) -> Result<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT article_id FROM index_entries")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(ids)
    }

    pub fn find_article_by_title_exact(&self, title: &str) -> Result<Option<Article>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE title = ?1 LIMIT 1"
        ))?;
        let article = stmt
            .query_row(params![title], row_to_article)
            .optional()?;
        Ok(article)
    }

    /// Case-insensitive equality lookup (ASCII case folding, per SQLite's
    /// built-in LOWER).
    pub fn find_article_by_title_ci(&self, title: &str) -> Result<Option<Article>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE LOWER(title) = LOWER(?1) LIMIT 1"
        ))?;
        let article = stmt
            .query_row(params![title], row_to_article)
            .optional()?;
        Ok(article)
    }

    pub fn find_article_by_id(&self, id: i64) -> Result<Option<Article>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1"
        ))?;
        let article = stmt.query_row(params![id], row_to_article).optional()?;
        Ok(article)
    }

    /// Full-text title search with an already-built match expression.
    /// FTS5 orders by its `rank` column; FTS4 keeps the engine's default
    /// ordering. Duplicate titles are collapsed, preserving rank order.
    pub fn search_fts(&self, match_expr: &str, limit: usize) -> Result<Vec<String>> {
        let sql = match self.fts_mode {
            FtsMode::Fts5 => {
                "SELECT title FROM articles_fts WHERE articles_fts MATCH ?1 ORDER BY rank LIMIT ?2"
            }
            FtsMode::Fts4 => "SELECT title FROM articles_fts WHERE articles_fts MATCH ?1 LIMIT ?2",
            FtsMode::None => {
                return Err(Error::InvalidInput(
                    "full-text search is not available".to_string(),
                ))
            }
        };
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params![match_expr, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut seen = HashSet::new();
        let mut titles = Vec::new();
        for title in rows {
            let title = title?;
            if seen.insert(title.clone()) {
                titles.push(title);
            }
        }
        Ok(titles)
    }

    /// Substring fallback: `title LIKE '%pattern%'`, lexicographic order.
    pub fn search_like(&self, pattern: &str, limit: usize) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT title FROM articles WHERE title LIKE ?1 ORDER BY title LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![format!("%{pattern}%"), limit as i64], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    pub fn article_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?)
    }

    pub fn index_entry_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM index_entries", [], |row| row.get(0))?)
    }

    /// Direct access for consistency checks in tests.
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn row_to_article(row: &rusqlite::Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        title: row.get(1)?,
        namespace: row.get(2)?,
        content: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        redirect: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
    })
}
