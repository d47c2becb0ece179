use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Commit every N index entries during index ingestion.
pub const INDEX_BATCH_SIZE: usize = 10_000;

/// Commit every N kept pages during article ingestion.
pub const ARTICLE_BATCH_SIZE: usize = 1_000;

/// Maximum stored article body in bytes (larger bodies are truncated).
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Index lines longer than this are rejected with a diagnostic.
pub const MAX_INDEX_LINE_BYTES: usize = 1024 * 1024;

/// Result cap applied when a search limit is zero or negative.
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Database page cache, in KiB (negative per SQLite convention). ~10 MiB.
pub const CACHE_SIZE_KIB: i64 = -10_000;

pub const DEFAULT_INDEX_FILE: &str = "articles-multistream-index.txt.bz2";
pub const DEFAULT_ARTICLES_FILE: &str = "articles-multistream.xml.bz2";
pub const DB_FILE: &str = "wikipedia.db";

/// Runtime settings resolved from the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub dump_path: PathBuf,
    pub index_file: String,
    pub articles_file: String,
}

impl Settings {
    /// Read `DUMP_PATH` (required), `INDEX_FILE` and `ARTICLES_FILE`
    /// (optional overrides) from the environment.
    pub fn from_env() -> Result<Self> {
        let dump_path = env::var("DUMP_PATH")
            .map_err(|_| Error::Config("DUMP_PATH environment variable is not set".to_string()))?;
        let dump_path = PathBuf::from(dump_path);
        if !dump_path.is_dir() {
            return Err(Error::Config(format!(
                "DUMP_PATH is not a readable directory: {}",
                dump_path.display()
            )));
        }

        Ok(Self {
            dump_path,
            index_file: env::var("INDEX_FILE").unwrap_or_else(|_| DEFAULT_INDEX_FILE.to_string()),
            articles_file: env::var("ARTICLES_FILE")
                .unwrap_or_else(|_| DEFAULT_ARTICLES_FILE.to_string()),
        })
    }

    pub fn with_dump_path(dump_path: impl AsRef<Path>) -> Self {
        Self {
            dump_path: dump_path.as_ref().to_path_buf(),
            index_file: DEFAULT_INDEX_FILE.to_string(),
            articles_file: DEFAULT_ARTICLES_FILE.to_string(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.dump_path.join(&self.index_file)
    }

    pub fn articles_path(&self) -> PathBuf {
        self.dump_path.join(&self.articles_file)
    }

    pub fn db_path(&self) -> PathBuf {
        self.dump_path.join(DB_FILE)
    }
}
