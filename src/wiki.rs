use std::collections::HashSet;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use indicatif::ProgressBar;
use tracing::{info, warn};

use crate::config::{
    Settings, ARTICLE_BATCH_SIZE, DEFAULT_SEARCH_LIMIT, INDEX_BATCH_SIZE, MAX_CONTENT_BYTES,
};
use crate::decompress;
use crate::error::{Error, Result};
use crate::fts::{self, FtsMode};
use crate::index::IndexReader;
use crate::models::{Article, Page};
use crate::parser::PageReader;
use crate::stats::IngestStats;
use crate::store::Store;

/// Row counts and search capability, reported at startup.
#[derive(Debug, Clone)]
pub struct WikiStatus {
    pub articles: i64,
    pub index_entries: i64,
    pub fts: FtsMode,
}

/// The owning handle over the dump files and the backing store.
///
/// All operations serialize through one SQLite connection behind a mutex
/// (`rusqlite::Connection` is `Send` but not `Sync`). `open` is
/// idempotent and every operation opens the store on first use, so the
/// preprocessing commands and the serving path share one code path.
pub struct Wiki {
    index_path: PathBuf,
    articles_path: PathBuf,
    db_path: PathBuf,
    store: Mutex<Option<Store>>,
}

impl Wiki {
    pub fn new(
        dump_path: impl AsRef<Path>,
        index_file: &str,
        articles_file: &str,
    ) -> Self {
        let dump_path = dump_path.as_ref();
        Self {
            index_path: dump_path.join(index_file),
            articles_path: dump_path.join(articles_file),
            db_path: dump_path.join(crate::config::DB_FILE),
            store: Mutex::new(None),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.dump_path,
            &settings.index_file,
            &settings.articles_file,
        )
    }

    /// Open the backing store. A no-op when already open.
    pub fn open(&self) -> Result<()> {
        self.ensure_open().map(|_| ())
    }

    /// Drop the store connection. Subsequent operations reopen it.
    pub fn close(&self) -> Result<()> {
        let mut guard = self.lock()?;
        *guard = None;
        Ok(())
    }

    pub fn status(&self) -> Result<WikiStatus> {
        let guard = self.ensure_open()?;
        let store = borrow_store(&guard)?;
        Ok(WikiStatus {
            articles: store.article_count()?,
            index_entries: store.index_entry_count()?,
            fts: store.fts_mode(),
        })
    }

    /// Load the compressed index file into `index_entries`.
    ///
    /// Commits every [`INDEX_BATCH_SIZE`] entries; stops after `limit`
    /// entries when `limit > 0`. The cancellation flag is checked at batch
    /// boundaries: the open batch is rolled back, committed batches stay.
    pub fn load_index(&self, limit: i64, cancel: Option<&AtomicBool>) -> Result<IngestStats> {
        let guard = self.ensure_open()?;
        let store = borrow_store(&guard)?;

        info!(path = %self.index_path.display(), "loading index");
        let mut entries = IndexReader::new(decompress::open_bz2(&self.index_path)?);
        let stats = IngestStats::new();
        let pb = ProgressBar::new_spinner();

        let outcome = ingest_entries(store, &mut entries, limit, cancel, &stats, &pb);
        stats.add_malformed(entries.malformed());
        pb.finish_and_clear();

        match outcome {
            Ok(true) => {
                info!(
                    entries = stats.entries(),
                    malformed = stats.malformed(),
                    "index load complete"
                );
                Ok(stats)
            }
            Ok(false) => {
                info!(entries = stats.entries(), "index load cancelled");
                Ok(stats)
            }
            Err(e) => {
                let _ = store.rollback_batch();
                Err(e)
            }
        }
    }

    /// Stream the article dump into `articles`.
    ///
    /// Pages outside the main namespace or absent from the index set are
    /// discarded; content is truncated to [`MAX_CONTENT_BYTES`] on a UTF-8
    /// boundary. Commits every [`ARTICLE_BATCH_SIZE`] kept pages; stops
    /// after `limit` kept pages when `limit > 0`.
    pub fn process_articles(&self, limit: i64, cancel: Option<&AtomicBool>) -> Result<IngestStats> {
        let guard = self.ensure_open()?;
        let store = borrow_store(&guard)?;

        let ids = store.distinct_article_ids_from_index()?;
        info!(
            indexed = ids.len(),
            path = %self.articles_path.display(),
            "processing articles"
        );

        let mut pages = PageReader::new(decompress::open_bz2(&self.articles_path)?);
        let stats = IngestStats::new();
        let pb = ProgressBar::new_spinner();

        let outcome = ingest_pages(store, &mut pages, &ids, limit, cancel, &stats, &pb);
        pb.finish_and_clear();

        match outcome {
            Ok(true) => {
                info!(
                    kept = stats.pages_kept(),
                    seen = stats.pages_seen(),
                    skipped_namespace = stats.skipped_namespace(),
                    skipped_unindexed = stats.skipped_unindexed(),
                    "article processing complete"
                );
                Ok(stats)
            }
            Ok(false) => {
                info!(kept = stats.pages_kept(), "article processing cancelled");
                Ok(stats)
            }
            Err(e) => {
                let _ = store.rollback_batch();
                Err(e)
            }
        }
    }

    /// Title search: prefix-expanded full-text match when available, LIKE
    /// substring scan otherwise. A failing FTS query demotes the mode for
    /// the rest of the process and the search retries via LIKE.
    pub fn search_titles(&self, query: &str, limit: i64) -> Result<Vec<String>> {
        let mut guard = self.ensure_open()?;
        let store = borrow_store_mut(&mut guard)?;

        let limit = if limit <= 0 {
            DEFAULT_SEARCH_LIMIT
        } else {
            limit as usize
        };

        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        if store.fts_mode().is_enabled() {
            let expr = fts::match_query(query);
            match store.search_fts(&expr, limit) {
                Ok(titles) => return Ok(titles),
                Err(e) => {
                    warn!(error = %e, "FTS query failed, falling back to LIKE");
                    store.demote_fts();
                }
            }
        }

        store.search_like(query, limit)
    }

    /// Look an article up by title: exact match first, then a
    /// case-insensitive retry against the title-cased lowercase input.
    pub fn get_article(&self, title: &str) -> Result<Article> {
        let guard = self.ensure_open()?;
        let store = borrow_store(&guard)?;

        if let Some(article) = store.find_article_by_title_exact(title)? {
            return Ok(article);
        }

        let retry = title_case(&title.to_lowercase());
        if let Some(article) = store.find_article_by_title_ci(&retry)? {
            return Ok(article);
        }

        Err(Error::ArticleNotFound(title.to_string()))
    }

    pub fn get_article_by_id(&self, id: i64) -> Result<Article> {
        let guard = self.ensure_open()?;
        let store = borrow_store(&guard)?;
        store
            .find_article_by_id(id)?
            .ok_or(Error::IdNotFound(id))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Store>>> {
        self.store
            .lock()
            .map_err(|_| Error::Unavailable("store lock poisoned".to_string()))
    }

    fn ensure_open(&self) -> Result<MutexGuard<'_, Option<Store>>> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            *guard = Some(Store::open(&self.db_path)?);
        }
        Ok(guard)
    }
}

fn borrow_store<'a>(guard: &'a MutexGuard<'_, Option<Store>>) -> Result<&'a Store> {
    guard
        .as_ref()
        .ok_or_else(|| Error::Unavailable("store is not open".to_string()))
}

fn borrow_store_mut<'a>(guard: &'a mut MutexGuard<'_, Option<Store>>) -> Result<&'a mut Store> {
    guard
        .as_mut()
        .ok_or_else(|| Error::Unavailable("store is not open".to_string()))
}

fn is_cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
}

/// Returns Ok(false) when the run was cancelled. On Err the caller rolls
/// back whatever batch is still open.
fn ingest_entries<R: BufRead>(
    store: &Store,
    entries: &mut IndexReader<R>,
    limit: i64,
    cancel: Option<&AtomicBool>,
    stats: &IngestStats,
    pb: &ProgressBar,
) -> Result<bool> {
    store.begin_batch()?;
    let mut in_batch: u64 = 0;

    for entry in entries.by_ref() {
        store.insert_index_entry(entry)?;
        stats.inc_entries();
        in_batch += 1;

        if in_batch as usize >= INDEX_BATCH_SIZE {
            if is_cancelled(cancel) {
                store.rollback_batch()?;
                stats.entries_inserted.fetch_sub(in_batch, Ordering::Relaxed);
                return Ok(false);
            }
            store.commit_batch()?;
            info!(entries = stats.entries(), "index batch committed");
            pb.set_message(format!("{} index entries", stats.entries()));
            pb.tick();
            store.begin_batch()?;
            in_batch = 0;
        }

        if limit > 0 && stats.entries() >= limit as u64 {
            break;
        }
    }

    store.commit_batch()?;
    Ok(true)
}

fn ingest_pages<R: BufRead>(
    store: &Store,
    pages: &mut PageReader<R>,
    ids: &HashSet<i64>,
    limit: i64,
    cancel: Option<&AtomicBool>,
    stats: &IngestStats,
    pb: &ProgressBar,
) -> Result<bool> {
    store.begin_batch()?;
    let mut in_batch: u64 = 0;

    for page in pages.by_ref() {
        stats.inc_pages_seen();

        if page.ns != 0 {
            stats.inc_skipped_namespace();
            continue;
        }
        if !ids.contains(&page.id) {
            stats.inc_skipped_unindexed();
            continue;
        }

        store.upsert_article(&page_to_article(page))?;
        stats.inc_pages_kept();
        in_batch += 1;

        if in_batch as usize >= ARTICLE_BATCH_SIZE {
            if is_cancelled(cancel) {
                store.rollback_batch()?;
                stats.pages_kept.fetch_sub(in_batch, Ordering::Relaxed);
                return Ok(false);
            }
            store.commit_batch()?;
            info!(pages = stats.pages_kept(), "article batch committed");
            pb.set_message(format!("{} articles", stats.pages_kept()));
            pb.tick();
            store.begin_batch()?;
            in_batch = 0;
        }

        if limit > 0 && stats.pages_kept() >= limit as u64 {
            break;
        }
    }

    store.commit_batch()?;
    Ok(true)
}

fn page_to_article(page: Page) -> Article {
    Article {
        id: page.id,
        title: page.title,
        namespace: page.ns,
        content: truncate_utf8(page.text.unwrap_or_default(), MAX_CONTENT_BYTES),
        redirect: page.redirect.unwrap_or_default(),
    }
}

/// Truncate to at most `max` bytes without splitting a multi-byte
/// character.
fn truncate_utf8(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}

/// Word-initial capitalization in the American English style, applied to
/// the lowercased input before the case-insensitive retry.
fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut at_word_start = true;
    for ch in input.chars() {
        if ch.is_whitespace() {
            at_word_start = true;
            out.push(ch);
        } else if at_word_start {
            out.extend(ch.to_uppercase());
            at_word_start = false;
        } else {
            out.push(ch);
        }
    }
    out
}
