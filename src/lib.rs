//! Wikilite: local search and retrieval over Wikipedia multistream dumps
//!
//! The crate turns the two artifacts of a Wikipedia multistream dump (the
//! bzip2-compressed XML corpus and its bzip2-compressed plain-text index)
//! into a locally queryable SQLite database:
//!
//! 1. **Index load** -- Stream the index file and persist `(seek, id)`
//!    pairs in batched transactions
//! 2. **Article load** -- Stream-decode the export XML, keep main-namespace
//!    pages referenced by the index, and upsert bounded article bodies
//! 3. **Serving** -- Rank title searches through a full-text index with a
//!    capability ladder (FTS5, then FTS4, then LIKE scans) and look
//!    articles up by title or id
//!
//! # Architecture
//!
//! The pipeline never holds the dump in memory:
//!
//! - **Streaming decompression** -- multistream-aware bzip2 readers
//! - **Event-based XML decoding** -- pages come out of a lazy iterator
//! - **Batched transactional writes** -- commit cadence bounds memory and
//!   keeps re-runs idempotent
//! - **Capability probing** -- the full-text generation is detected once at
//!   open and demoted at query time if the engine rejects a match query
//!
//! # Key Modules
//!
//! - [`decompress`] -- bzip2 readers over multistream files
//! - [`index`] -- line parser for the multistream index format
//! - [`parser`] -- streaming XML page decoder
//! - [`store`] -- SQLite persistence, schema, and search queries
//! - [`fts`] -- full-text capability probe and trigger installation
//! - [`wiki`] -- the owning handle: ingestion orchestration and lookups
//! - [`models`] -- core data types (Article, IndexEntry, Page)
//! - [`config`] -- tuning constants and environment settings
//! - [`stats`] -- ingestion counters
//! - [`error`] -- the crate error type

pub mod config;
pub mod decompress;
pub mod error;
pub mod fts;
pub mod index;
pub mod models;
pub mod parser;
pub mod stats;
pub mod store;
pub mod wiki;

pub use error::{Error, Result};
pub use models::{Article, IndexEntry, Page};
pub use wiki::Wiki;
