use std::io::BufRead;

use tracing::{debug, warn};

use crate::config::MAX_INDEX_LINE_BYTES;
use crate::models::IndexEntry;

/// Lazy parser over the multistream index file.
///
/// Each line has the form `<seek>:<article_id>:<title>`. The title can
/// itself contain colons, so only the first two delimiters are split on.
/// Malformed lines are counted and skipped, never fatal.
pub struct IndexReader<R> {
    reader: R,
    line: String,
    malformed: u64,
}

impl<R: BufRead> IndexReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            malformed: 0,
        }
    }

    /// Number of lines skipped so far because they failed to parse.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

impl<R: BufRead> Iterator for IndexReader<R> {
    type Item = IndexEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "index read failed, stopping");
                    return None;
                }
            }

            if self.line.len() > MAX_INDEX_LINE_BYTES {
                warn!(bytes = self.line.len(), "index line too long, skipping");
                self.malformed += 1;
                continue;
            }

            let trimmed = self.line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }

            match parse_line(trimmed) {
                Some(entry) => return Some(entry),
                None => {
                    debug!(line = trimmed, "malformed index line, skipping");
                    self.malformed += 1;
                }
            }
        }
    }
}

fn parse_line(line: &str) -> Option<IndexEntry> {
    let mut parts = line.splitn(3, ':');
    let seek = parts.next()?.parse::<i64>().ok()?;
    let article_id = parts.next()?.parse::<i64>().ok()?;
    // A line without a title field has fewer than two delimiters.
    parts.next()?;
    Some(IndexEntry { seek, article_id })
}
