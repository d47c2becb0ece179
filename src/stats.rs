use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected during ingestion. Returned by both ingestion
/// operations; also used for batch-boundary diagnostics.
#[derive(Default, Debug)]
pub struct IngestStats {
    pub entries_inserted: AtomicU64,
    pub pages_seen: AtomicU64,
    pub pages_kept: AtomicU64,
    pub skipped_namespace: AtomicU64,
    pub skipped_unindexed: AtomicU64,
    pub malformed_records: AtomicU64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_entries(&self) {
        self.entries_inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pages_seen(&self) {
        self.pages_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pages_kept(&self) {
        self.pages_kept.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_namespace(&self) {
        self.skipped_namespace.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_skipped_unindexed(&self) {
        self.skipped_unindexed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_malformed(&self, count: u64) {
        self.malformed_records.fetch_add(count, Ordering::Relaxed);
    }

    pub fn entries(&self) -> u64 {
        self.entries_inserted.load(Ordering::Relaxed)
    }

    pub fn pages_seen(&self) -> u64 {
        self.pages_seen.load(Ordering::Relaxed)
    }

    pub fn pages_kept(&self) -> u64 {
        self.pages_kept.load(Ordering::Relaxed)
    }

    pub fn skipped_namespace(&self) -> u64 {
        self.skipped_namespace.load(Ordering::Relaxed)
    }

    pub fn skipped_unindexed(&self) -> u64 {
        self.skipped_unindexed.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed_records.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = IngestStats::new();
        assert_eq!(stats.entries(), 0);
        assert_eq!(stats.pages_seen(), 0);
        assert_eq!(stats.pages_kept(), 0);
        assert_eq!(stats.skipped_namespace(), 0);
        assert_eq!(stats.skipped_unindexed(), 0);
        assert_eq!(stats.malformed(), 0);
    }

    #[test]
    fn counters_accumulate() {
        let stats = IngestStats::new();
        stats.inc_entries();
        stats.inc_entries();
        stats.inc_pages_seen();
        stats.inc_pages_kept();
        stats.inc_skipped_namespace();
        stats.inc_skipped_unindexed();
        stats.add_malformed(3);

        assert_eq!(stats.entries(), 2);
        assert_eq!(stats.pages_seen(), 1);
        assert_eq!(stats.pages_kept(), 1);
        assert_eq!(stats.skipped_namespace(), 1);
        assert_eq!(stats.skipped_unindexed(), 1);
        assert_eq!(stats.malformed(), 3);
    }
}
