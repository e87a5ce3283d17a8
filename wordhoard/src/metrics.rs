use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks ingestion progress across the walker, producers and workers
#[derive(Debug, Clone)]
pub struct BuildMetrics {
    // Walker metrics
    files_discovered: Arc<AtomicU64>,
    traversal_errors: Arc<AtomicU64>,

    // Line source metrics
    files_read: Arc<AtomicU64>,
    files_skipped: Arc<AtomicU64>,
    lines_read: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
}

impl BuildMetrics {
    /// Creates a new BuildMetrics instance
    pub fn new() -> Self {
        Self {
            files_discovered: Arc::new(AtomicU64::new(0)),
            traversal_errors: Arc::new(AtomicU64::new(0)),
            files_read: Arc::new(AtomicU64::new(0)),
            files_skipped: Arc::new(AtomicU64::new(0)),
            lines_read: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a file emitted by the walker
    pub fn record_discovery(&self) {
        self.files_discovered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a directory entry the walker could not visit
    pub fn record_traversal_error(&self) {
        self.traversal_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a file that was streamed to the end
    pub fn record_file_read(&self, lines: u64, bytes: u64) {
        self.files_read.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!(
            "File read: {} lines, {} bytes, total read: {} bytes",
            lines, bytes, total
        );
    }

    /// Records a file that could not be opened or was abandoned part way
    pub fn record_file_skipped(&self, bytes: u64) {
        self.files_skipped.fetch_add(1, Ordering::Relaxed);
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a line handed to the worker pool
    pub fn record_line(&self) {
        self.lines_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets current statistics
    pub fn get_stats(&self) -> BuildStats {
        BuildStats {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            traversal_errors: self.traversal_errors.load(Ordering::Relaxed),
            files_read: self.files_read.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            lines_read: self.lines_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
        }
    }

    /// Logs current statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Ingestion stats:\n\
             Files discovered/read/skipped: {}/{}/{}\n\
             Traversal errors: {}\n\
             Lines read: {}\n\
             Bytes read: {}",
            stats.files_discovered,
            stats.files_read,
            stats.files_skipped,
            stats.traversal_errors,
            stats.lines_read,
            stats.bytes_read
        );
    }
}

impl Default for BuildMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the build counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub files_discovered: u64,
    pub traversal_errors: u64,
    pub files_read: u64,
    pub files_skipped: u64,
    pub lines_read: u64,
    pub bytes_read: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_file_tracking() {
        let metrics = BuildMetrics::new();

        metrics.record_discovery();
        metrics.record_discovery();
        metrics.record_discovery();
        metrics.record_file_read(10, 400);
        metrics.record_file_read(2, 100);
        metrics.record_file_skipped(0);

        let stats = metrics.get_stats();
        assert_eq!(stats.files_discovered, 3);
        assert_eq!(stats.files_read, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.bytes_read, 500);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = BuildMetrics::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_line();
                    }
                    metrics.record_traversal_error();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = metrics.get_stats();
        assert_eq!(stats.lines_read, 8000);
        assert_eq!(stats.traversal_errors, 8);
    }
}
