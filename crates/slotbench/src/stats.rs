//! Workload statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters shared by all worker threads
#[derive(Debug, Default)]
pub struct BenchStats {
    hits: AtomicU64,
    misses: AtomicU64,
    torn: AtomicU64,
    puts: AtomicU64,
}

/// Point-in-time copy of [`BenchStats`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub torn: u64,
    pub puts: u64,
    pub hit_ratio: f64,
}

impl BenchStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read that found the expected value
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read that found nothing
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a read whose value did not belong to the key
    pub fn record_torn(&self) {
        self.torn.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a put
    pub fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn torn(&self) -> u64 {
        self.torn.load(Ordering::Relaxed)
    }

    pub fn puts(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    /// Hits over all reads (0.0 to 1.0); torn reads count as misses
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses() + self.torn();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            torn: self.torn(),
            puts: self.puts(),
            hit_ratio: self.hit_ratio(),
        }
    }
}
