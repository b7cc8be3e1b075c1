//! Operation counters for a cache server

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics snapshot for cache monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads that found an entry
    pub hits: u64,

    /// Reads that found nothing
    pub misses: u64,

    /// Successful writes (put, conditional put, replace)
    pub writes: u64,

    /// Conditional writes that lost because the key was present or had moved on
    pub rejected_writes: u64,

    /// Entries deleted by remove or pattern removal
    pub removals: u64,

    /// Number of entries currently stored
    pub entries: usize,

    /// Total size of stored keys and values in bytes
    pub size_bytes: usize,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Average entry size in bytes
    pub fn avg_entry_size(&self) -> usize {
        if self.entries == 0 {
            0
        } else {
            self.size_bytes / self.entries
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, writes: {}, removals: {}, entries: {}, size: {} bytes }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.writes,
            self.removals,
            self.entries,
            self.size_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };

        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(stats.miss_rate(), 20.0);
    }

    #[test]
    fn test_cache_stats_zero_requests() {
        let stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
        assert_eq!(stats.miss_rate(), 100.0);
        assert_eq!(stats.avg_entry_size(), 0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            hits: 100,
            misses: 50,
            writes: 75,
            rejected_writes: 2,
            removals: 3,
            entries: 72,
            size_bytes: 1440,
        };

        let display = format!("{}", stats);
        assert!(display.contains("hits: 100"));
        assert!(display.contains("misses: 50"));
        assert_eq!(stats.avg_entry_size(), 20);
    }
}
