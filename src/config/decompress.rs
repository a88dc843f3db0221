//! Decompression manager section.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Decompression thresholds, cache and worker pool sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecompressSection {
    /// JSON payloads below this size (bytes) decode on the caller's thread
    #[serde(default = "defaults::json_sync_threshold")]
    pub json_sync_threshold: usize,

    /// Binary payloads below this size (bytes) decode on the caller's thread
    #[serde(default = "defaults::binary_sync_threshold")]
    pub binary_sync_threshold: usize,

    /// Only payloads above this size (bytes) are cached
    #[serde(default = "defaults::cache_min_size")]
    pub cache_min_size: usize,

    /// Cache entry lifetime (seconds)
    #[serde(default = "defaults::cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum cache entries before LRU eviction
    #[serde(default = "defaults::cache_capacity")]
    pub cache_capacity: usize,

    /// Minimum time between expiry sweeps (seconds)
    #[serde(default = "defaults::sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Workers per device pool (default: available CPUs clamped to 2..=8)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Queued tasks allowed to decode at the same time
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,

    /// Pending tasks per pool before submitters block
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
}

impl DecompressSection {
    /// Worker count, resolved against the host CPU count
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(n) => n.max(1),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2)
                .clamp(2, 8),
        }
    }

    /// Cache entry lifetime
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Minimum time between expiry sweeps
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for DecompressSection {
    fn default() -> Self {
        Self {
            json_sync_threshold: defaults::json_sync_threshold(),
            binary_sync_threshold: defaults::binary_sync_threshold(),
            cache_min_size: defaults::cache_min_size(),
            cache_ttl_secs: defaults::cache_ttl_secs(),
            cache_capacity: defaults::cache_capacity(),
            sweep_interval_secs: defaults::sweep_interval_secs(),
            workers: None,
            max_concurrent: defaults::max_concurrent(),
            queue_capacity: defaults::queue_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_count_bounds() {
        let section = DecompressSection::default();
        let n = section.worker_count();
        assert!((2..=8).contains(&n));

        let section = DecompressSection {
            workers: Some(0),
            ..Default::default()
        };
        assert_eq!(section.worker_count(), 1);
    }
}
