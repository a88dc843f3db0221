//! Decompression manager: validation, sync/queued split and result cache.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use super::cache::{CacheKey, DecodeCache};
use super::codec::{self, Decoded, MapDecoder, PayloadDecoder};
use super::pool::{Semaphore, WorkerPool, panic_message};
use crate::config::DecompressSection;
use crate::core::{DeviceId, FormatTag, PoolKey, PoolKind};
use crate::error::{Error, Result};

/// Snapshot of manager counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecompressStats {
    /// Payloads decoded on the caller's thread
    pub sync_decodes: u64,
    /// Payloads handed to a worker pool
    pub queued_decodes: u64,
    /// Requests answered from the cache
    pub cache_hits: u64,
    /// Calls into the decoder
    pub decoder_invocations: u64,
}

#[derive(Default)]
struct Counters {
    sync_decodes: AtomicU64,
    queued_decodes: AtomicU64,
    cache_hits: AtomicU64,
    decoder_invocations: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> DecompressStats {
        DecompressStats {
            sync_decodes: self.sync_decodes.load(Ordering::Relaxed),
            queued_decodes: self.queued_decodes.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            decoder_invocations: self.decoder_invocations.load(Ordering::Relaxed),
        }
    }
}

/// Turns compressed payloads into [`Decoded`] values.
///
/// Small payloads decode on the calling thread. Large ones go to the
/// device's worker pool, smallest first, with at most `max_concurrent`
/// decoding at once across all devices. Results of large payloads are
/// cached by topic, format and content hash.
pub struct DecompressionManager {
    config: DecompressSection,
    decoder: Arc<dyn PayloadDecoder>,
    cache: Mutex<DecodeCache>,
    semaphore: Arc<Semaphore>,
    pools: Mutex<HashMap<PoolKey, Arc<WorkerPool>>>,
    counters: Arc<Counters>,
}

impl DecompressionManager {
    /// Manager with the default inflate-and-parse decoder
    pub fn new(config: DecompressSection) -> Self {
        Self::with_decoder(config, Arc::new(MapDecoder))
    }

    /// Manager with a custom decoder
    pub fn with_decoder(config: DecompressSection, decoder: Arc<dyn PayloadDecoder>) -> Self {
        let cache = DecodeCache::new(
            config.cache_ttl(),
            config.cache_capacity,
            config.sweep_interval(),
        );
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            cache: Mutex::new(cache),
            pools: Mutex::new(HashMap::new()),
            counters: Arc::new(Counters::default()),
            decoder,
            config,
        }
    }

    /// Settings this manager was built with
    pub fn config(&self) -> &DecompressSection {
        &self.config
    }

    /// Validate, decode (or fetch from cache) one payload.
    pub fn decompress(
        &self,
        topic: &str,
        payload: &[u8],
        format: FormatTag,
    ) -> Result<Arc<Decoded>> {
        codec::validate_header(payload, format)?;

        let cache_key =
            (payload.len() > self.config.cache_min_size).then(|| CacheKey::new(topic, format, payload));
        if let Some(key) = &cache_key {
            let now = Instant::now();
            let mut cache = self.cache.lock();
            cache.sweep(now);
            if let Some(hit) = cache.get(key, now) {
                self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Decode cache hit for {topic}");
                return Ok(hit);
            }
        }

        let threshold = if format.is_binary() {
            self.config.binary_sync_threshold
        } else {
            self.config.json_sync_threshold
        };

        let decoded = if payload.len() < threshold {
            self.counters.sync_decodes.fetch_add(1, Ordering::Relaxed);
            self.counters
                .decoder_invocations
                .fetch_add(1, Ordering::Relaxed);
            guarded_decode(self.decoder.as_ref(), payload, format)?
        } else {
            self.counters.queued_decodes.fetch_add(1, Ordering::Relaxed);
            self.decode_queued(topic, payload, format)?
        };
        log::debug!("Decoded {} byte {format} payload from {topic}", payload.len());

        let decoded = Arc::new(decoded);
        if let Some(key) = cache_key {
            self.cache
                .lock()
                .insert(key, Arc::clone(&decoded), Instant::now());
        }
        Ok(decoded)
    }

    fn decode_queued(&self, topic: &str, payload: &[u8], format: FormatTag) -> Result<Decoded> {
        let pool = self.pool(DeviceId::from_topic(topic))?;
        let (tx, rx) = crossbeam_channel::bounded(1);

        let decoder = Arc::clone(&self.decoder);
        let semaphore = Arc::clone(&self.semaphore);
        let counters = Arc::clone(&self.counters);
        let bytes = payload.to_vec();
        pool.submit(
            payload.len(),
            Box::new(move || {
                let _permit = semaphore.acquire();
                counters.decoder_invocations.fetch_add(1, Ordering::Relaxed);
                let _ = tx.send(guarded_decode(decoder.as_ref(), &bytes, format));
            }),
        )?;

        // Sender dropped without a result means the job never ran.
        rx.recv().map_err(|_| Error::PoolClosed)?
    }

    fn pool(&self, device: DeviceId) -> Result<Arc<WorkerPool>> {
        let key = PoolKey::new(device, PoolKind::Decompression);
        let mut pools = self.pools.lock();
        if let Some(pool) = pools.get(&key) {
            return Ok(Arc::clone(pool));
        }
        let pool = Arc::new(WorkerPool::new(
            key.clone(),
            self.config.worker_count(),
            self.config.queue_capacity,
        )?);
        pools.insert(key, Arc::clone(&pool));
        Ok(pool)
    }

    /// Counter snapshot
    pub fn stats(&self) -> DecompressStats {
        self.counters.snapshot()
    }

    /// Cached results currently held
    pub fn cache_len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Drop every cached result
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of live worker pools
    pub fn pool_count(&self) -> usize {
        self.pools.lock().len()
    }

    /// Shut down and forget the pool of one device.
    pub fn remove_device(&self, device: &DeviceId) {
        let key = PoolKey::new(device.clone(), PoolKind::Decompression);
        let pool = self.pools.lock().remove(&key);
        if let Some(pool) = pool {
            pool.shutdown();
        }
    }

    /// Shut down every pool and clear the cache.
    pub fn shutdown(&self) {
        let pools: Vec<_> = self.pools.lock().drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.shutdown();
        }
        self.clear_cache();
    }
}

/// Run the decoder, turning a panic into a decode error for this payload.
fn guarded_decode(
    decoder: &dyn PayloadDecoder,
    payload: &[u8],
    format: FormatTag,
) -> Result<Decoded> {
    panic::catch_unwind(AssertUnwindSafe(|| decoder.decode(payload, format))).unwrap_or_else(|cause| {
        let reason = panic_message(cause.as_ref());
        log::warn!("{format} decoder panicked: {reason}");
        Err(Error::Decode(format!("decoder panicked: {reason}")))
    })
}

impl Drop for DecompressionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
