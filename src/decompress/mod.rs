//! Payload decompression: header validation, sync/queued decode, caching.
//!
//! ```text
//! payload ─► validate_header ─► cache hit? ──yes──► Arc<Decoded>
//!                                   │ no
//!                     size < threshold?
//!                  yes │            │ no
//!              caller thread    device pool (smallest first, semaphore)
//!                      └────► decoder ◄────┘
//! ```

mod cache;
mod codec;
mod manager;
mod pool;

pub use cache::{CacheKey, DecodeCache};
pub use codec::{Decoded, GZIP_MAGIC, MapDecoder, PayloadDecoder, ZLIB_CMF, inflate, validate_header};
pub use manager::{DecompressStats, DecompressionManager};
pub use pool::{Job, Permit, Semaphore, WorkerPool};
