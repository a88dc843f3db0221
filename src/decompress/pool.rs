//! Bounded priority worker pool and counting semaphore.
//!
//! Each pool owns a fixed set of named threads pulling jobs from a shared
//! binary heap. Smaller payloads run first; equal sizes run in submission
//! order. Submitters block while the queue is full.

use std::any::Any;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use crate::core::PoolKey;
use crate::error::{Error, Result};

/// Unit of work executed by a pool thread.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

struct Task {
    size: usize,
    seq: u64,
    job: Job,
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.seq == other.seq
    }
}

impl Eq for Task {}

impl Ord for Task {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (size, seq)
        other
            .size
            .cmp(&self.size)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Task {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Queue {
    heap: BinaryHeap<Task>,
    next_seq: u64,
    closed: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

/// Worker pool for one `(device, kind)` key.
pub struct WorkerPool {
    key: PoolKey,
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Spawn `workers` named threads sharing a queue of `capacity` tasks.
    pub fn new(key: PoolKey, workers: usize, capacity: usize) -> Result<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                heap: BinaryHeap::new(),
                next_seq: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: capacity.max(1),
        });

        let pool = Self {
            key,
            shared,
            workers: Mutex::new(Vec::new()),
        };
        for index in 0..workers.max(1) {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(pool.key.thread_name(index))
                .spawn(move || run_worker(&shared));
            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(e) => {
                    pool.shutdown();
                    return Err(e.into());
                }
            }
        }
        log::info!(
            "Started {} pool for {} with {} workers",
            pool.key.kind,
            pool.key.device,
            workers.max(1)
        );
        Ok(pool)
    }

    /// Device and kind this pool serves
    pub fn key(&self) -> &PoolKey {
        &self.key
    }

    /// Queue a job. Blocks while the queue is full.
    pub fn submit(&self, size: usize, job: Job) -> Result<()> {
        let mut queue = self.shared.queue.lock();
        while !queue.closed && queue.heap.len() >= self.shared.capacity {
            self.shared.not_full.wait(&mut queue);
        }
        if queue.closed {
            return Err(Error::PoolClosed);
        }
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.heap.push(Task { size, seq, job });
        drop(queue);
        self.shared.not_empty.notify_one();
        Ok(())
    }

    /// Tasks waiting for a worker
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().heap.len()
    }

    /// True once shutdown has begun
    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }

    /// Stop accepting jobs, let workers drain the queue, join them.
    pub fn shutdown(&self) {
        {
            let mut queue = self.shared.queue.lock();
            if queue.closed {
                return;
            }
            queue.closed = true;
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                log::warn!("Worker of {} pool for {} panicked", self.key.kind, self.key.device);
            }
        }
        log::info!("Stopped {} pool for {}", self.key.kind, self.key.device);
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: &Shared) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.heap.pop() {
                    break task;
                }
                if queue.closed {
                    return;
                }
                shared.not_empty.wait(&mut queue);
            }
        };
        shared.not_full.notify_one();
        if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(task.job)) {
            let name = thread::current().name().unwrap_or("worker").to_string();
            log::error!("Job on {name} panicked: {}", panic_message(cause.as_ref()));
        }
    }
}

/// Text of a panic payload, when it carries one.
pub(crate) fn panic_message(cause: &(dyn Any + Send)) -> &str {
    cause
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| cause.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown cause")
}

/// Counting semaphore limiting concurrent decodes.
pub struct Semaphore {
    permits: Mutex<usize>,
    released: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits.max(1)),
            released: Condvar::new(),
        }
    }

    /// Block until a permit is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.released.wait(&mut permits);
        }
        *permits -= 1;
        Permit { semaphore: self }
    }

    /// Permits currently free
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

/// Held permit; released on drop.
pub struct Permit<'a> {
    semaphore: &'a Semaphore,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        *self.semaphore.permits.lock() += 1;
        self.semaphore.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeviceId, PoolKind};
    use crossbeam_channel::{bounded, unbounded};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::time::Duration;

    fn key() -> PoolKey {
        PoolKey::new(DeviceId::new("valetudo/test"), PoolKind::Decompression)
    }

    #[test]
    fn test_task_order_smallest_first() {
        let mut heap = BinaryHeap::new();
        for (seq, size) in [(0, 500), (1, 100), (2, 300), (3, 100)] {
            heap.push(Task {
                size,
                seq,
                job: Box::new(|| {}),
            });
        }
        let order: Vec<_> = std::iter::from_fn(|| heap.pop().map(|t| (t.size, t.seq))).collect();
        assert_eq!(order, vec![(100, 1), (100, 3), (300, 2), (500, 0)]);
    }

    #[test]
    fn test_jobs_run_on_named_threads() {
        let pool = WorkerPool::new(key(), 2, 8).unwrap();
        let (tx, rx) = bounded(1);
        pool.submit(
            10,
            Box::new(move || {
                let name = thread::current().name().map(str::to_string);
                tx.send(name).unwrap();
            }),
        )
        .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("valetudo_test-decompression-"));
    }

    #[test]
    fn test_priority_when_single_worker_busy() {
        let pool = WorkerPool::new(key(), 1, 8).unwrap();
        let (gate_tx, gate_rx) = bounded::<()>(0);
        let (out_tx, out_rx) = unbounded();

        // Occupy the only worker
        pool.submit(0, Box::new(move || gate_rx.recv().unwrap()))
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));

        for size in [300usize, 100, 200] {
            let tx = out_tx.clone();
            pool.submit(size, Box::new(move || tx.send(size).unwrap()))
                .unwrap();
        }
        gate_tx.send(()).unwrap();

        let got: Vec<_> = (0..3)
            .map(|_| out_rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        assert_eq!(got, vec![100, 200, 300]);
    }

    #[test]
    fn test_worker_survives_panicking_job() {
        let pool = WorkerPool::new(key(), 1, 8).unwrap();
        pool.submit(0, Box::new(|| panic!("bad frame"))).unwrap();

        let (tx, rx) = bounded(1);
        pool.submit(1, Box::new(move || tx.send(7).unwrap())).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
        assert!(!pool.is_closed());
    }

    #[test]
    fn test_submit_blocks_when_full() {
        let pool = Arc::new(WorkerPool::new(key(), 1, 1).unwrap());
        let (gate_tx, gate_rx) = bounded::<()>(0);
        pool.submit(0, Box::new(move || gate_rx.recv().unwrap()))
            .unwrap();
        std::thread::sleep(Duration::from_millis(50));

        // Fills the queue
        pool.submit(1, Box::new(|| {})).unwrap();
        assert_eq!(pool.pending(), 1);

        let submitted = Arc::new(AtomicUsize::new(0));
        let blocked = {
            let pool = Arc::clone(&pool);
            let submitted = Arc::clone(&submitted);
            thread::spawn(move || {
                pool.submit(2, Box::new(|| {})).unwrap();
                submitted.store(1, AtomicOrdering::SeqCst);
            })
        };
        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(submitted.load(AtomicOrdering::SeqCst), 0);

        gate_tx.send(()).unwrap();
        blocked.join().unwrap();
        assert_eq!(submitted.load(AtomicOrdering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_drains_then_rejects() {
        let pool = WorkerPool::new(key(), 2, 16).unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        for i in 0..8 {
            let done = Arc::clone(&done);
            pool.submit(i, Box::new(move || {
                done.fetch_add(1, AtomicOrdering::SeqCst);
            }))
            .unwrap();
        }
        pool.shutdown();
        assert_eq!(done.load(AtomicOrdering::SeqCst), 8);
        assert!(pool.is_closed());
        assert!(matches!(pool.submit(1, Box::new(|| {})), Err(Error::PoolClosed)));
    }

    #[test]
    fn test_semaphore_limits_permits() {
        let sem = Semaphore::new(2);
        let a = sem.acquire();
        let _b = sem.acquire();
        assert_eq!(sem.available(), 0);
        drop(a);
        assert_eq!(sem.available(), 1);
    }
}
