//! The storage facade: applies the scrambler and length checks around a
//! [`SeedStorage`] backend, queues deferred writes, and runs the
//! growing-interval flush scheduler with an exactly-once shutdown flush
//! (§4.10, §5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::backend::SeedStorage;
use crate::error::StorageError;
use crate::scrambler::Scrambler;
use crate::seed::Seed;

/// Initial flush interval.
pub const SAVE_PERIOD: Duration = Duration::from_secs(5);
/// Growth multiplier applied to the previous interval on every flush.
pub const SAVE_MULTIPLY: u32 = 2;
/// Constant growth added alongside the multiplier.
pub const SAVE_ADD: Duration = Duration::from_secs(5);
/// Ceiling on the flush interval.
pub const SAVE_MAX: Duration = Duration::from_secs(24 * 60 * 60);

struct Scheduler {
    interval: Mutex<Duration>,
    due: Mutex<Instant>,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            interval: Mutex::new(SAVE_PERIOD),
            due: Mutex::new(Instant::now() + SAVE_PERIOD),
        }
    }

    fn is_due(&self, now: Instant) -> bool {
        now >= *self.due.lock().expect("scheduler lock poisoned")
    }

    /// Grow the interval and schedule the next due time from `now`.
    fn advance(&self, now: Instant) {
        let mut interval = self.interval.lock().expect("scheduler lock poisoned");
        let grown = (*interval) * SAVE_MULTIPLY + SAVE_ADD;
        *interval = grown.min(SAVE_MAX);
        *self.due.lock().expect("scheduler lock poisoned") = now + *interval;
    }
}

/// Durable named-seed storage: a scrambled [`SeedStorage`] backend plus a
/// deferred-write queue and a single-writer flush scheduler.
pub struct Storage {
    backend: Box<dyn SeedStorage>,
    scrambler: Scrambler,
    queue: Mutex<VecDeque<Seed>>,
    scheduler: Scheduler,
    writer_lock: Mutex<()>,
    flushed_on_shutdown: AtomicBool,
}

impl Storage {
    /// Open storage over `backend`, scrambling values with `scrambler`.
    pub fn open(backend: Box<dyn SeedStorage>, scrambler: Scrambler) -> Arc<Self> {
        Arc::new(Self {
            backend,
            scrambler,
            queue: Mutex::new(VecDeque::new()),
            scheduler: Scheduler::new(),
            writer_lock: Mutex::new(()),
            flushed_on_shutdown: AtomicBool::new(false),
        })
    }

    /// Write `seed` immediately: `put_raw(name, scramble(data))`.
    pub fn put(&self, seed: Seed) -> Result<(), StorageError> {
        let data = seed.materialise();
        let scrambled = self.scrambler.scramble(&data);
        self.backend.put_raw(seed.name(), scrambled)
    }

    /// Read the seed stored under `name`, unscrambling it. Corrupt or
    /// missing entries are reported as `Ok(None)`.
    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        match self.backend.get_raw(name)? {
            Some(raw) => Ok(Some(self.scrambler.unscramble(&raw))),
            None => Ok(None),
        }
    }

    /// Queue `seed` for a deferred write from the caller's own thread; may
    /// trigger an immediate flush if the scheduled interval has elapsed.
    pub fn enqueue(&self, seed: Seed) {
        self.queue.lock().expect("queue lock poisoned").push_back(seed);
        if self.scheduler.is_due(Instant::now()) {
            if let Err(err) = self.flush() {
                warn!(error = %err, "scheduled flush failed");
            }
        }
    }

    /// Drain the queue and flush the backend. At most one flush runs at a
    /// time (`writer_lock`), matching the single-writer storage policy.
    pub fn flush(&self) -> Result<(), StorageError> {
        let _guard = self.writer_lock.lock().expect("writer lock poisoned");
        let pending: Vec<Seed> = {
            let mut queue = self.queue.lock().expect("queue lock poisoned");
            queue.drain(..).collect()
        };
        for seed in pending {
            self.put(seed)?;
        }
        self.backend.flush()?;
        self.scheduler.advance(Instant::now());
        debug!("storage flush complete");
        Ok(())
    }

    /// Flush exactly once, intended for the process shutdown hook. Safe to
    /// call more than once; only the first call does anything.
    pub fn shutdown(&self) {
        if self
            .flushed_on_shutdown
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            if let Err(err) = self.flush() {
                warn!(error = %err, "shutdown flush failed");
            }
        }
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::PreferenceBackend;

    #[test]
    fn enqueue_then_flush_persists_through_get() {
        let storage = Storage::open(Box::new(PreferenceBackend::new()), Scrambler::new(b"seed"));
        storage.enqueue(Seed::new("x", vec![1, 2, 3]));
        storage.flush().unwrap();
        // Unscrambling replays from a fresh scrambler seeded the same way.
        let raw = storage.backend.get_raw("x").unwrap().unwrap();
        let fresh = Scrambler::new(b"seed");
        assert_eq!(fresh.unscramble(&raw), vec![1, 2, 3]);
    }

    #[test]
    fn shutdown_flushes_exactly_once() {
        let storage = Storage::open(Box::new(PreferenceBackend::new()), Scrambler::new(b"seed"));
        storage.enqueue(Seed::new("x", vec![9]));
        storage.shutdown();
        storage.shutdown();
        assert!(storage.flushed_on_shutdown.load(Ordering::Acquire));
    }

    #[test]
    fn scheduler_interval_grows_after_each_flush() {
        let scheduler = Scheduler::new();
        let first = *scheduler.interval.lock().unwrap();
        scheduler.advance(Instant::now());
        let second = *scheduler.interval.lock().unwrap();
        assert!(second > first);
    }
}
