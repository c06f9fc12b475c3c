//! The system-PRNG multiplexer (§4.8): round-robin aggregation over one or
//! more platform CSPRNG instances, an injection queue that squash-merges
//! under pressure, and per-source asynchronous refill.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha512};

const REFILL_BLOCK: usize = 256;
const INJECTION_QUEUE_CAP: usize = 100;
const SQUASH_COUNT: usize = 5;

/// One platform CSPRNG backend: a 256-byte refill block plus bookkeeping
/// for whether it currently has unread bytes and whether it accepts seed
/// injections.
struct SystemSource {
    block: Mutex<[u8; REFILL_BLOCK]>,
    /// Index of the next unread byte in `block`; `-1` means "never
    /// refilled yet".
    available: AtomicI64,
    can_seed: std::sync::atomic::AtomicBool,
}

impl SystemSource {
    fn new() -> Self {
        Self {
            block: Mutex::new([0u8; REFILL_BLOCK]),
            available: AtomicI64::new(-1),
            can_seed: std::sync::atomic::AtomicBool::new(true),
        }
    }

    /// Draw 256 fresh bytes from the platform CSPRNG via `getrandom`.
    fn refill(&self) {
        let mut buf = [0u8; REFILL_BLOCK];
        if getrandom::getrandom(&mut buf).is_ok() {
            *self.block.lock().expect("system source lock poisoned") = buf;
            self.available.store(REFILL_BLOCK as i64, Ordering::Release);
        } else {
            self.can_seed.store(false, Ordering::Release);
        }
    }

    /// Take one byte from the bottom of the current block, refilling first
    /// if exhausted or never filled. Returns `None` only if the platform
    /// source refuses to produce bytes at all.
    fn take_one(&self) -> Option<u8> {
        if self.available.load(Ordering::Acquire) <= 0 {
            self.refill();
        }
        let remaining = self.available.load(Ordering::Acquire);
        if remaining <= 0 {
            return None;
        }
        let idx = (REFILL_BLOCK as i64 - remaining) as usize;
        let byte = self.block.lock().expect("system source lock poisoned")[idx];
        self.available.fetch_sub(1, Ordering::AcqRel);
        Some(byte)
    }
}

/// Aggregates every platform CSPRNG the process can reach into one source,
/// so any single backend's entropy benefits every output byte.
pub struct SystemPrng {
    sources: Vec<Arc<SystemSource>>,
    dispatch: AtomicUsize,
    injection_queue: Mutex<VecDeque<Vec<u8>>>,
}

impl SystemPrng {
    /// Build an aggregate over `n_sources` independent platform backends.
    /// On most platforms there is exactly one real backend (`getrandom`);
    /// more than one is useful when the host exposes several independent
    /// generators (e.g. a hardware RNG alongside the kernel CSPRNG), each
    /// wrapped separately by the caller's configuration.
    pub fn new(n_sources: usize) -> Self {
        let n_sources = n_sources.max(1);
        Self {
            sources: (0..n_sources).map(|_| Arc::new(SystemSource::new())).collect(),
            dispatch: AtomicUsize::new(0),
            injection_queue: Mutex::new(VecDeque::with_capacity(INJECTION_QUEUE_CAP)),
        }
    }

    /// Produce `n` pseudorandom bytes, round-robining over the available
    /// sources starting from a uniformly chosen index.
    pub fn get_seed(&self, n: usize) -> Vec<u8> {
        let mut start = [0u8; 1];
        let start_idx = if getrandom::getrandom(&mut start).is_ok() {
            start[0] as usize % self.sources.len()
        } else {
            self.dispatch.fetch_add(1, Ordering::Relaxed) % self.sources.len()
        };

        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let mut produced_byte = false;
            for offset in 0..self.sources.len() {
                let idx = (start_idx + offset) % self.sources.len();
                if let Some(byte) = self.sources[idx].take_one() {
                    out.push(byte);
                    produced_byte = true;
                    if out.len() == n {
                        break;
                    }
                }
            }
            if !produced_byte {
                // No source could produce a byte; fall back to the instant
                // entropy bootstrap pool for the remainder.
                out.push(crate::instant::InstantEntropy::global().next_byte());
            }
        }
        out
    }

    /// Enqueue externally observed entropy (e.g. from a cross-feed
    /// collector) to be applied by the next refill worker pass. If the
    /// queue is full, the oldest five entries are combined via SHA-512 and
    /// replaced with the digest, making room.
    pub fn inject_seed(&self, data: Vec<u8>) {
        let mut queue = self.injection_queue.lock().expect("injection queue poisoned");
        if queue.len() >= INJECTION_QUEUE_CAP {
            let mut hasher = Sha512::new();
            for _ in 0..SQUASH_COUNT {
                if let Some(entry) = queue.pop_front() {
                    hasher.update(&entry);
                }
            }
            queue.push_front(hasher.finalize().to_vec());
        }
        queue.push_back(data);
    }

    /// Drain and apply queued injections to sources still willing to
    /// accept seed material, called by each source's refill worker pass.
    pub fn apply_pending_injections(&self) {
        let mut queue = self.injection_queue.lock().expect("injection queue poisoned");
        let pending: Vec<Vec<u8>> = queue.drain(..).collect();
        drop(queue);

        for data in pending {
            for source in &self.sources {
                if source.can_seed.load(Ordering::Acquire) {
                    // Absorb by XOR-ing into the live block so an injected
                    // seed perturbs bytes not yet dispensed, rather than
                    // replacing a platform backend's own output outright.
                    let mut block = source.block.lock().expect("system source lock poisoned");
                    for (i, byte) in data.iter().enumerate() {
                        block[i % REFILL_BLOCK] ^= *byte;
                    }
                }
            }
        }
    }

    /// Refill every source that has run dry. Intended to be called
    /// periodically by a dedicated worker thread; kept as a plain method
    /// here rather than spawning its own thread so the caller controls the
    /// cadence and shutdown.
    pub fn refill_all(&self) {
        for source in &self.sources {
            if source.available.load(Ordering::Acquire) <= 0 {
                source.refill();
            }
        }
        self.apply_pending_injections();
    }

    /// Number of backing sources in this aggregate.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_seed_returns_requested_length() {
        let prng = SystemPrng::new(2);
        let seed = prng.get_seed(64);
        assert_eq!(seed.len(), 64);
    }

    #[test]
    fn injection_queue_squashes_when_full() {
        let prng = SystemPrng::new(1);
        for i in 0..(INJECTION_QUEUE_CAP + 1) {
            prng.inject_seed(vec![i as u8]);
        }
        let queue = prng.injection_queue.lock().unwrap();
        assert_eq!(queue.len(), INJECTION_QUEUE_CAP - SQUASH_COUNT + 1 + 1);
    }
}
