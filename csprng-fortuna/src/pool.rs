//! A single Fortuna pool: two parallel SHA-256 digest chains (`d` for
//! output, `s` for the persisted seed fingerprint) plus a byte counter
//! tracking how much entropy has been injected since the last [`fetch`](
//! Pool::fetch).

use sha2::{Digest, Sha256};

/// `d` is seeded with this distinguishing prefix byte at pool creation.
const D_PREFIX: u8 = 0x6A;
/// `s` is seeded with the complementary prefix byte at pool creation.
const S_PREFIX: u8 = 0x95;
/// A pool is considered to "have entropy" once this many bytes have been
/// injected since the last `fetch`.
const MIN_ENTROPY_BYTES: u64 = 55;

/// One of the 32 Fortuna pools.
pub struct Pool {
    d: Sha256,
    s: Sha256,
    count: u64,
}

impl Pool {
    /// A freshly created, empty pool.
    pub fn new() -> Self {
        let mut d = Sha256::new();
        d.update([D_PREFIX]);
        let mut s = Sha256::new();
        s.update([S_PREFIX]);
        Self { d, s, count: 0 }
    }

    /// Mix `data` into both digest chains and advance the byte counter.
    pub fn inject(&mut self, data: &[u8]) {
        self.d.update(data);
        self.s.update(data);
        self.count += data.len() as u64;
    }

    /// Whether at least [`MIN_ENTROPY_BYTES`] have been injected since the
    /// last `fetch`.
    pub fn has_entropy(&self) -> bool {
        self.count >= MIN_ENTROPY_BYTES
    }

    /// Total bytes injected since the last `fetch` (exposed for the
    /// placeholder formula and for diagnostics).
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Produce 32 pseudorandom bytes for the reseed schedule.
    ///
    /// When the pool does not yet have entropy this returns a deterministic,
    /// non-secret placeholder (`(count ^ (i*59)) & 0xFF` for `i` in `0..32`)
    /// rather than failing — Fortuna never fails. Implementers must
    /// preserve this formula exactly to match cross-implementation test
    /// vectors.
    pub fn fetch(&mut self) -> [u8; 32] {
        if !self.has_entropy() {
            let mut placeholder = [0u8; 32];
            for (i, b) in placeholder.iter_mut().enumerate() {
                *b = ((self.count ^ (i as u64 * 59)) & 0xFF) as u8;
            }
            return placeholder;
        }

        let h: [u8; 32] = self.d.finalize_reset().into();
        // Restart the running digest by feeding the just-produced output
        // back into a fresh chain (no prefix byte on restart, unlike the
        // one-time creation priming).
        self.d = Sha256::new();
        self.d.update(h);
        self.count = 0;
        h
    }

    /// Produce a 64-byte persisted fingerprint (`d.finalize() || s.finalize()`)
    /// without disturbing `count`, then re-prime both digests with their
    /// distinguishing prefix byte followed by the fingerprint so that a
    /// restarted process can inject the same fingerprint back in.
    pub fn seed(&mut self) -> [u8; 64] {
        let d_out: [u8; 32] = self.d.clone().finalize();
        let s_out: [u8; 32] = self.s.clone().finalize();

        let mut fingerprint = [0u8; 64];
        fingerprint[..32].copy_from_slice(&d_out);
        fingerprint[32..].copy_from_slice(&s_out);

        let mut d = Sha256::new();
        d.update([D_PREFIX]);
        d.update(fingerprint);
        self.d = d;

        let mut s = Sha256::new();
        s.update([S_PREFIX]);
        s.update(fingerprint);
        self.s = s;

        fingerprint
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_deterministic_below_threshold() {
        let mut pool = Pool::new();
        pool.inject(&[0xAB; 10]);
        let v = pool.fetch();
        for (i, b) in v.iter().enumerate() {
            assert_eq!(*b, ((10u64 ^ (i as u64 * 59)) & 0xFF) as u8);
        }
    }

    #[test]
    fn fetch_resets_count_and_changes_output() {
        let mut pool = Pool::new();
        pool.inject(&[0x42; 64]);
        assert!(pool.has_entropy());
        let first = pool.fetch();
        assert_eq!(pool.count(), 0);
        assert!(!pool.has_entropy());

        pool.inject(&[0x42; 64]);
        let second = pool.fetch();
        assert_ne!(first, second, "chained digest must advance");
    }

    #[test]
    fn seed_leaves_count_unchanged() {
        let mut pool = Pool::new();
        pool.inject(&[1, 2, 3]);
        let before = pool.count();
        let fingerprint = pool.seed();
        assert_eq!(pool.count(), before);
        assert_eq!(fingerprint.len(), 64);
    }
}
