//! ISAAC, a fast non-cryptographic generator used internally for pool-index
//! shuffling and to bootstrap the seed-storage scrambler before a real
//! CSPRNG is available. Never use this for anything that must resist a
//! predicting adversary.

use rand_core::{impls, RngCore};

const WORDS: usize = 256;

/// ISAAC-32, following Bob Jenkins' reference algorithm.
///
/// `mem` holds the internal state array, `rsl` the most recently generated
/// block of 256 results, and `cnt` the number of unconsumed results left in
/// `rsl`.
#[derive(Clone)]
pub struct IsaacRng {
    rsl: [u32; WORDS],
    mem: [u32; WORDS],
    a: u32,
    b: u32,
    c: u32,
    cnt: usize,
}

impl IsaacRng {
    /// Build a generator from a 256-word seed, running the full
    /// mix-and-generate warm-up twice as the reference implementation does.
    pub fn from_seed(seed: &[u32; WORDS]) -> Self {
        let mut rng = Self {
            rsl: *seed,
            mem: [0; WORDS],
            a: 0,
            b: 0,
            c: 0,
            cnt: 0,
        };
        rng.init(true);
        rng
    }

    /// Build a generator from an arbitrary byte slice, folding it into the
    /// 256-word seed array (big-endian, repeating if shorter than 1024
    /// bytes, truncating if longer).
    pub fn from_bytes(seed: &[u8]) -> Self {
        let mut words = [0u32; WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            let mut buf = [0u8; 4];
            for (j, b) in buf.iter_mut().enumerate() {
                let idx = (i * 4 + j) % seed.len().max(1);
                *b = seed.get(idx).copied().unwrap_or(0);
            }
            *word = u32::from_be_bytes(buf);
        }
        Self::from_seed(&words)
    }

    fn init(&mut self, use_seed: bool) {
        const GOLDEN: u32 = 0x9e37_79b9;
        let mut a = GOLDEN;
        let mut b = GOLDEN;
        let mut c = GOLDEN;
        let mut d = GOLDEN;
        let mut e = GOLDEN;
        let mut f = GOLDEN;
        let mut g = GOLDEN;
        let mut h = GOLDEN;

        macro_rules! mix {
            () => {{
                a ^= b << 11;
                d = d.wrapping_add(a);
                b = b.wrapping_add(c);
                b ^= c >> 2;
                e = e.wrapping_add(b);
                c = c.wrapping_add(d);
                c ^= d << 8;
                f = f.wrapping_add(c);
                d = d.wrapping_add(e);
                d ^= e >> 16;
                g = g.wrapping_add(d);
                e = e.wrapping_add(f);
                e ^= f << 10;
                h = h.wrapping_add(e);
                f = f.wrapping_add(g);
                f ^= g >> 4;
                a = a.wrapping_add(f);
                g = g.wrapping_add(h);
                g ^= h << 8;
                b = b.wrapping_add(g);
                h = h.wrapping_add(a);
                h ^= a >> 9;
                c = c.wrapping_add(h);
                a = a.wrapping_add(b);
            }};
        }

        for _ in 0..4 {
            mix!();
        }

        for i in (0..WORDS).step_by(8) {
            if use_seed {
                a = a.wrapping_add(self.rsl[i]);
                b = b.wrapping_add(self.rsl[i + 1]);
                c = c.wrapping_add(self.rsl[i + 2]);
                d = d.wrapping_add(self.rsl[i + 3]);
                e = e.wrapping_add(self.rsl[i + 4]);
                f = f.wrapping_add(self.rsl[i + 5]);
                g = g.wrapping_add(self.rsl[i + 6]);
                h = h.wrapping_add(self.rsl[i + 7]);
            }
            mix!();
            self.mem[i] = a;
            self.mem[i + 1] = b;
            self.mem[i + 2] = c;
            self.mem[i + 3] = d;
            self.mem[i + 4] = e;
            self.mem[i + 5] = f;
            self.mem[i + 6] = g;
            self.mem[i + 7] = h;
        }

        if use_seed {
            for i in (0..WORDS).step_by(8) {
                a = a.wrapping_add(self.mem[i]);
                b = b.wrapping_add(self.mem[i + 1]);
                c = c.wrapping_add(self.mem[i + 2]);
                d = d.wrapping_add(self.mem[i + 3]);
                e = e.wrapping_add(self.mem[i + 4]);
                f = f.wrapping_add(self.mem[i + 5]);
                g = g.wrapping_add(self.mem[i + 6]);
                h = h.wrapping_add(self.mem[i + 7]);
                mix!();
                self.mem[i] = a;
                self.mem[i + 1] = b;
                self.mem[i + 2] = c;
                self.mem[i + 3] = d;
                self.mem[i + 4] = e;
                self.mem[i + 5] = f;
                self.mem[i + 6] = g;
                self.mem[i + 7] = h;
            }
        }

        self.generate();
        self.cnt = WORDS;
    }

    /// Run one full ISAAC generation round, refilling `rsl` with 256 fresh
    /// words and advancing `a`, `b`, `c`.
    fn generate(&mut self) {
        self.c = self.c.wrapping_add(1);
        self.b = self.b.wrapping_add(self.c);

        for i in 0..WORDS {
            let x = self.mem[i];
            self.a = match i % 4 {
                0 => self.a ^ (self.a << 13),
                1 => self.a ^ (self.a >> 6),
                2 => self.a ^ (self.a << 2),
                _ => self.a ^ (self.a >> 16),
            };
            self.a = self.a.wrapping_add(self.mem[(i + 128) % WORDS]);
            let y = self
                .mem
                [(x >> 2) as usize % WORDS]
                .wrapping_add(self.a)
                .wrapping_add(self.b);
            self.mem[i] = y;
            self.b = self.mem[(y >> 10) as usize % WORDS].wrapping_add(x);
            self.rsl[i] = self.b;
        }
    }

    fn refill(&mut self) {
        self.generate();
        self.cnt = WORDS;
    }
}

impl RngCore for IsaacRng {
    fn next_u32(&mut self) -> u32 {
        if self.cnt == 0 {
            self.refill();
        }
        self.cnt -= 1;
        self.rsl[self.cnt]
    }

    fn next_u64(&mut self) -> u64 {
        impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_seed() {
        let seed = [0x42u32; WORDS];
        let mut a = IsaacRng::from_seed(&seed);
        let mut b = IsaacRng::from_seed(&seed);
        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        a.fill_bytes(&mut out_a);
        b.fill_bytes(&mut out_b);
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = IsaacRng::from_bytes(b"seed-a");
        let mut b = IsaacRng::from_bytes(b"seed-b");
        assert_ne!(a.next_u32(), b.next_u32());
    }

    #[test]
    fn refills_after_256_words() {
        let mut rng = IsaacRng::from_bytes(b"refill-test");
        for _ in 0..WORDS + 10 {
            rng.next_u32();
        }
    }
}
