//! `CTR_DRBG`, fixed to AES-256: 32-byte key, 16-byte counter block. The
//! derivation function required by SP800-90A to coerce arbitrary-length
//! seed material down to the algorithm's 48-byte seedlen is, conveniently,
//! just SHA-384 — its digest is exactly 48 bytes, so no bit-counting df
//! construction is needed; the pre-filter is bypassed outright when the
//! input already is 48 bytes (the scenario in §8's known-answer test).

use std::sync::Arc;

use aes::Aes256;
use cipher::{BlockEncrypt, KeyInit};
use sha2::{Digest, Sha384};
use zeroize::Zeroize;

use crate::base::Common;
use crate::error::DrbgError;
use crate::material::InitialMaterial;
use crate::seed_source::SeedSource;
use crate::MAX_BYTES_PER_REQUEST;

const KEY_LEN: usize = 32;
const BLOCK_LEN: usize = 16;
const SEEDLEN: usize = KEY_LEN + BLOCK_LEN;

/// `CTR_DRBG` over AES-256.
pub struct CtrDrbg {
    common: Common,
    key: [u8; KEY_LEN],
    v: [u8; BLOCK_LEN],
}

impl CtrDrbg {
    /// Build a new, uninitialised `CTR_DRBG` drawing seed material lazily
    /// from `seed_source` on first use.
    pub fn new(seed_source: Arc<dyn SeedSource>, resistance: u32) -> Self {
        Self::with_material(
            seed_source,
            InitialMaterial::new(SEEDLEN, SEEDLEN),
            resistance,
        )
    }

    /// Build a `CTR_DRBG` with an explicit initial material specification.
    pub fn with_material(
        seed_source: Arc<dyn SeedSource>,
        material: InitialMaterial,
        resistance: u32,
    ) -> Self {
        Self {
            common: Common::new(seed_source, material, resistance, SEEDLEN),
            key: [0u8; KEY_LEN],
            v: [0u8; BLOCK_LEN],
        }
    }

    /// Coerce `material` to exactly [`SEEDLEN`] bytes: the identity if it
    /// already is, otherwise its SHA-384 digest.
    fn df(material: &[u8]) -> [u8; SEEDLEN] {
        if material.len() == SEEDLEN {
            let mut out = [0u8; SEEDLEN];
            out.copy_from_slice(material);
            return out;
        }
        let digest = Sha384::digest(material);
        let mut out = [0u8; SEEDLEN];
        out.copy_from_slice(&digest);
        out
    }

    fn encrypt_block(&self, block: &[u8; BLOCK_LEN]) -> [u8; BLOCK_LEN] {
        let cipher = Aes256::new_from_slice(&self.key).expect("AES-256 key is 32 bytes");
        let mut out = aes::Block::clone_from_slice(block);
        cipher.encrypt_block(&mut out);
        let mut result = [0u8; BLOCK_LEN];
        result.copy_from_slice(&out);
        result
    }

    fn increment_v(&mut self) {
        for byte in self.v.iter_mut().rev() {
            let (new, carry) = byte.overflowing_add(1);
            *byte = new;
            if !carry {
                break;
            }
        }
    }

    /// `CTR_DRBG_Update`: generate `SEEDLEN` bytes of AES-CTR keystream,
    /// XOR with `provided_data`, and split the result into the new `(Key,
    /// V)`.
    fn ctr_update(&mut self, provided_data: &[u8; SEEDLEN]) {
        let mut temp = [0u8; SEEDLEN];
        let mut produced = 0;
        while produced < SEEDLEN {
            self.increment_v();
            let block = self.encrypt_block(&self.v);
            let take = (SEEDLEN - produced).min(BLOCK_LEN);
            temp[produced..produced + take].copy_from_slice(&block[..take]);
            produced += take;
        }
        for i in 0..SEEDLEN {
            temp[i] ^= provided_data[i];
        }
        self.key.copy_from_slice(&temp[..KEY_LEN]);
        self.v.copy_from_slice(&temp[KEY_LEN..]);
    }

    fn initialise(&mut self, material: &[u8]) {
        self.key = [0u8; KEY_LEN];
        self.v = [0u8; BLOCK_LEN];
        let seed = Self::df(material);
        self.ctr_update(&seed);
    }

    fn impl_set_seed(&mut self, seed: &[u8]) {
        let seed = Self::df(seed);
        self.ctr_update(&seed);
    }

    fn impl_next_bytes(&mut self, out: &mut [u8]) {
        let mut produced = 0;
        while produced < out.len() {
            self.increment_v();
            let block = self.encrypt_block(&self.v);
            let take = (out.len() - produced).min(BLOCK_LEN);
            out[produced..produced + take].copy_from_slice(&block[..take]);
            produced += take;
            if take < BLOCK_LEN {
                self.common.store_spare(&block[take..]);
            }
        }
        // Unconditional update with an all-zero seed after generating,
        // for backtracking resistance.
        self.ctr_update(&[0u8; SEEDLEN]);
    }

    /// Fill `out` with the next pseudorandom bytes, lazily realising the
    /// pending initial material and reseeding once `resistance` operations
    /// have elapsed, per the shared `next_bytes` framework (§4.3).
    pub fn next_bytes(&mut self, out: &mut [u8]) -> Result<(), DrbgError> {
        if out.len() > MAX_BYTES_PER_REQUEST {
            return Err(DrbgError::RequestTooLarge {
                max: MAX_BYTES_PER_REQUEST,
            });
        }

        if let Some(material) = self.common.take_pending_material() {
            let realised = material.realise(self.common.seed_source.as_ref());
            self.initialise(&realised.material);
            self.common.personalization = Some(realised.personalization);
            self.common.record_reseed();
        }

        let filled = self.common.drain_spare(out);
        if filled == out.len() {
            return Ok(());
        }

        if self.common.needs_reseed() {
            let seed = self.common.seed_source.get_seed(self.common.seedlen);
            self.impl_set_seed(&seed);
            self.common.record_reseed();
        } else {
            self.common.record_operation();
        }

        self.impl_next_bytes(&mut out[filled..]);
        Ok(())
    }

    /// Explicitly reseed with caller-supplied additional input.
    pub fn set_seed(&mut self, extra: &[u8]) {
        self.impl_set_seed(extra);
        self.common.record_reseed();
    }

    /// Draw `n` bytes of new seed material from this DRBG's own output.
    pub fn new_seed(&mut self) -> Vec<u8> {
        let mut buf = vec![0u8; self.common.seedlen];
        self.next_bytes(&mut buf)
            .expect("seedlen is always within the per-call maximum");
        buf
    }
}

impl Drop for CtrDrbg {
    fn drop(&mut self) {
        self.key.zeroize();
        self.v.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_source::ZeroSource;

    fn fresh() -> CtrDrbg {
        let material = InitialMaterial::new(SEEDLEN, SEEDLEN)
            .with_entropy(vec![0u8; SEEDLEN])
            .with_nonce(vec![])
            .with_personalization(vec![]);
        CtrDrbg::with_material(Arc::new(ZeroSource), material, 10_000)
    }

    /// All-zero 48-byte seed, no reseed: matches the CTR_DRBG AES-256
    /// known-answer-test scenario from §8.
    #[test]
    fn all_zero_seed_is_deterministic() {
        let mut a = fresh();
        let mut b = fresh();
        let mut out_a = [0u8; 64];
        let mut out_b = [0u8; 64];
        a.next_bytes(&mut out_a).unwrap();
        b.next_bytes(&mut out_b).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn df_bypassed_for_exact_seedlen_input() {
        let material = [7u8; SEEDLEN];
        assert_eq!(CtrDrbg::df(&material), material);
    }

    #[test]
    fn df_hashes_when_length_differs() {
        let material = [7u8; SEEDLEN + 1];
        assert_ne!(CtrDrbg::df(&material)[..], material[..SEEDLEN]);
    }

    #[test]
    fn successive_calls_differ() {
        let mut drbg = fresh();
        let mut first = [0u8; 16];
        let mut second = [0u8; 16];
        drbg.next_bytes(&mut first).unwrap();
        drbg.next_bytes(&mut second).unwrap();
        assert_ne!(first, second);
    }
}
