//! `HMAC_DRBG`, generic over the underlying hash function `D` (SHA-1,
//! SHA-256, or SHA-512) via `Hmac<D>`. Unlike `Hash_DRBG` this algorithm
//! carries no separate constant `C`; all state lives in the `(K, V)` pair.

use std::marker::PhantomData;
use std::sync::Arc;

use digest::core_api::BlockSizeUser;
use digest::Digest;
use hmac::{Hmac, Mac};
use zeroize::Zeroize;

use crate::base::Common;
use crate::error::DrbgError;
use crate::material::InitialMaterial;
use crate::seed_source::SeedSource;
use crate::MAX_BYTES_PER_REQUEST;

/// `HMAC_DRBG` over hash function `D`.
pub struct HmacDrbg<D> {
    common: Common,
    k: Vec<u8>,
    v: Vec<u8>,
    outlen: usize,
    _digest: PhantomData<D>,
}

impl<D: Digest + Clone + BlockSizeUser> HmacDrbg<D> {
    fn seedlen_for_outlen(outlen: usize) -> usize {
        if outlen > 32 {
            111
        } else {
            55
        }
    }

    /// Build a new, uninitialised `HMAC_DRBG` drawing seed material lazily
    /// from `seed_source` on first use.
    pub fn new(seed_source: Arc<dyn SeedSource>, resistance: u32) -> Self {
        let outlen = <D as Digest>::output_size();
        let seedlen = Self::seedlen_for_outlen(outlen);
        Self::with_material(
            seed_source,
            InitialMaterial::new(seedlen, seedlen),
            resistance,
        )
    }

    /// Build an `HMAC_DRBG` with an explicit initial material specification.
    pub fn with_material(
        seed_source: Arc<dyn SeedSource>,
        material: InitialMaterial,
        resistance: u32,
    ) -> Self {
        let outlen = <D as Digest>::output_size();
        let seedlen = Self::seedlen_for_outlen(outlen);
        Self {
            common: Common::new(seed_source, material, resistance, seedlen),
            k: vec![0u8; outlen],
            v: vec![0x01; outlen],
            outlen,
            _digest: PhantomData,
        }
    }

    fn hmac(&self, key: &[u8], data: &[&[u8]]) -> Vec<u8> {
        let mut mac = <Hmac<D> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
        for chunk in data {
            Mac::update(&mut mac, chunk);
        }
        Mac::finalize(mac).into_bytes().to_vec()
    }

    /// `K := HMAC(K, V || 0x00 || extra)`; `V := HMAC(K, V)`; if `extra` is
    /// non-empty, repeat with `0x01` in place of `0x00`.
    fn update(&mut self, extra: &[u8]) {
        self.k = self.hmac(&self.k, &[&self.v, &[0x00], extra]);
        self.v = self.hmac(&self.k, &[&self.v]);
        if !extra.is_empty() {
            self.k = self.hmac(&self.k, &[&self.v, &[0x01], extra]);
            self.v = self.hmac(&self.k, &[&self.v]);
        }
    }

    fn initialise(&mut self, material: &[u8]) {
        self.k = vec![0u8; self.outlen];
        self.v = vec![0x01; self.outlen];
        self.update(material);
    }

    fn impl_set_seed(&mut self, seed: &[u8]) {
        self.update(seed);
    }

    fn impl_next_bytes(&mut self, out: &mut [u8]) {
        let mut produced = 0;
        while produced < out.len() {
            self.v = self.hmac(&self.k, &[&self.v]);
            let take = (out.len() - produced).min(self.outlen);
            out[produced..produced + take].copy_from_slice(&self.v[..take]);
            produced += take;
            if take < self.outlen {
                self.common.store_spare(&self.v[take..]);
            }
        }
        self.update(&[]);
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

impl<D> Drop for HmacDrbg<D> {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_source::ZeroSource;
    use sha2::Sha256;

    fn fresh() -> HmacDrbg<Sha256> {
        let material = InitialMaterial::new(55, 55)
            .with_entropy(vec![0x5A; 55])
            .with_nonce(vec![])
            .with_personalization(vec![]);
        HmacDrbg::with_material(Arc::new(ZeroSource), material, 10_000)
    }

    #[test]
    fn deterministic_given_identical_material() {
        let mut a = fresh();
        let mut b = fresh();
        let mut out_a = [0u8; 80];
        let mut out_b = [0u8; 80];
        a.next_bytes(&mut out_a).unwrap();
        b.next_bytes(&mut out_b).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn successive_calls_differ() {
        let mut drbg = fresh();
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        drbg.next_bytes(&mut first).unwrap();
        drbg.next_bytes(&mut second).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn spare_tail_is_reused_across_calls() {
        let mut drbg = fresh();
        // outlen is 32 for SHA-256; request 1 byte to force a 31-byte spare tail.
        let mut tiny = [0u8; 1];
        drbg.next_bytes(&mut tiny).unwrap();
        assert_eq!(drbg.common.spare.len(), 31);

        let mut rest = [0u8; 31];
        drbg.next_bytes(&mut rest).unwrap();
        assert!(drbg.common.spare.is_empty());
    }
}
