//! Lazy composition of a DRBG's initial material: entropy, nonce, and
//! personalization are not drawn until the DRBG's first real operation,
//! per §4.7.

use csprng_primitives::NonceFactory;
use zeroize::Zeroize;

use crate::seed_source::SeedSource;

/// A pending (not-yet-realised) initial-material specification.
///
/// `min_entropy` and `desired_entropy` are both set to the owning DRBG's
/// `seedlen`, matching the spec's "both equal DRBG seedlen" framing.
pub struct InitialMaterial {
    entropy: Option<Vec<u8>>,
    nonce: Option<Vec<u8>>,
    personalization: Option<Vec<u8>>,
    min_entropy: usize,
    desired_entropy: usize,
}

/// The result of realising an [`InitialMaterial`]: the combined seed
/// material (consumed exactly once by the DRBG's `initialise`) and the
/// personalization string, which is retained for the DRBG's lifetime so
/// that copies built from the same template can reuse it.
pub struct RealisedMaterial {
    /// `entropy || nonce || personalization`, to be fed to the DRBG's
    /// algorithm-specific initialisation routine and then dropped.
    pub material: Vec<u8>,
    /// Retained personalization bytes.
    pub personalization: Vec<u8>,
}

impl InitialMaterial {
    /// An empty material specification requiring `min_entropy` bytes and
    /// preferring `desired_entropy` bytes from the seed source.
    pub fn new(min_entropy: usize, desired_entropy: usize) -> Self {
        Self {
            entropy: None,
            nonce: None,
            personalization: None,
            min_entropy,
            desired_entropy,
        }
    }

    /// Supply explicit entropy (e.g. for KAT reproduction), overriding the
    /// seed source.
    pub fn with_entropy(mut self, entropy: Vec<u8>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Supply an explicit nonce, overriding the time-based default.
    pub fn with_nonce(mut self, nonce: Vec<u8>) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Supply explicit personalization bytes, overriding the process-unique
    /// default.
    pub fn with_personalization(mut self, personalization: Vec<u8>) -> Self {
        self.personalization = Some(personalization);
        self
    }

    /// Whether this material was built with any explicit field, which
    /// makes the owning DRBG non-cacheable in a template pool (§4.12): two
    /// instances built from it would otherwise share secrets.
    pub fn is_explicit(&self) -> bool {
        self.entropy.is_some() || self.nonce.is_some() || self.personalization.is_some()
    }

    /// Draw missing fields from `source`, concatenate them, and zero the
    /// transient entropy/nonce buffers before returning.
    pub fn realise(mut self, source: &dyn SeedSource) -> RealisedMaterial {
        let mut entropy = self
            .entropy
            .take()
            .unwrap_or_else(|| source.get_seed(self.desired_entropy));

        if entropy.len() < self.min_entropy {
            let shortfall = self.min_entropy - entropy.len();
            let mut padded = source.get_seed(shortfall);
            padded.extend_from_slice(&entropy);
            entropy.zeroize();
            entropy = padded;
        }

        let mut nonce = self
            .nonce
            .take()
            .unwrap_or_else(|| NonceFactory::create().to_vec());

        let personalization = self
            .personalization
            .take()
            .unwrap_or_else(NonceFactory::personalization);

        let mut material = Vec::with_capacity(entropy.len() + nonce.len() + personalization.len());
        material.extend_from_slice(&entropy);
        material.extend_from_slice(&nonce);
        material.extend_from_slice(&personalization);

        entropy.zeroize();
        nonce.zeroize();

        RealisedMaterial {
            material,
            personalization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed_source::ZeroSource;

    #[test]
    fn pads_short_entropy_from_source() {
        let m = InitialMaterial::new(55, 55).with_entropy(vec![0xAB; 10]);
        let realised = m.realise(&ZeroSource);
        // 10 explicit bytes + 45 drawn to reach min_entropy, plus nonce/personalization.
        assert!(realised.material.len() >= 55);
    }

    #[test]
    fn explicit_fields_are_not_overwritten() {
        let m = InitialMaterial::new(4, 4)
            .with_entropy(vec![1, 2, 3, 4])
            .with_nonce(vec![9, 9])
            .with_personalization(vec![7]);
        let realised = m.realise(&ZeroSource);
        assert_eq!(&realised.material[..4], &[1, 2, 3, 4]);
        assert_eq!(&realised.material[4..6], &[9, 9]);
        assert_eq!(&realised.material[6..], &[7]);
        assert_eq!(realised.personalization, vec![7]);
    }

    #[test]
    fn is_explicit_reflects_overrides() {
        assert!(!InitialMaterial::new(8, 8).is_explicit());
        assert!(InitialMaterial::new(8, 8).with_nonce(vec![1]).is_explicit());
    }
}
