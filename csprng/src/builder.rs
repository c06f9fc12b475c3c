//! The algorithm-name parser and generator builder (§4.12).

use std::collections::HashSet;
use std::sync::Arc;

use base64ct::{Base64Url, Encoding};
use csprng_collectors::SystemPrng;
use csprng_drbg::{CtrDrbg, FortunaSeedSource, HashDrbg, HmacDrbg, InitialMaterial, PermuteSource, SeedSource, ZeroSource};
use csprng_fortuna::Fortuna;
use sha1::Sha1;
use sha2::{Sha256, Sha512};

use crate::error::BuilderError;
use crate::spi::Drbg;

/// Default resistance (laziness) when an algorithm string does not set
/// `lazy=`/`laziness=`. NIST SP800-90A does not mandate a value; ten
/// operations between forced reseeds is this workspace's choice,
/// documented as an open question in `DESIGN.md`.
pub const DEFAULT_RESISTANCE: u32 = 10;

/// Which pluggable seed source an algorithm string selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Fortuna,
    Permute,
    System,
    Zero,
}

impl SourceKind {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "FORTUNA" => Some(Self::Fortuna),
            "PERMUTE" => Some(Self::Permute),
            "SYSTEM" => Some(Self::System),
            "ZERO" => Some(Self::Zero),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    CtrDrbg,
    Hash(HashVariant),
    Hmac(HashVariant),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HashVariant {
    Sha1,
    Sha256,
    Sha512,
}

fn parse_family(name: &str) -> Option<Family> {
    let normalised: String = name.to_ascii_lowercase().chars().filter(|c| *c != '-').collect();
    Some(match normalised.as_str() {
        "aes" | "aes256" => Family::CtrDrbg,
        "sha1" => Family::Hash(HashVariant::Sha1),
        "sha256" => Family::Hash(HashVariant::Sha256),
        "sha512" => Family::Hash(HashVariant::Sha512),
        "hmacsha1" => Family::Hmac(HashVariant::Sha1),
        "hmacsha256" => Family::Hmac(HashVariant::Sha256),
        "hmacsha512" => Family::Hmac(HashVariant::Sha512),
        _ => return None,
    })
}

const PARAM_NAMES: &[(&str, &str)] = &[
    ("entropy", "entropy"),
    ("lazy", "resistance"),
    ("laziness", "resistance"),
    ("nonce", "nonce"),
    ("personalization", "personalization"),
    ("source", "source"),
    ("threadsafe", "threadsafe"),
];

fn canonical_param(key: &str) -> Option<&'static str> {
    if key.is_empty() {
        return None;
    }
    let key = key.to_ascii_lowercase();
    let matches: HashSet<&'static str> = PARAM_NAMES
        .iter()
        .filter(|(name, _)| name.starts_with(key.as_str()))
        .map(|(_, canon)| *canon)
        .collect();
    if matches.len() == 1 {
        matches.into_iter().next()
    } else {
        None
    }
}

fn decode_base64url(name: &str, value: &str) -> Result<Vec<u8>, BuilderError> {
    Base64Url::decode_vec(value).map_err(|err| BuilderError::InvalidBase64 {
        name: name.to_string(),
        reason: err.to_string(),
    })
}

#[derive(Default)]
struct ParsedParams {
    entropy: Option<Vec<u8>>,
    resistance: Option<u32>,
    nonce: Option<Vec<u8>>,
    personalization: Option<Vec<u8>>,
    source: Option<SourceKind>,
    thread_safe: Option<bool>,
}

fn parse_params(segment: &str) -> Result<ParsedParams, BuilderError> {
    let mut parsed = ParsedParams::default();
    if segment.is_empty() {
        return Ok(parsed);
    }
    for entry in segment.split('&') {
        let (key, value) = entry.split_once('=').unwrap_or((entry, ""));
        let canon = canonical_param(key).ok_or_else(|| BuilderError::UnknownParameter(key.to_string()))?;
        match canon {
            "entropy" => parsed.entropy = Some(decode_base64url(canon, value)?),
            "resistance" => {
                parsed.resistance = Some(value.parse::<u32>().map_err(|_| BuilderError::InvalidInteger {
                    name: canon.to_string(),
                    value: value.to_string(),
                })?)
            }
            "nonce" => parsed.nonce = Some(decode_base64url(canon, value)?),
            "personalization" => parsed.personalization = Some(decode_base64url(canon, value)?),
            "source" => {
                parsed.source =
                    Some(SourceKind::parse(value).ok_or_else(|| BuilderError::UnknownSource(value.to_string()))?)
            }
            "threadsafe" => {
                parsed.thread_safe = Some(match value.to_ascii_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(BuilderError::InvalidBoolean {
                            name: canon.to_string(),
                            value: value.to_string(),
                        })
                    }
                })
            }
            _ => unreachable!("canonical_param only returns names listed in PARAM_NAMES"),
        }
    }
    Ok(parsed)
}

/// A source of seed material backed by a shared [`SystemPrng`] aggregate,
/// for `source=SYSTEM` — defined here rather than in `csprng-drbg` because
/// only this facade crate wires up the system-CSPRNG multiplexer.
struct SystemSeedSource(Arc<SystemPrng>);

impl SeedSource for SystemSeedSource {
    fn get_seed(&self, n: usize) -> Vec<u8> {
        self.0.get_seed(n)
    }
}

/// Shared context a [`Builder`] draws its default seed source and storage
/// hooks from.
pub struct BuilderContext {
    fortuna: Arc<Fortuna>,
    system: Arc<SystemPrng>,
}

impl BuilderContext {
    /// Build a context over the given Fortuna accumulator and System PRNG
    /// aggregate.
    pub fn new(fortuna: Arc<Fortuna>, system: Arc<SystemPrng>) -> Self {
        Self { fortuna, system }
    }

    fn seed_source(&self, kind: SourceKind) -> Arc<dyn SeedSource> {
        match kind {
            SourceKind::Fortuna => Arc::new(FortunaSeedSource::new(self.fortuna.clone())),
            SourceKind::Permute => Arc::new(PermuteSource::new(b"csprng-permute-bootstrap")),
            SourceKind::System => Arc::new(SystemSeedSource(self.system.clone())),
            SourceKind::Zero => Arc::new(ZeroSource),
        }
    }
}

/// The result of parsing and building an algorithm string: the boxed
/// generator plus whether it is safe to cache/reuse in a template pool.
pub struct Built {
    /// The constructed generator.
    pub drbg: Box<dyn Drbg>,
    /// `false` when explicit `entropy`/`nonce` was supplied — such an
    /// instance draws material the caller specified by hand, so reusing it
    /// as a `MultiplexSpi` template would silently share that material
    /// across every pooled instance (§4.12: "not cacheable").
    pub cacheable: bool,
}

fn seedlen_for(variant: HashVariant) -> usize {
    match variant {
        HashVariant::Sha1 => 55,
        HashVariant::Sha256 => 55,
        HashVariant::Sha512 => 111,
    }
}

fn material_from(params: &ParsedParams, seedlen: usize) -> InitialMaterial {
    let mut material = InitialMaterial::new(seedlen, seedlen);
    if let Some(entropy) = &params.entropy {
        material = material.with_entropy(entropy.clone());
    }
    if let Some(nonce) = &params.nonce {
        material = material.with_nonce(nonce.clone());
    }
    if let Some(personalization) = &params.personalization {
        material = material.with_personalization(personalization.clone());
    }
    material
}

/// Parses algorithm strings of the form
/// `[nist/](aes|aes256|sha-?1|sha-?256|sha-?512|hmacsha-?1|hmacsha-?256|hmacsha-?512)[/param&param&…]`
/// and builds the corresponding generator.
pub struct Builder<'a> {
    context: &'a BuilderContext,
}

impl<'a> Builder<'a> {
    /// A builder drawing its default seed sources from `context`.
    pub fn new(context: &'a BuilderContext) -> Self {
        Self { context }
    }

    /// Parse `algorithm` and build the generator it names.
    pub fn build(&self, algorithm: &str) -> Result<Built, BuilderError> {
        let mut segments = algorithm.splitn(3, '/');
        let mut first = segments.next().unwrap_or("");
        if first.eq_ignore_ascii_case("nist") {
            first = segments.next().unwrap_or("");
        }
        let family = parse_family(first).ok_or_else(|| BuilderError::NoSuchAlgorithm(algorithm.to_string()))?;
        let param_segment = segments.next().unwrap_or("");
        let params = parse_params(param_segment)?;

        let resistance = params.resistance.unwrap_or(DEFAULT_RESISTANCE);
        let source_kind = params.source.unwrap_or(SourceKind::Fortuna);
        let seed_source = self.context.seed_source(source_kind);
        let cacheable = params.entropy.is_none() && params.nonce.is_none();

        let drbg: Box<dyn Drbg> = match family {
            Family::CtrDrbg => {
                let material = material_from(&params, 48);
                Box::new(CtrDrbg::with_material(seed_source, material, resistance))
            }
            Family::Hash(HashVariant::Sha1) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha1));
                Box::new(HashDrbg::<Sha1>::with_material(seed_source, material, resistance))
            }
            Family::Hash(HashVariant::Sha256) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha256));
                Box::new(HashDrbg::<Sha256>::with_material(seed_source, material, resistance))
            }
            Family::Hash(HashVariant::Sha512) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha512));
                Box::new(HashDrbg::<Sha512>::with_material(seed_source, material, resistance))
            }
            Family::Hmac(HashVariant::Sha1) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha1));
                Box::new(HmacDrbg::<Sha1>::with_material(seed_source, material, resistance))
            }
            Family::Hmac(HashVariant::Sha256) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha256));
                Box::new(HmacDrbg::<Sha256>::with_material(seed_source, material, resistance))
            }
            Family::Hmac(HashVariant::Sha512) => {
                let material = material_from(&params, seedlen_for(HashVariant::Sha512));
                Box::new(HmacDrbg::<Sha512>::with_material(seed_source, material, resistance))
            }
        };

        Ok(Built { drbg, cacheable })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BuilderContext {
        BuilderContext::new(Arc::new(Fortuna::new()), Arc::new(SystemPrng::new(1)))
    }

    #[test]
    fn parses_hmac_sha256_with_resistance_source_and_personalization() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        let built = builder
            .build("nist/hmacsha256/laziness=3&source=ZERO&personalization=AA==")
            .unwrap();
        assert!(built.cacheable);
        let mut out = [0u8; 8];
        let mut drbg = built.drbg;
        drbg.next_bytes(&mut out).unwrap();
    }

    #[test]
    fn rejects_unknown_algorithm() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        assert!(matches!(
            builder.build("nist/made-up-algo"),
            Err(BuilderError::NoSuchAlgorithm(_))
        ));
    }

    #[test]
    fn rejects_invalid_base64() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        assert!(matches!(
            builder.build("aes256/entropy=not-valid-base64!!"),
            Err(BuilderError::InvalidBase64 { .. })
        ));
    }

    #[test]
    fn rejects_unknown_parameter() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        assert!(matches!(
            builder.build("aes256/bogus=1"),
            Err(BuilderError::UnknownParameter(_))
        ));
    }

    #[test]
    fn accepts_hyphenated_sha_name_without_nist_prefix() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        let built = builder.build("sha-256/source=ZERO").unwrap();
        assert!(built.cacheable);
    }

    #[test]
    fn explicit_entropy_marks_instance_not_cacheable() {
        let ctx = context();
        let builder = Builder::new(&ctx);
        let entropy = Base64Url::encode_string(&[0u8; 55]);
        let built = builder
            .build(&format!("sha256/source=ZERO&entropy={entropy}"))
            .unwrap();
        assert!(!built.cacheable);
    }
}
