#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! NIST SP800-90A generators: `Hash_DRBG`, `HMAC_DRBG`, and `CTR_DRBG`
//! (AES-256), sharing an internal reseed/spare-byte bookkeeping struct and
//! the [`InitialMaterial`] lazy-composition contract.

mod base;
mod ctr_drbg;
mod error;
mod hash_drbg;
mod hmac_drbg;
mod material;
mod seed_source;

pub use ctr_drbg::CtrDrbg;
pub use error::DrbgError;
pub use hash_drbg::HashDrbg;
pub use hmac_drbg::HmacDrbg;
pub use material::{InitialMaterial, RealisedMaterial};
pub use seed_source::{FortunaSeedSource, PermuteSource, SeedSource, ZeroSource};

/// Per-call output ceiling shared by every algorithm in this crate, in
/// bytes. `next_bytes` callers above this should loop rather than widen a
/// single request.
pub const MAX_BYTES_PER_REQUEST: usize = 1 << 19;
