#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! Leaf-level building blocks shared by the rest of the `csprng` workspace:
//! the SP800-108 KDF, an RFC5649 key-wrap helper, the ISAAC generator used
//! for non-secret internal shuffling, the entropy-event wire type, a
//! modified-UTF-8 framed codec for persistence, and a time-based nonce
//! factory.

pub mod codec;
pub mod event;
pub mod isaac;
pub mod kdf;
pub mod nonce;
pub mod wrap;

pub use codec::{FramedReader, FramedWriter, ModifiedUtf8Error};
pub use event::EntropyEvent;
pub use isaac::IsaacRng;
pub use kdf::kdf_800_108;
pub use nonce::NonceFactory;
pub use wrap::{key_unwrap, key_wrap, KeyWrapError};
