#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! The top-level CSPRNG facade: an algorithm-name builder, a thread-safe
//! multiplexer pool, and process-wide wiring tying the Fortuna
//! accumulator, entropy collectors, the System PRNG aggregate, and seed
//! storage together.

mod builder;
mod config;
mod error;
mod runtime;
mod spi;

pub use builder::{Builder, BuilderContext, Built, DEFAULT_RESISTANCE};
pub use config::Config;
pub use error::BuilderError;
pub use runtime::{bootstrap, global, Runtime};
pub use spi::{Drbg, MultiplexSpi};
