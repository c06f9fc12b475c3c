#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! The Fortuna entropy accumulator and the event-source facade that feeds
//! it.

mod fortuna;
mod pool;
mod source;

pub use fortuna::{Fortuna, Fulfillment};
pub use source::EntropySource;
