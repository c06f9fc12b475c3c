#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

//! Entropy collectors, the system-PRNG multiplexer, and the instant-entropy
//! bootstrap pool that feed a Fortuna accumulator.

mod collector;
mod crossfeed;
mod error;
mod instant;
mod jitter;
mod memory;
mod system_source;
mod thread_time;

pub use collector::{AdaptiveSchedule, CollectorHandle, EntropyCollector};
pub use crossfeed::SystemCrossFeedCollector;
pub use error::CollectorError;
pub use instant::InstantEntropy;
pub use jitter::SchedulingJitterCollector;
pub use memory::FreeMemoryCollector;
pub use system_source::SystemPrng;
pub use thread_time::ThreadCpuTimeCollector;
