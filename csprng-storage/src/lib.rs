//! Durable named-seed storage with a bijective scrambler layer (§4.10, §6).

mod backend;
mod error;
mod scrambler;
mod seed;
mod storage;

pub use backend::{FallbackBackend, FileBackend, PreferenceBackend, SeedStorage};
pub use error::StorageError;
pub use scrambler::Scrambler;
pub use seed::{Seed, MAX_DATA_LEN, MAX_NAME_LEN};
pub use storage::{Storage, SAVE_ADD, SAVE_MAX, SAVE_MULTIPLY, SAVE_PERIOD};
