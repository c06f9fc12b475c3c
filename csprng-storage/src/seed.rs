//! The persisted `Seed` value: a named byte blob, either already in hand or
//! materialised from a thunk on first save (§9 "Deferred seeds / thunks").

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Name length limit (§3).
pub const MAX_NAME_LEN: usize = 32768;
/// Value length limit (§3).
pub const MAX_DATA_LEN: usize = 65536;

enum Payload {
    Eager(Vec<u8>),
    Deferred(Arc<dyn Fn() -> Vec<u8> + Send + Sync>),
}

/// A named seed. `data` is either eager (already in memory) or a thunk that
/// is invoked exactly once, at first save; a thunk that panics yields an
/// empty byte slice rather than propagating.
pub struct Seed {
    name: String,
    payload: Payload,
}

impl Seed {
    /// An eager seed with `data` already in hand.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Eager(data),
        }
    }

    /// A seed whose bytes are produced lazily by `thunk`, materialised
    /// exactly once when this seed is first saved.
    pub fn deferred(name: impl Into<String>, thunk: Arc<dyn Fn() -> Vec<u8> + Send + Sync>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Deferred(thunk),
        }
    }

    /// This seed's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Produce this seed's bytes, invoking a deferred thunk if needed. A
    /// thunk that panics is caught and yields an empty slice.
    pub fn materialise(&self) -> Vec<u8> {
        match &self.payload {
            Payload::Eager(data) => data.clone(),
            Payload::Deferred(thunk) => {
                catch_unwind(AssertUnwindSafe(|| thunk())).unwrap_or_default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eager_seed_returns_its_data() {
        let seed = Seed::new("x", vec![1, 2, 3]);
        assert_eq!(seed.materialise(), vec![1, 2, 3]);
    }

    #[test]
    fn deferred_seed_invokes_thunk() {
        let seed = Seed::deferred("x", Arc::new(|| vec![9, 9]));
        assert_eq!(seed.materialise(), vec![9, 9]);
    }

    #[test]
    fn panicking_thunk_yields_empty_slice() {
        let seed = Seed::deferred("x", Arc::new(|| panic!("boom")));
        assert_eq!(seed.materialise(), Vec::<u8>::new());
    }
}
