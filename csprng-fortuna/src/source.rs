//! The entropy-event source facade: typed value ingest that wraps values as
//! [`EntropyEvent`]s and dispatches them into the accumulator by
//! round-robining a per-source pool counter.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;

use csprng_primitives::EntropyEvent;

use crate::Fortuna;

static NEXT_SOURCE_ID: AtomicU32 = AtomicU32::new(0);

/// A named entropy feed into a [`Fortuna`] accumulator.
///
/// Two events from the same source land in consecutive pools; two events
/// from different sources pick pools independently of one another, and no
/// ordering between sources is guaranteed.
pub struct EntropySource {
    source_id: u8,
    next_pool: AtomicU8,
    fortuna: Arc<Fortuna>,
}

impl EntropySource {
    /// Allocate a new source with a process-unique id (truncated to 8 bits,
    /// wrapping after 256 sources are created in a process — collisions
    /// only affect event attribution, never correctness, since the
    /// accumulator does not otherwise distinguish sources).
    pub fn new(fortuna: Arc<Fortuna>) -> Self {
        let source_id = (NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed) & 0xFF) as u8;
        Self {
            source_id,
            next_pool: AtomicU8::new(0),
            fortuna,
        }
    }

    /// This source's id.
    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    /// Ingest a `u8` value.
    pub fn set_event_u8(&self, value: u8) {
        self.post(EntropyEvent::from_u8(self.source_id, value));
    }

    /// Ingest a `u16` value (big-endian canonical encoding).
    pub fn set_event_u16(&self, value: u16) {
        self.post(EntropyEvent::from_u16(self.source_id, value));
    }

    /// Ingest a `u32` value (big-endian canonical encoding).
    pub fn set_event_u32(&self, value: u32) {
        self.post(EntropyEvent::from_u32(self.source_id, value));
    }

    /// Ingest a `u64` value (big-endian canonical encoding).
    pub fn set_event_u64(&self, value: u64) {
        self.post(EntropyEvent::from_u64(self.source_id, value));
    }

    /// Ingest an `f32` value (big-endian encoding of its bit pattern).
    pub fn set_event_f32(&self, value: f32) {
        self.post(EntropyEvent::from_f32(self.source_id, value));
    }

    /// Ingest an `f64` value (big-endian encoding of its bit pattern).
    pub fn set_event_f64(&self, value: f64) {
        self.post(EntropyEvent::from_f64(self.source_id, value));
    }

    /// Ingest a raw byte slice (truncated to 255 bytes).
    pub fn set_event_bytes(&self, value: &[u8]) {
        self.post(EntropyEvent::new(self.source_id, value.to_vec()));
    }

    /// Atomically advance this source's pool counter and dispatch the
    /// framed event into the chosen pool.
    fn post(&self, event: EntropyEvent) {
        let pool = self.next_pool.fetch_add(1, Ordering::Relaxed) % 32;
        self.fortuna.add_event(pool, &event.to_framed_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_events_from_one_source_advance_pools() {
        let fortuna = Arc::new(Fortuna::new());
        let source = EntropySource::new(fortuna);
        assert_eq!(source.next_pool.load(Ordering::Relaxed), 0);
        source.set_event_u32(1);
        assert_eq!(source.next_pool.load(Ordering::Relaxed), 1);
        source.set_event_u32(2);
        assert_eq!(source.next_pool.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn pool_counter_wraps_at_32() {
        let fortuna = Arc::new(Fortuna::new());
        let source = EntropySource::new(fortuna);
        for _ in 0..32 {
            source.set_event_u8(0);
        }
        assert_eq!(source.next_pool.load(Ordering::Relaxed), 0);
    }
}
