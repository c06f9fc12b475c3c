//! The entropy-event wire type: `(source_id, length, payload)`, as injected
//! into a Fortuna pool.

/// One entropy-event record: a byte identifying its source, a length byte,
/// and the raw payload (big-endian canonical encoding of the source value).
///
/// `payload.len()` must fit in a `u8` (i.e. be `<= 255`); callers that serialise
/// a longer byte slice truncate it before constructing the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntropyEvent {
    source_id: u8,
    payload: Vec<u8>,
}

impl EntropyEvent {
    /// Build an event from a source id and a payload no longer than 255 bytes.
    ///
    /// Payloads longer than 255 bytes are truncated, matching the wire
    /// format's single length byte.
    pub fn new(source_id: u8, mut payload: Vec<u8>) -> Self {
        payload.truncate(u8::MAX as usize);
        Self { source_id, payload }
    }

    /// Construct an event carrying the big-endian encoding of an integer.
    pub fn from_u8(source_id: u8, value: u8) -> Self {
        Self::new(source_id, vec![value])
    }

    /// Construct an event carrying the big-endian encoding of a `u16`.
    pub fn from_u16(source_id: u8, value: u16) -> Self {
        Self::new(source_id, value.to_be_bytes().to_vec())
    }

    /// Construct an event carrying the big-endian encoding of a `u32`.
    pub fn from_u32(source_id: u8, value: u32) -> Self {
        Self::new(source_id, value.to_be_bytes().to_vec())
    }

    /// Construct an event carrying the big-endian encoding of a `u64`.
    pub fn from_u64(source_id: u8, value: u64) -> Self {
        Self::new(source_id, value.to_be_bytes().to_vec())
    }

    /// Construct an event carrying the big-endian encoding of an `f32`
    /// (via its IEEE-754 bit pattern).
    pub fn from_f32(source_id: u8, value: f32) -> Self {
        Self::from_u32(source_id, value.to_bits())
    }

    /// Construct an event carrying the big-endian encoding of an `f64`
    /// (via its IEEE-754 bit pattern).
    pub fn from_f64(source_id: u8, value: f64) -> Self {
        Self::from_u64(source_id, value.to_bits())
    }

    /// The source identifier this event originated from.
    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    /// The length-prefixed payload (`<= 255` bytes).
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Serialise as `[source_id, len, payload...]`.
    pub fn to_framed_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.payload.len());
        out.push(self.source_id);
        out.push(self.payload.len() as u8);
        out.extend_from_slice(&self.payload);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_matches_source_len_payload() {
        let ev = EntropyEvent::from_u32(7, 0xdead_beef);
        let framed = ev.to_framed_bytes();
        assert_eq!(framed[0], 7);
        assert_eq!(framed[1], 4);
        assert_eq!(&framed[2..], &0xdead_beef_u32.to_be_bytes());
    }

    #[test]
    fn payload_longer_than_255_bytes_is_truncated() {
        let ev = EntropyEvent::new(1, vec![0xAB; 1000]);
        assert_eq!(ev.payload().len(), 255);
    }
}
