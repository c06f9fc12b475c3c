//! A small framed binary codec for persistence: length-prefixed
//! modified-UTF-8 strings and length-prefixed byte blobs, read and written
//! with explicit big-endian `u16` length prefixes.
//!
//! Modified UTF-8 differs from standard UTF-8 in two ways: the NUL
//! character is always encoded as the two-byte sequence `0xC0 0x80` (so C
//! strings embedding it stay NUL-free), and codepoints above `U+FFFF` are
//! encoded as a UTF-16 surrogate pair, each surrogate emitted as its own
//! three-byte sequence, rather than the four-byte sequence standard UTF-8
//! would use. A generic UTF-8 library cannot produce or parse this, so we
//! do not reuse one.

use std::io::{self, Read, Write};

/// Errors arising from decoding a modified-UTF-8 byte string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ModifiedUtf8Error {
    /// A byte sequence used the standard-UTF-8 4-byte form, which modified
    /// UTF-8 forbids (supplementary codepoints must appear as two 3-byte
    /// surrogate halves instead).
    #[error("4-byte UTF-8 sequence is not valid modified UTF-8")]
    FourByteSequence,
    /// The byte stream ended partway through a multi-byte sequence, or a
    /// continuation byte did not have the `10xxxxxx` high bits.
    #[error("truncated or malformed modified-UTF-8 sequence")]
    Truncated,
    /// A low surrogate appeared without a preceding high surrogate, or vice
    /// versa, or the reconstructed surrogate pair was invalid.
    #[error("unpaired or invalid surrogate in modified-UTF-8 stream")]
    InvalidSurrogate,
}

/// Encode a Rust string as modified UTF-8.
pub fn mutf8_encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for ch in s.chars() {
        encode_char(ch, &mut out);
    }
    out
}

fn encode_char(ch: char, out: &mut Vec<u8>) {
    let cp = ch as u32;
    match cp {
        0x0001..=0x007F => out.push(cp as u8),
        0x0000 | 0x0080..=0x07FF => {
            out.push(0xC0 | ((cp >> 6) as u8));
            out.push(0x80 | ((cp & 0x3F) as u8));
        }
        0x0800..=0xFFFF => encode_3byte(cp, out),
        _ => {
            // Supplementary plane: split into a UTF-16 surrogate pair and
            // encode each half as its own 3-byte sequence.
            let v = cp - 0x10000;
            let high = 0xD800 + (v >> 10);
            let low = 0xDC00 + (v & 0x3FF);
            encode_3byte(high, out);
            encode_3byte(low, out);
        }
    }
}

fn encode_3byte(cp: u32, out: &mut Vec<u8>) {
    out.push(0xE0 | ((cp >> 12) as u8));
    out.push(0x80 | (((cp >> 6) & 0x3F) as u8));
    out.push(0x80 | ((cp & 0x3F) as u8));
}

/// Decode a modified-UTF-8 byte string back into a Rust `String`, rejecting
/// any 4-byte sequence.
pub fn mutf8_decode(bytes: &[u8]) -> Result<String, ModifiedUtf8Error> {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    let mut pending_high_surrogate: Option<u32> = None;

    while i < bytes.len() {
        let b0 = bytes[i];
        let (cp, width) = if b0 & 0x80 == 0 {
            (b0 as u32, 1)
        } else if b0 & 0xE0 == 0xC0 {
            let b1 = cont_byte(bytes, i + 1)?;
            (((b0 as u32 & 0x1F) << 6) | b1, 2)
        } else if b0 & 0xF0 == 0xE0 {
            let b1 = cont_byte(bytes, i + 1)?;
            let b2 = cont_byte(bytes, i + 2)?;
            (((b0 as u32 & 0x0F) << 12) | (b1 << 6) | b2, 3)
        } else if b0 & 0xF8 == 0xF0 {
            return Err(ModifiedUtf8Error::FourByteSequence);
        } else {
            return Err(ModifiedUtf8Error::Truncated);
        };
        i += width;

        if (0xD800..=0xDBFF).contains(&cp) {
            if pending_high_surrogate.is_some() {
                return Err(ModifiedUtf8Error::InvalidSurrogate);
            }
            pending_high_surrogate = Some(cp);
            continue;
        }
        if (0xDC00..=0xDFFF).contains(&cp) {
            let high = pending_high_surrogate
                .take()
                .ok_or(ModifiedUtf8Error::InvalidSurrogate)?;
            let combined = 0x10000 + ((high - 0xD800) << 10) + (cp - 0xDC00);
            let ch = char::from_u32(combined).ok_or(ModifiedUtf8Error::InvalidSurrogate)?;
            out.push(ch);
            continue;
        }
        if pending_high_surrogate.is_some() {
            return Err(ModifiedUtf8Error::InvalidSurrogate);
        }
        let ch = char::from_u32(cp).ok_or(ModifiedUtf8Error::Truncated)?;
        out.push(ch);
    }

    if pending_high_surrogate.is_some() {
        return Err(ModifiedUtf8Error::InvalidSurrogate);
    }
    Ok(out)
}

fn cont_byte(bytes: &[u8], idx: usize) -> Result<u32, ModifiedUtf8Error> {
    let b = *bytes.get(idx).ok_or(ModifiedUtf8Error::Truncated)?;
    if b & 0xC0 != 0x80 {
        return Err(ModifiedUtf8Error::Truncated);
    }
    Ok((b & 0x3F) as u32)
}

/// Writes length-prefixed modified-UTF-8 strings and length-prefixed byte
/// blobs to an underlying [`Write`].
pub struct FramedWriter<W> {
    inner: W,
}

impl<W: Write> FramedWriter<W> {
    /// Wrap a writer.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write a `u16`-length-prefixed modified-UTF-8 string. The encoded
    /// length must fit in a `u16` (`<= 0xFFFF` bytes).
    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        let encoded = mutf8_encode(s);
        if encoded.len() > u16::MAX as usize {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "string too long"));
        }
        self.inner.write_all(&(encoded.len() as u16).to_be_bytes())?;
        self.inner.write_all(&encoded)
    }

    /// Write a `u16`-length-prefixed byte blob.
    pub fn write_blob(&mut self, data: &[u8]) -> io::Result<()> {
        if data.len() > u16::MAX as usize {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "blob too long"));
        }
        self.inner.write_all(&(data.len() as u16).to_be_bytes())?;
        self.inner.write_all(data)
    }

    /// Write a single flag/tag byte (used by the storage wire format to
    /// mark "record follows" vs. "end of stream").
    pub fn write_u8(&mut self, byte: u8) -> io::Result<()> {
        self.inner.write_all(&[byte])
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Reads length-prefixed modified-UTF-8 strings and length-prefixed byte
/// blobs from an underlying [`Read`].
pub struct FramedReader<R> {
    inner: R,
}

impl<R: Read> FramedReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read one flag/tag byte, or `Ok(None)` at a clean EOF.
    pub fn read_u8(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.inner.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    /// Read a `u16`-length-prefixed modified-UTF-8 string.
    pub fn read_str(&mut self) -> io::Result<String> {
        let blob = self.read_blob()?;
        mutf8_decode(&blob).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Read a `u16`-length-prefixed byte blob.
    pub fn read_blob(&mut self) -> io::Result<Vec<u8>> {
        let mut len_buf = [0u8; 2];
        self.inner.read_exact(&mut len_buf)?;
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut data = vec![0u8; len];
        self.inner.read_exact(&mut data)?;
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_round_trips() {
        let s = "Fortuna.17";
        assert_eq!(mutf8_decode(&mutf8_encode(s)).unwrap(), s);
    }

    #[test]
    fn embedded_nul_is_two_bytes() {
        let encoded = mutf8_encode("a\0b");
        assert_eq!(encoded, vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(mutf8_decode(&encoded).unwrap(), "a\0b");
    }

    #[test]
    fn supplementary_plane_round_trips_as_surrogate_pair() {
        let s = "\u{1F980}"; // crab emoji, outside the BMP
        let encoded = mutf8_encode(s);
        assert_eq!(encoded.len(), 6, "two 3-byte surrogate halves");
        assert_eq!(mutf8_decode(&encoded).unwrap(), s);
    }

    #[test]
    fn four_byte_standard_utf8_sequence_is_rejected() {
        // Standard UTF-8 encoding of U+1F980, which modified UTF-8 forbids.
        let standard_utf8 = "\u{1F980}".as_bytes().to_vec();
        assert_eq!(
            mutf8_decode(&standard_utf8),
            Err(ModifiedUtf8Error::FourByteSequence)
        );
    }

    #[test]
    fn framed_round_trip() {
        let mut buf = Vec::new();
        {
            let mut w = FramedWriter::new(&mut buf);
            w.write_str("Fortuna.0").unwrap();
            w.write_blob(&[1, 2, 3, 4]).unwrap();
        }
        let mut r = FramedReader::new(&buf[..]);
        assert_eq!(r.read_str().unwrap(), "Fortuna.0");
        assert_eq!(r.read_blob().unwrap(), vec![1, 2, 3, 4]);
    }
}
