//! RFC 5649 AES key wrap with padding (the variant of RFC 3394 that allows
//! plaintext lengths that are not a multiple of 8 bytes).

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;

const ICV2: [u8; 4] = [0xA6, 0x59, 0x59, 0xA6];

/// Errors returned by [`key_wrap`]/[`key_unwrap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyWrapError {
    /// The plaintext was empty or exceeded the 32-bit length field.
    #[error("invalid plaintext length for key wrap")]
    InvalidLength,
    /// The wrapped input was shorter than the minimum 16-byte ciphertext.
    #[error("wrapped input too short")]
    TooShort,
    /// Integrity check failed while unwrapping: wrong key or corrupted data.
    #[error("key unwrap integrity check failed")]
    IntegrityCheckFailed,
}

/// Wrap `plaintext` (1..=2^32-1 bytes) under a 256-bit AES key, per RFC 5649.
pub fn key_wrap(kek: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
    if plaintext.is_empty() || plaintext.len() > u32::MAX as usize {
        return Err(KeyWrapError::InvalidLength);
    }

    let cipher = Aes256::new(GenericArray::from_slice(kek));
    let padded_len = plaintext.len().div_ceil(8) * 8;
    let mut padded = vec![0u8; padded_len];
    padded[..plaintext.len()].copy_from_slice(plaintext);

    if padded_len == 8 {
        // Section 4.1: single 64-bit block, wrapped with one AES encryption.
        let mut block = [0u8; 16];
        block[..4].copy_from_slice(&ICV2);
        block[4..8].copy_from_slice(&(plaintext.len() as u32).to_be_bytes());
        block[8..].copy_from_slice(&padded);
        let mut ga = GenericArray::clone_from_slice(&block);
        cipher.encrypt_block(&mut ga);
        return Ok(ga.to_vec());
    }

    let n = padded_len / 8;
    let mut r: Vec<[u8; 8]> = (0..n)
        .map(|i| {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&padded[i * 8..i * 8 + 8]);
            chunk
        })
        .collect();

    let mut a = [0u8; 8];
    a[..4].copy_from_slice(&ICV2);
    a[4..8].copy_from_slice(&(plaintext.len() as u32).to_be_bytes());

    wrap_rounds(&cipher, &mut a, &mut r);

    let mut out = Vec::with_capacity(8 + n * 8);
    out.extend_from_slice(&a);
    for block in &r {
        out.extend_from_slice(block);
    }
    Ok(out)
}

/// Unwrap ciphertext produced by [`key_wrap`], returning the original
/// plaintext once its integrity check vector and padding have been
/// validated.
pub fn key_unwrap(kek: &[u8; 32], wrapped: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
    if wrapped.len() < 16 {
        return Err(KeyWrapError::TooShort);
    }
    let cipher = Aes256::new(GenericArray::from_slice(kek));

    if wrapped.len() == 16 {
        let mut ga = GenericArray::clone_from_slice(wrapped);
        cipher.decrypt_block(&mut ga);
        let block = ga.as_slice();
        if block[..4] != ICV2 {
            return Err(KeyWrapError::IntegrityCheckFailed);
        }
        let len = u32::from_be_bytes(block[4..8].try_into().unwrap()) as usize;
        let padded = &block[8..];
        return validate_and_trim(len, padded);
    }

    if (wrapped.len() - 8) % 8 != 0 {
        return Err(KeyWrapError::TooShort);
    }
    let n = (wrapped.len() - 8) / 8;
    let mut a = [0u8; 8];
    a.copy_from_slice(&wrapped[..8]);
    let mut r: Vec<[u8; 8]> = (0..n)
        .map(|i| {
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&wrapped[8 + i * 8..8 + i * 8 + 8]);
            chunk
        })
        .collect();

    unwrap_rounds(&cipher, &mut a, &mut r);

    if a[..4] != ICV2 {
        return Err(KeyWrapError::IntegrityCheckFailed);
    }
    let len = u32::from_be_bytes(a[4..8].try_into().unwrap()) as usize;
    let padded: Vec<u8> = r.into_iter().flatten().collect();
    validate_and_trim(len, &padded)
}

fn validate_and_trim(len: usize, padded: &[u8]) -> Result<Vec<u8>, KeyWrapError> {
    if len == 0 || len > padded.len() || padded.len() - len >= 8 {
        return Err(KeyWrapError::IntegrityCheckFailed);
    }
    if padded[len..].iter().any(|&b| b != 0) {
        return Err(KeyWrapError::IntegrityCheckFailed);
    }
    Ok(padded[..len].to_vec())
}

fn wrap_rounds(cipher: &Aes256, a: &mut [u8; 8], r: &mut [[u8; 8]]) {
    let n = r.len();
    for j in 0..=5u64 {
        for (i, block) in r.iter_mut().enumerate() {
            let mut buf = [0u8; 16];
            buf[..8].copy_from_slice(a);
            buf[8..].copy_from_slice(block);
            let mut ga = GenericArray::clone_from_slice(&buf);
            cipher.encrypt_block(&mut ga);
            a.copy_from_slice(&ga[..8]);
            let t = j * (n as u64) + (i as u64) + 1;
            xor_counter(a, t);
            block.copy_from_slice(&ga[8..]);
        }
    }
}

fn unwrap_rounds(cipher: &Aes256, a: &mut [u8; 8], r: &mut [[u8; 8]]) {
    let n = r.len();
    for j in (0..=5u64).rev() {
        for i in (0..n).rev() {
            let t = j * (n as u64) + (i as u64) + 1;
            xor_counter(a, t);
            let mut buf = [0u8; 16];
            buf[..8].copy_from_slice(a);
            buf[8..].copy_from_slice(&r[i]);
            let mut ga = GenericArray::clone_from_slice(&buf);
            cipher.decrypt_block(&mut ga);
            a.copy_from_slice(&ga[..8]);
            r[i].copy_from_slice(&ga[8..]);
        }
    }
}

fn xor_counter(a: &mut [u8; 8], t: u64) {
    let t_bytes = t.to_be_bytes();
    for i in 0..8 {
        a[i] ^= t_bytes[i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_length_plaintext() {
        let kek = [0x11u8; 32];
        for len in [1usize, 7, 8, 9, 20, 100] {
            let plaintext: Vec<u8> = (0..len as u8).collect();
            let wrapped = key_wrap(&kek, &plaintext).unwrap();
            let unwrapped = key_unwrap(&kek, &wrapped).unwrap();
            assert_eq!(unwrapped, plaintext, "length {len}");
        }
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let kek = [0x22u8; 32];
        let plaintext = b"fortuna seed fingerprint";
        let mut wrapped = key_wrap(&kek, plaintext).unwrap();
        *wrapped.last_mut().unwrap() ^= 0xFF;
        assert_eq!(
            key_unwrap(&kek, &wrapped),
            Err(KeyWrapError::IntegrityCheckFailed)
        );
    }

    #[test]
    fn rejects_empty_plaintext() {
        let kek = [0u8; 32];
        assert_eq!(key_wrap(&kek, &[]), Err(KeyWrapError::InvalidLength));
    }
}
