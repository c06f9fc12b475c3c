//! §8 scenario 6, exercised against the crate's public API rather than the
//! builder module's internal test helpers.

use csprng::{Builder, BuilderContext, BuilderError};
use csprng_collectors::SystemPrng;
use csprng_fortuna::Fortuna;
use std::sync::Arc;

#[test]
fn hmac_sha256_algorithm_string_builds_a_working_generator() {
    let context = BuilderContext::new(Arc::new(Fortuna::new()), Arc::new(SystemPrng::new(1)));
    let builder = Builder::new(&context);

    let built = builder
        .build("nist/hmacsha256/laziness=3&source=ZERO&personalization=AA==")
        .expect("valid algorithm string");

    let mut drbg = built.drbg;
    let mut a = [0u8; 32];
    let mut b = [0u8; 32];
    drbg.next_bytes(&mut a).unwrap();
    drbg.next_bytes(&mut b).unwrap();
    assert_ne!(a, b);
}

#[test]
fn unparsable_algorithm_string_yields_a_parse_error_without_side_effects() {
    let context = BuilderContext::new(Arc::new(Fortuna::new()), Arc::new(SystemPrng::new(1)));
    let builder = Builder::new(&context);

    assert!(matches!(
        builder.build("nist/not-a-real-algorithm"),
        Err(BuilderError::NoSuchAlgorithm(_))
    ));
    assert!(matches!(
        builder.build("aes256/personalization=***not-base64***"),
        Err(BuilderError::InvalidBase64 { .. })
    ));
}
