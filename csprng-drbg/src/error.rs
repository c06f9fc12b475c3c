//! Error type shared by every DRBG in this crate.

/// Failure modes a DRBG can surface to a caller.
///
/// Unavailability of the underlying cryptographic primitives (SHA-2, AES)
/// is not represented here: those are mandatory dependencies resolved at
/// compile time, so their absence is a build error rather than a runtime
/// `Result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DrbgError {
    /// The caller requested more output than a single call may produce.
    #[error("requested output exceeds the per-call maximum of {max} bytes")]
    RequestTooLarge {
        /// The maximum number of bytes permitted per call.
        max: usize,
    },
    /// `entropy` was shorter than the algorithm's minimum entropy input.
    #[error("insufficient entropy: need at least {min} bytes")]
    InsufficientEntropy {
        /// The minimum number of entropy bytes the algorithm requires.
        min: usize,
    },
}
