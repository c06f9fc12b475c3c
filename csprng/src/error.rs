//! Errors surfaced while parsing algorithm strings and building generators.

/// Failure modes from [`crate::Builder`] (§4.12, §7 "Configuration error").
#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    /// The algorithm name did not match any known generator.
    #[error("no such algorithm: {0}")]
    NoSuchAlgorithm(String),
    /// A `key=value` parameter's key matched zero or more than one
    /// recognised parameter name under prefix matching.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    /// A parameter value expected to be base64url-encoded failed to decode.
    #[error("invalid base64 in parameter {name}: {reason}")]
    InvalidBase64 {
        /// The offending parameter's canonical name.
        name: String,
        /// Human-readable decode failure.
        reason: String,
    },
    /// A parameter value expected to be an integer was not one.
    #[error("invalid integer in parameter {name}: {value}")]
    InvalidInteger {
        /// The offending parameter's canonical name.
        name: String,
        /// The raw value that failed to parse.
        value: String,
    },
    /// A parameter value expected to be a boolean was not one.
    #[error("invalid boolean in parameter {name}: {value}")]
    InvalidBoolean {
        /// The offending parameter's canonical name.
        name: String,
        /// The raw value that failed to parse.
        value: String,
    },
    /// `source=` named something other than FORTUNA, PERMUTE, SYSTEM, or
    /// ZERO.
    #[error("unknown seed source: {0}")]
    UnknownSource(String),
}
