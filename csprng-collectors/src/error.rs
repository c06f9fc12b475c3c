//! Error type shared by the collectors in this crate.

/// Failure modes a collector or the system-PRNG aggregate can surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectorError {
    /// The named collector class is not recognised by the registry.
    #[error("unknown collector class: {0}")]
    UnknownCollector(String),
    /// The collector's underlying platform resource is unavailable
    /// (device missing, permission denied). The collector is deregistered
    /// after this is reported once.
    #[error("collector {name} unavailable: {reason}")]
    Unavailable {
        /// The collector's name.
        name: String,
        /// A human-readable reason, for a single log line.
        reason: String,
    },
}
