//! Error type shared by every storage backend.

/// Failure modes surfaced by [`crate::SeedStorage`] and [`crate::Storage`].
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend failed to open, read, or write its underlying medium.
    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted record was corrupt (truncated name, bad length prefix,
    /// invalid modified-UTF-8). The caller sees `None`; the entry is
    /// removed.
    #[error("corrupt seed record: {0}")]
    Corrupt(String),
    /// `name` exceeded the 32768-byte limit.
    #[error("seed name exceeds the maximum of {max} bytes")]
    NameTooLong {
        /// Maximum allowed name length in bytes.
        max: usize,
    },
    /// `data` exceeded the 65536-byte limit.
    #[error("seed value exceeds the maximum of {max} bytes")]
    ValueTooLong {
        /// Maximum allowed value length in bytes.
        max: usize,
    },
}
