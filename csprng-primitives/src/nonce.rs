//! Per-instantiation nonces and process-unique personalization strings,
//! used to differentiate parallel DRBG instances that otherwise share a
//! seed source (§4.7 of the design: "Initial material composition").

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use uuid::Uuid;

static INSTANCE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Produces per-instantiation nonces (time-based UUIDs) and a stable
/// process-wide personalization string derived from host/process identity.
pub struct NonceFactory;

impl NonceFactory {
    /// A fresh 16-byte nonce. Backed by a UUIDv7 (time-ordered, random tail)
    /// rather than the classic MAC-address-based UUIDv1, so it carries no
    /// network identity and needs no platform MAC lookup, while still
    /// satisfying "time-based" uniqueness per instantiation.
    pub fn create() -> [u8; 16] {
        *Uuid::now_v7().as_bytes()
    }

    /// A stable, process-unique personalization string derived from
    /// hostname (if resolvable), process id, an approximate boot/start
    /// time, and a monotonic per-process instance counter so that two
    /// DRBGs built in the same process still personalize distinctly.
    pub fn personalization() -> Vec<u8> {
        let mut hasher = Sha256::new();

        if let Ok(hostname) = std::env::var("HOSTNAME").or_else(|_| std::env::var("COMPUTERNAME"))
        {
            hasher.update(hostname.as_bytes());
        }
        hasher.update(std::process::id().to_be_bytes());

        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        hasher.update(since_epoch.as_secs().to_be_bytes());

        let instance = INSTANCE_COUNTER.fetch_add(1, Ordering::Relaxed);
        hasher.update(instance.to_be_bytes());

        hasher.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_unique() {
        let a = NonceFactory::create();
        let b = NonceFactory::create();
        assert_ne!(a, b);
    }

    #[test]
    fn personalizations_differ_across_instances_in_same_process() {
        let a = NonceFactory::personalization();
        let b = NonceFactory::personalization();
        assert_ne!(a, b);
    }
}
