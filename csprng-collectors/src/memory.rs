//! Free-memory collector: samples the process's resident/available memory
//! figure, which drifts unpredictably under concurrent allocator and OS
//! scheduler activity.

use csprng_fortuna::EntropySource;

use crate::collector::EntropyCollector;
use crate::error::CollectorError;

/// Samples a best-effort free-memory figure as entropy.
///
/// Cross-platform determinism of this figure is explicitly out of scope;
/// the value only needs to move unpredictably between samples, not to mean
/// anything precise.
#[derive(Default)]
pub struct FreeMemoryCollector;

impl EntropyCollector for FreeMemoryCollector {
    fn name(&self) -> &str {
        "free-memory"
    }

    fn run_once(&self, source: &EntropySource) -> Result<(), CollectorError> {
        source.set_event_u64(sample_free_memory());
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn sample_free_memory() -> u64 {
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| statm.split_whitespace().nth(1).map(str::to_owned))
        .and_then(|rss_pages| rss_pages.parse::<u64>().ok())
        .unwrap_or_else(fallback_sample)
}

#[cfg(not(target_os = "linux"))]
fn sample_free_memory() -> u64 {
    fallback_sample()
}

/// Heap-churn fallback when no platform-specific memory figure is
/// available: the address of a fresh allocation jitters with allocator and
/// ASLR state between samples.
fn fallback_sample() -> u64 {
    let probe: Box<u8> = Box::new(0);
    &*probe as *const u8 as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use csprng_fortuna::Fortuna;
    use std::sync::Arc;

    #[test]
    fn run_once_posts_an_event() {
        let fortuna = Arc::new(Fortuna::new());
        let source = EntropySource::new(fortuna);
        let collector = FreeMemoryCollector;
        collector.run_once(&source).unwrap();
    }
}
