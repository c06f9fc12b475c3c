//! Thread-time collector: samples elapsed wall-clock time on a dedicated
//! collector thread as a stand-in for per-thread CPU time, since no
//! dependency already in this workspace exposes a portable CPU-time clock.
//! Cross-platform determinism of entropy collection is explicitly out of
//! scope (§1), so the approximation is acceptable here.

use std::time::Instant;

use csprng_fortuna::EntropySource;

use crate::collector::EntropyCollector;
use crate::error::CollectorError;

/// Samples the nanoseconds elapsed since the collector started, which
/// jitters with scheduler preemption of its own background thread.
pub struct ThreadCpuTimeCollector {
    started: Instant,
}

impl Default for ThreadCpuTimeCollector {
    fn default() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl EntropyCollector for ThreadCpuTimeCollector {
    fn name(&self) -> &str {
        "thread-cpu-time"
    }

    fn run_once(&self, source: &EntropySource) -> Result<(), CollectorError> {
        source.set_event_u64(self.started.elapsed().as_nanos() as u64);
        Ok(())
    }
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
        let collector = ThreadCpuTimeCollector::default();
        collector.run_once(&source).unwrap();
    }
}
