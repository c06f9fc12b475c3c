//! Scheduling-jitter collector: the delta between a requested and actual
//! sleep duration is itself a (weak, platform-dependent) entropy signal
//! driven by OS scheduler noise.

use std::time::{Duration, Instant};

use csprng_fortuna::EntropySource;

use crate::collector::EntropyCollector;
use crate::error::CollectorError;

/// Measures how far a short sleep overshoots its requested duration.
pub struct SchedulingJitterCollector {
    nominal: Duration,
}

impl SchedulingJitterCollector {
    /// Build a collector that sleeps for `nominal` each sample.
    pub fn new(nominal: Duration) -> Self {
        Self { nominal }
    }
}

impl Default for SchedulingJitterCollector {
    fn default() -> Self {
        Self::new(Duration::from_micros(200))
    }
}

impl EntropyCollector for SchedulingJitterCollector {
    fn name(&self) -> &str {
        "scheduling-jitter"
    }

    fn run_once(&self, source: &EntropySource) -> Result<(), CollectorError> {
        let start = Instant::now();
        std::thread::sleep(self.nominal);
        let actual = start.elapsed();
        let overshoot_nanos = actual.saturating_sub(self.nominal).as_nanos() as u64;
        source.set_event_u64(overshoot_nanos);
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
        let source = EntropySource::new(fortuna.clone());
        let collector = SchedulingJitterCollector::new(Duration::from_micros(50));
        collector.run_once(&source).unwrap();
    }
}
