//! System-CSPRNG cross-feed collector: periodically draws bytes from the
//! [`SystemPrng`] aggregate and posts them as an entropy event, so the
//! Fortuna accumulator benefits from every platform CSPRNG the process can
//! reach.

use std::sync::Arc;

use csprng_fortuna::EntropySource;

use crate::collector::EntropyCollector;
use crate::error::CollectorError;
use crate::system_source::SystemPrng;

const SAMPLE_BYTES: usize = 32;

/// Feeds [`SystemPrng`] output into the Fortuna accumulator.
pub struct SystemCrossFeedCollector {
    system: Arc<SystemPrng>,
}

impl SystemCrossFeedCollector {
    /// Cross-feed from `system` into whichever `EntropySource` is passed
    /// to `run_once`.
    pub fn new(system: Arc<SystemPrng>) -> Self {
        Self { system }
    }
}

impl EntropyCollector for SystemCrossFeedCollector {
    fn name(&self) -> &str {
        "system-csprng-crossfeed"
    }

    fn run_once(&self, source: &EntropySource) -> Result<(), CollectorError> {
        self.system.refill_all();
        let sample = self.system.get_seed(SAMPLE_BYTES);
        source.set_event_bytes(&sample);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use csprng_fortuna::Fortuna;

    #[test]
    fn run_once_posts_an_event() {
        let fortuna = Arc::new(Fortuna::new());
        let source = EntropySource::new(fortuna);
        let collector = SystemCrossFeedCollector::new(Arc::new(SystemPrng::new(1)));
        collector.run_once(&source).unwrap();
    }
}
