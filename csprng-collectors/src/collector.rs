//! The `EntropyCollector` lifecycle and the adaptive scheduler that paces
//! it off the Fortuna accumulator's fulfillment ratio (§5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use csprng_fortuna::{EntropySource, Fulfillment};
use tracing::{debug, warn};

use crate::error::CollectorError;

/// A scheduled entropy source with a uniform init/run/stop lifecycle.
///
/// Implementors are free to draw on any platform-specific signal; the
/// trait only fixes how collectors are driven, not what they measure.
pub trait EntropyCollector: Send + Sync + 'static {
    /// A short, stable name used in logs and the collector registry.
    fn name(&self) -> &str;

    /// One-time setup. Called once before the first `run_once`.
    fn initialise(&self) -> Result<(), CollectorError> {
        Ok(())
    }

    /// Draw one sample and post it to `source`.
    fn run_once(&self, source: &EntropySource) -> Result<(), CollectorError>;
}

/// Knobs controlling how a collector's sampling period adapts to demand.
///
/// The ratio `used/provided` reported by [`Fulfillment`] steers the period
/// between `min_ratio * base` and `max_ratio * base`; when `allow_suspend`
/// is set and nothing has consumed entropy, the collector is suspended
/// until demand returns.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveSchedule {
    base: Duration,
    min_ratio: f64,
    max_ratio: f64,
    allow_suspend: bool,
}

impl AdaptiveSchedule {
    /// Build a schedule with a base period and the default ratio bounds
    /// (0.25x .. 4x), suspension enabled.
    pub fn new(base: Duration) -> Self {
        Self {
            base,
            min_ratio: 0.25,
            max_ratio: 4.0,
            allow_suspend: true,
        }
    }

    /// Override the ratio bounds.
    pub fn with_ratio_bounds(mut self, min_ratio: f64, max_ratio: f64) -> Self {
        self.min_ratio = min_ratio;
        self.max_ratio = max_ratio;
        self
    }

    /// Disable automatic suspension when no entropy is being consumed.
    pub fn without_suspend(mut self) -> Self {
        self.allow_suspend = false;
        self
    }

    /// Whether, given the last observed fulfillment, this collector should
    /// suspend itself rather than run again.
    pub fn should_suspend(&self, fulfillment: Fulfillment) -> bool {
        self.allow_suspend && fulfillment.provided > 0 && fulfillment.used == 0
    }

    /// The delay to sleep before the next sample, given the last observed
    /// fulfillment ratio.
    pub fn next_delay(&self, fulfillment: Fulfillment) -> Duration {
        if fulfillment.provided == 0 {
            return self.base;
        }
        let ratio = fulfillment.used as f64 / fulfillment.provided as f64;
        // High demand (ratio near/above 1) shortens the delay; low demand
        // lengthens it, clamped to [min_ratio, max_ratio] * base.
        let scale = (1.0 / ratio.max(0.01)).clamp(self.min_ratio, self.max_ratio);
        self.base.mul_f64(scale)
    }
}

/// A running collector: owns the background thread and a stop flag.
pub struct CollectorHandle {
    name: String,
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CollectorHandle {
    /// Start `collector` on its own daemon-style thread, posting samples
    /// into `source` on the cadence `schedule` computes from `fulfillment`.
    pub fn spawn<C, F>(collector: C, source: EntropySource, schedule: AdaptiveSchedule, fulfillment: F) -> Self
    where
        C: EntropyCollector,
        F: Fn() -> Fulfillment + Send + 'static,
    {
        let name = collector.name().to_string();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_handle = stop.clone();
        let thread_name = name.clone();

        let thread = thread::Builder::new()
            .name(format!("csprng-collector-{thread_name}"))
            .spawn(move || {
                if let Err(err) = collector.initialise() {
                    warn!(collector = %thread_name, error = %err, "collector failed to initialise");
                    return;
                }
                while !stop_handle.load(Ordering::Acquire) {
                    if schedule.should_suspend(fulfillment()) {
                        thread::sleep(schedule.base);
                        continue;
                    }
                    if let Err(err) = collector.run_once(&source) {
                        warn!(collector = %thread_name, error = %err, "collector run failed, deregistering");
                        return;
                    }
                    debug!(collector = %thread_name, "collector sample posted");
                    thread::sleep(schedule.next_delay(fulfillment()));
                }
            })
            .expect("failed to spawn collector thread");

        Self {
            name,
            stop,
            thread: Some(thread),
        }
    }

    /// This collector's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Permanently remove this collector from the scheduler. The in-flight
    /// `run_once`, if any, is allowed to complete.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_shortens_delay_under_high_demand() {
        let schedule = AdaptiveSchedule::new(Duration::from_millis(100));
        let high_demand = Fulfillment {
            provided: 100,
            used: 100,
            excess: 0,
        };
        let low_demand = Fulfillment {
            provided: 100,
            used: 1,
            excess: 99,
        };
        assert!(schedule.next_delay(high_demand) < schedule.next_delay(low_demand));
    }

    #[test]
    fn suspends_only_when_nothing_consumed() {
        let schedule = AdaptiveSchedule::new(Duration::from_millis(100));
        assert!(schedule.should_suspend(Fulfillment {
            provided: 10,
            used: 0,
            excess: 10,
        }));
        assert!(!schedule.should_suspend(Fulfillment {
            provided: 10,
            used: 5,
            excess: 5,
        }));
        assert!(!schedule.should_suspend(Fulfillment::default()));
    }

    #[test]
    fn without_suspend_never_suspends() {
        let schedule = AdaptiveSchedule::new(Duration::from_millis(100)).without_suspend();
        assert!(!schedule.should_suspend(Fulfillment {
            provided: 10,
            used: 0,
            excess: 10,
        }));
    }
}
