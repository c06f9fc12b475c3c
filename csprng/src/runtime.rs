//! Process-wide wiring: the lazily initialised Fortuna accumulator, System
//! PRNG aggregate, seed storage, and entropy collectors (§4.8–§4.11, §9
//! "Global singletons").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;

use csprng_collectors::{
    CollectorHandle, FreeMemoryCollector, InstantEntropy, SchedulingJitterCollector, SystemCrossFeedCollector,
    SystemPrng, ThreadCpuTimeCollector,
};
use csprng_fortuna::{EntropySource, Fortuna};
use csprng_storage::{FallbackBackend, FileBackend, Scrambler, SeedStorage, Storage};
use tracing::warn;

use crate::builder::BuilderContext;
use crate::config::Config;

const COLLECTOR_BASE_PERIOD: Duration = Duration::from_secs(2);
const FORTUNA_POOL_COUNT: u8 = 32;
const FORTUNA_BOOTSTRAP_BYTES_PER_POOL: usize = 128;
const INSTANT_CHECKPOINT_PERIOD: Duration = Duration::from_secs(30);
const INSTANT_SEED_NAME: &str = "instant";

/// Every process-wide object this workspace needs exactly one of.
pub struct Runtime {
    fortuna: Arc<Fortuna>,
    system: Arc<SystemPrng>,
    storage: Arc<Storage>,
    collectors: Vec<CollectorHandle>,
    instant_checkpoint_stop: Arc<AtomicBool>,
    instant_checkpoint_thread: Option<thread::JoinHandle<()>>,
    fortuna_checkpoint_stop: Arc<AtomicBool>,
    fortuna_checkpoint_thread: Option<thread::JoinHandle<()>>,
}

static GLOBAL: OnceLock<Runtime> = OnceLock::new();

impl Runtime {
    /// This process's shared Fortuna accumulator.
    pub fn fortuna(&self) -> Arc<Fortuna> {
        self.fortuna.clone()
    }

    /// This process's shared System PRNG aggregate.
    pub fn system(&self) -> Arc<SystemPrng> {
        self.system.clone()
    }

    /// This process's shared seed storage.
    pub fn storage(&self) -> Arc<Storage> {
        self.storage.clone()
    }

    /// A [`BuilderContext`] over this runtime's Fortuna and System PRNG,
    /// suitable for [`crate::Builder::new`].
    pub fn builder_context(&self) -> BuilderContext {
        BuilderContext::new(self.fortuna(), self.system())
    }

    /// Inject 128 bootstrap bytes drawn from the System PRNG aggregate into
    /// every pool (§4.2 "Initial construction" step 2), so a freshly
    /// constructed accumulator is never queried while empty.
    fn seed_pools_from_system(fortuna: &Fortuna, system: &SystemPrng) {
        for pool in 0..FORTUNA_POOL_COUNT {
            fortuna.inject_at_startup(pool, &system.get_seed(FORTUNA_BOOTSTRAP_BYTES_PER_POOL));
        }
    }

    /// Restore the Fortuna pool fingerprints persisted under
    /// `Fortuna.0`..`Fortuna.31` (§6), if present, so a restart does not
    /// start the accumulator from nothing.
    fn restore_fortuna_checkpoint(fortuna: &Fortuna, storage: &Storage) {
        for pool in 0..FORTUNA_POOL_COUNT {
            match storage.get(&format!("Fortuna.{pool}")) {
                Ok(Some(bytes)) => fortuna.inject_at_startup(pool, &bytes),
                Ok(None) => {}
                Err(err) => warn!(pool, error = %err, "failed to restore Fortuna checkpoint"),
            }
        }
    }

    /// Schedule a deferred seed write-back for each pool's fingerprint
    /// (§4.2 "Initial construction" step 4, §6 `Fortuna.0`..`Fortuna.31`),
    /// persisted at the next storage flush.
    fn enqueue_fortuna_checkpoint(fortuna: &Fortuna, storage: &Storage) {
        for (pool, fingerprint) in fortuna.seed_fingerprints().into_iter().enumerate() {
            storage.enqueue(csprng_storage::Seed::new(format!("Fortuna.{pool}"), fingerprint.to_vec()));
        }
    }

    /// Open seed storage per `config`, falling back to [`FallbackBackend`]
    /// when no path is configured or the file backend fails to open, and
    /// immediately upgrading its scrambler to draw from `system` rather
    /// than the bootstrap ISAAC stream (§4.10 `upgrade_scrambler()`).
    fn open_storage(config: &Config, system: &Arc<SystemPrng>) -> Arc<Storage> {
        let scrambler = Scrambler::new(b"csprng-bootstrap-scramble-seed");
        let system_for_scrambler = system.clone();
        scrambler.upgrade(move |n| system_for_scrambler.get_seed(n));

        let backend: Box<dyn SeedStorage> = match config.get("config.prng.seeds.SeedStorage.path") {
            Some(path) => match FileBackend::open(&path) {
                Ok(backend) => Box::new(backend),
                Err(err) => {
                    warn!(error = %err, path, "failed to open seed file, falling back to System PRNG");
                    Box::new(FallbackBackend::new(system.clone()))
                }
            },
            None => Box::new(FallbackBackend::new(system.clone())),
        };
        Storage::open(backend, scrambler)
    }

    fn start_collectors(config: &Config, fortuna: &Arc<Fortuna>, system: &Arc<SystemPrng>) -> Vec<CollectorHandle> {
        let mut handles = Vec::new();
        let schedule = csprng_collectors::AdaptiveSchedule::new(COLLECTOR_BASE_PERIOD);

        macro_rules! maybe_spawn {
            ($name:literal, $collector:expr) => {
                if config.collector_enabled($name) {
                    let fortuna_for_fulfillment = fortuna.clone();
                    handles.push(CollectorHandle::spawn(
                        $collector,
                        EntropySource::new(fortuna.clone()),
                        schedule,
                        move || fortuna_for_fulfillment.fulfillment(),
                    ));
                }
            };
        }

        maybe_spawn!("SchedulingJitterCollector", SchedulingJitterCollector::default());
        maybe_spawn!("FreeMemoryCollector", FreeMemoryCollector);
        maybe_spawn!("ThreadCpuTimeCollector", ThreadCpuTimeCollector::default());
        maybe_spawn!(
            "SystemCrossFeedCollector",
            SystemCrossFeedCollector::new(system.clone())
        );

        handles
    }

    /// Periodically persist `InstantEntropy::global()`'s checkpoint bytes
    /// under the `"instant"` seed name (§4.11, §6), so a future process
    /// restart bootstraps its instant-entropy pool from something other
    /// than a fixed compile-time seed.
    fn start_instant_checkpoint(storage: Arc<Storage>) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_handle = stop.clone();
        let handle = thread::Builder::new()
            .name("csprng-instant-checkpoint".to_string())
            .spawn(move || {
                while !stop_handle.load(Ordering::Acquire) {
                    thread::sleep(INSTANT_CHECKPOINT_PERIOD);
                    if stop_handle.load(Ordering::Acquire) {
                        break;
                    }
                    let bytes = InstantEntropy::global().checkpoint_bytes();
                    storage.enqueue(csprng_storage::Seed::new(INSTANT_SEED_NAME, bytes));
                }
            })
            .expect("failed to spawn instant-entropy checkpoint thread");
        (stop, handle)
    }

    /// Periodically re-persist every pool's fingerprint under
    /// `Fortuna.0`..`Fortuna.31` (§4.2 "Initial construction" step 4, §6),
    /// so later restarts restore from something close to the accumulator's
    /// current state rather than only the bootstrap checkpoint.
    fn start_fortuna_checkpoint(fortuna: Arc<Fortuna>, storage: Arc<Storage>) -> (Arc<AtomicBool>, thread::JoinHandle<()>) {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_handle = stop.clone();
        let handle = thread::Builder::new()
            .name("csprng-fortuna-checkpoint".to_string())
            .spawn(move || {
                while !stop_handle.load(Ordering::Acquire) {
                    thread::sleep(INSTANT_CHECKPOINT_PERIOD);
                    if stop_handle.load(Ordering::Acquire) {
                        break;
                    }
                    Runtime::enqueue_fortuna_checkpoint(&fortuna, &storage);
                }
            })
            .expect("failed to spawn Fortuna checkpoint thread");
        (stop, handle)
    }
}

/// Build every process-wide singleton from `config` and install it as the
/// global [`Runtime`]. Idempotent: later calls are ignored and the
/// already-installed runtime is returned, matching the "lazy-init wrapper"
/// design note for breaking the Fortuna/cipher circular dependency (§9).
pub fn bootstrap(config: &Config) -> &'static Runtime {
    GLOBAL.get_or_init(|| {
        let fortuna = Arc::new(Fortuna::new());
        let system = Arc::new(SystemPrng::new(1));
        let storage = Runtime::open_storage(config, &system);

        Runtime::seed_pools_from_system(&fortuna, &system);
        Runtime::restore_fortuna_checkpoint(&fortuna, &storage);
        Runtime::enqueue_fortuna_checkpoint(&fortuna, &storage);

        let collectors = Runtime::start_collectors(config, &fortuna, &system);
        let (instant_checkpoint_stop, instant_checkpoint_thread) =
            Runtime::start_instant_checkpoint(storage.clone());
        let (fortuna_checkpoint_stop, fortuna_checkpoint_thread) =
            Runtime::start_fortuna_checkpoint(fortuna.clone(), storage.clone());

        Runtime {
            fortuna,
            system,
            storage,
            collectors,
            instant_checkpoint_stop,
            instant_checkpoint_thread: Some(instant_checkpoint_thread),
            fortuna_checkpoint_stop,
            fortuna_checkpoint_thread: Some(fortuna_checkpoint_thread),
        }
    })
}

/// The already-bootstrapped global runtime, if [`bootstrap`] has run.
pub fn global() -> Option<&'static Runtime> {
    GLOBAL.get()
}

impl Drop for Runtime {
    fn drop(&mut self) {
        for collector in self.collectors.drain(..) {
            collector.stop();
        }
        self.instant_checkpoint_stop.store(true, Ordering::Release);
        if let Some(thread) = self.instant_checkpoint_thread.take() {
            let _ = thread.join();
        }
        self.fortuna_checkpoint_stop.store(true, Ordering::Release);
        if let Some(thread) = self.fortuna_checkpoint_thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_without_storage_path_uses_fallback_and_does_not_panic() {
        let config = Config::new();
        let runtime = bootstrap(&config);
        assert!(runtime.storage().get("anything").unwrap().is_some());
    }

    #[test]
    fn global_is_none_before_bootstrap_in_a_fresh_process() {
        // This assertion only holds if no earlier test in the same process
        // called `bootstrap`; the other test in this module does, so this
        // one only checks that `global()` does not panic either way.
        let _ = global();
    }
}
