//! Simulation context implementing ReckonContext for deterministic runs.

use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use reckon_env::ReckonContext;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 2024-01-01 00:00:00 UTC
const DEFAULT_EPOCH_SECS: u64 = 1_704_067_200;

/// Simulation context backed by a virtual clock and a seeded RNG.
///
/// - Time moves only through `advance_time`, `set_time` or `sleep`
/// - `system_time()` is the epoch plus virtual time
/// - Jitter and noise draw from one ChaCha8 stream
pub struct SimContext {
    seed: u64,

    /// Virtual time in nanoseconds since the epoch
    virtual_time_ns: Arc<Mutex<u64>>,

    rng: Arc<Mutex<ChaCha8Rng>>,

    /// Wall-clock time at virtual time 0
    epoch: SystemTime,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SimContext {
    pub fn new(seed: u64) -> Self {
        Self::with_epoch(seed, UNIX_EPOCH + Duration::from_secs(DEFAULT_EPOCH_SECS))
    }

    /// Context whose virtual time 0 is `epoch`.
    pub fn with_epoch(seed: u64, epoch: SystemTime) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
            epoch,
        }
    }

    /// Saturates at `u64::MAX` nanoseconds.
    pub fn advance_time(&self, duration: Duration) {
        let step = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        let mut time = locked(&self.virtual_time_ns);
        *time = time.saturating_add(step);
    }

    pub fn set_time(&self, time_ns: u64) {
        *locked(&self.virtual_time_ns) = time_ns;
    }

    pub fn time_ns(&self) -> u64 {
        *locked(&self.virtual_time_ns)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn epoch(&self) -> SystemTime {
        self.epoch
    }

    /// Runs `f` with exclusive access to the shared RNG.
    pub fn with_rng<R>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> R) -> R {
        f(&mut locked(&self.rng))
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
            rng: Arc::clone(&self.rng),
            epoch: self.epoch,
        }
    }
}

#[async_trait]
impl ReckonContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    fn system_time(&self) -> SystemTime {
        self.epoch + self.now()
    }

    async fn sleep(&self, duration: Duration) {
        // Sleeping advances virtual time instead of waiting
        self.advance_time(duration);
    }
}
