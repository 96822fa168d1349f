//! Simulation context implementing SensorContext for deterministic testing.

use crate::noise::SeededNoise;
use async_trait::async_trait;
use mock_sensor_env::SensorContext;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Simulation context backed by a virtual clock.
///
/// This implements `SensorContext` using:
/// - A virtual clock that can be advanced manually
/// - Simulated sleep that advances virtual time and yields to the runtime
/// - A master seed from which the noise source is derived
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.clock();
        *time = time.saturating_add(duration.as_nanos() as u64);
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&self, time_ns: u64) {
        *self.clock() = time_ns;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.clock()
    }

    /// Derives the noise source for this run.
    ///
    /// Salted so that the noise stream differs from anything else seeded
    /// with the master seed.
    pub fn noise(&self) -> SeededNoise {
        SeededNoise::new(self.seed.wrapping_mul(0x9e3779b97f4a7c15))
    }

    fn clock(&self) -> std::sync::MutexGuard<'_, u64> {
        self.virtual_time_ns.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clone for SimContext {
    fn clone(&self) -> Self {
        Self {
            seed: self.seed,
            virtual_time_ns: Arc::clone(&self.virtual_time_ns),
        }
    }
}

#[async_trait]
impl SensorContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        // Virtual time jumps forward; yielding lets other tasks observe it
        self.advance_time(duration);
        tokio::task::yield_now().await;
    }

    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        tracing::trace!(task = name, seed = self.seed, "spawning simulated task");
        tokio::spawn(future)
    }

    fn seed(&self) -> u64 {
        self.seed
    }
}
