//! Core environment context trait for the mock sensor.

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// The central interface for Environment Interaction.
///
/// This trait abstracts the clock and the task executor so that the sensor
/// scheduler can run against the real tokio timer in production and against
/// a virtual clock in the simulation harness.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` - virtual clock advanced by `sleep`
#[async_trait]
pub trait SensorContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// The scheduler stamps every reading with this value (in milliseconds),
    /// so it plays the role of the kernel's jiffies counter.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task and hands back its join handle.
    ///
    /// The handle is awaited on shutdown; once it resolves the task has
    /// returned and will never run again.
    fn spawn<F>(&self, name: &str, future: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static;

    /// Returns the context's seed (for logging/debugging).
    ///
    /// In production, returns 0 (not seeded).
    /// In simulation, returns the master seed.
    fn seed(&self) -> u64;
}
