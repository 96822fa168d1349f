//! Lifecycle Manager - owns the sensor state and its scheduler.
//!
//! ```text
//!   Idle ──start()──► Running ──stop()──► Stopped
//! ```
//!
//! Any other transition is a programming error and is reported, never
//! ignored.

use crate::config::SensorConfig;
use crate::device::SensorDevice;
use crate::error::SensorError;
use crate::interface::SensorHandle;
use crate::scheduler::{Scheduler, Ticker};
use crate::state::{SensorReading, SharedState};

use mock_sensor_env::{EnvError, NoiseSource, SensorContext};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

enum Phase {
    Idle,
    Running {
        handle: SensorHandle,
        scheduler: Scheduler,
    },
    Stopped,
}

/// A mock distance sensor.
///
/// Generic over the context so the same sensor runs against the tokio timer
/// or the simulation's virtual clock.
pub struct MockSensor<Ctx: SensorContext> {
    context: Arc<Ctx>,
    noise: Arc<dyn NoiseSource>,
    config: SensorConfig,
    phase: Phase,
}

impl<Ctx: SensorContext> MockSensor<Ctx> {
    /// Creates a sensor in the not-started state.
    pub fn new(context: Arc<Ctx>, noise: Arc<dyn NoiseSource>, config: SensorConfig) -> Self {
        Self {
            context,
            noise,
            config,
            phase: Phase::Idle,
        }
    }

    /// Builds the state and arms the scheduler. Must be called from within a
    /// tokio runtime.
    ///
    /// An invalid configuration or a missing runtime aborts startup and
    /// leaves the sensor idle.
    pub fn start(&mut self) -> Result<SensorHandle, SensorError> {
        match self.phase {
            Phase::Idle => {}
            Phase::Running { .. } => return Err(SensorError::AlreadyStarted),
            Phase::Stopped => return Err(SensorError::AlreadyStopped),
        }

        self.config.validate()?;
        Handle::try_current()
            .map_err(|e| EnvError::ContextError(format!("no runtime to run the scheduler: {e}")))?;

        let state = SharedState::new(&self.config);
        let handle = SensorHandle::new(state.clone());
        let ticker = Ticker::new(state, Arc::clone(&self.noise));
        let scheduler = Scheduler::spawn(Arc::clone(&self.context), ticker, self.config.tick_period);

        info!(
            distance_mm = self.config.initial_distance_mm,
            direction = %self.config.initial_direction,
            period_ms = self.config.tick_period.as_millis() as u64,
            seed = self.context.seed(),
            "mock sensor started"
        );

        self.phase = Phase::Running {
            handle: handle.clone(),
            scheduler,
        };
        Ok(handle)
    }

    /// Deactivates the sensor and waits for the scheduler to finish.
    ///
    /// When this returns no tick is running and none will run again.
    /// Handles obtained earlier keep reading the final snapshot.
    pub async fn stop(&mut self) -> Result<(), SensorError> {
        let (handle, scheduler) = match std::mem::replace(&mut self.phase, Phase::Stopped) {
            Phase::Running { handle, scheduler } => (handle, scheduler),
            Phase::Idle => {
                self.phase = Phase::Idle;
                return Err(SensorError::NotStarted);
            }
            Phase::Stopped => return Err(SensorError::AlreadyStopped),
        };

        handle.deactivate();
        scheduler.stop().await?;

        let last = handle.read();
        info!(
            timestamp = last.timestamp,
            distance_mm = last.distance_mm,
            "mock sensor stopped"
        );
        Ok(())
    }

    /// Returns true between a successful `start()` and `stop()`.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// Returns the handle of the running sensor.
    pub fn handle(&self) -> Result<&SensorHandle, SensorError> {
        match &self.phase {
            Phase::Running { handle, .. } => Ok(handle),
            Phase::Idle => Err(SensorError::NotStarted),
            Phase::Stopped => Err(SensorError::AlreadyStopped),
        }
    }

    /// Reads the latest snapshot.
    pub fn read(&self) -> Result<SensorReading, SensorError> {
        Ok(self.handle()?.read())
    }

    /// Fault-injects a distance.
    pub fn inject_distance(&self, distance_mm: i32) -> Result<(), SensorError> {
        self.handle()?.inject_distance(distance_mm);
        Ok(())
    }

    /// Returns the transport-facing device for the running sensor.
    pub fn device(&self) -> Result<SensorDevice, SensorError> {
        Ok(SensorDevice::new(self.handle()?.clone()))
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::Direction;
    use crate::safety::StatusCode;
    use crate::motion::{MAX_DISTANCE_MM, MIN_DISTANCE_MM};
    use crate::safety::evaluate;
    use mock_sensor_env::{FixedNoise, TokioContext, UniformNoise};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn sensor(config: SensorConfig) -> MockSensor<TokioContext> {
        MockSensor::new(TokioContext::shared(), Arc::new(FixedNoise::zero()), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_read_stop() {
        let mut sensor = sensor(SensorConfig::default());
        let handle = sensor.start().unwrap();

        assert!(sensor.is_running());
        assert_eq!(handle.read().distance_mm, 100);

        tokio::time::sleep(Duration::from_millis(150)).await;
        let reading = sensor.read().unwrap();
        assert_eq!(reading.distance_mm, 115);
        assert_eq!(reading.timestamp, 100);

        sensor.stop().await.unwrap();
        assert!(!sensor.is_running());
        assert!(!handle.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_injection_staleness_window() {
        let config = SensorConfig::default().with_direction(Direction::MovingCloser);
        let mut sensor = sensor(config);
        let handle = sensor.start().unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(handle.read().distance_mm, 85);

        handle.inject_distance(3);
        let stale = handle.read();
        assert_eq!(stale.distance_mm, 3);
        assert_eq!(stale.status_code, StatusCode::Normal);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let fresh = handle.read();
        assert_eq!(fresh.distance_mm, 5);
        assert_eq!(fresh.status_code, StatusCode::EmergencyStop);

        sensor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let mut sensor = sensor(SensorConfig::default());
        let handle = sensor.start().unwrap();

        tokio::time::sleep(Duration::from_millis(420)).await;
        sensor.stop().await.unwrap();
        let frozen = handle.read();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.read(), frozen);
        assert_eq!(frozen.distance_mm, 160);
    }

    #[tokio::test]
    async fn test_invalid_calls_are_reported() {
        let mut sensor = sensor(SensorConfig::default());

        assert!(matches!(sensor.read(), Err(SensorError::NotStarted)));
        assert!(matches!(sensor.stop().await, Err(SensorError::NotStarted)));

        sensor.start().unwrap();
        assert!(matches!(sensor.start(), Err(SensorError::AlreadyStarted)));

        sensor.stop().await.unwrap();
        assert!(matches!(sensor.stop().await, Err(SensorError::AlreadyStopped)));
        assert!(matches!(sensor.start(), Err(SensorError::AlreadyStopped)));
        assert!(matches!(sensor.inject_distance(3), Err(SensorError::AlreadyStopped)));
    }

    #[tokio::test]
    async fn test_invalid_config_leaves_sensor_idle() {
        let mut sensor = sensor(SensorConfig::default().with_initial_distance(0));

        assert!(matches!(sensor.start(), Err(SensorError::InvalidConfig(_))));
        assert!(!sensor.is_running());
        assert!(matches!(sensor.read(), Err(SensorError::NotStarted)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_real_scheduler_under_contention() {
        const MARKERS: std::ops::Range<i32> = 1_000..2_000;

        let config = SensorConfig::default().with_tick_period(Duration::from_millis(1));
        let mut sensor = MockSensor::new(
            TokioContext::shared(),
            Arc::new(UniformNoise::seeded(7)),
            config,
        );
        let handle = sensor.start().unwrap();
        let done = AtomicBool::new(false);

        let torn: Vec<SensorReading> = std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let handle = handle.clone();
                    let done = &done;
                    scope.spawn(move || {
                        let mut bad = Vec::new();
                        let mut last_timestamp = 0;
                        while !done.load(Ordering::Acquire) {
                            let reading = handle.read();
                            let injected = MARKERS.contains(&reading.distance_mm);
                            let in_bounds = (MIN_DISTANCE_MM..=MAX_DISTANCE_MM)
                                .contains(&reading.distance_mm);
                            let status_matches = reading.status_code == evaluate(reading.distance_mm);

                            if !(injected || (in_bounds && status_matches))
                                || reading.timestamp < last_timestamp
                            {
                                bad.push(reading);
                            }
                            last_timestamp = reading.timestamp;
                        }
                        bad
                    })
                })
                .collect();

            let injectors: Vec<_> = (0..2)
                .map(|index| {
                    let handle = handle.clone();
                    let done = &done;
                    scope.spawn(move || {
                        let mut marker = index * 500;
                        while !done.load(Ordering::Acquire) {
                            handle.inject_distance(MARKERS.start + marker % 1_000);
                            marker += 1;
                            std::thread::yield_now();
                        }
                    })
                })
                .collect();

            std::thread::sleep(Duration::from_millis(100));
            done.store(true, Ordering::Release);

            for injector in injectors {
                injector.join().unwrap();
            }
            readers
                .into_iter()
                .flat_map(|reader| reader.join().unwrap())
                .collect()
        });

        assert!(torn.is_empty(), "inconsistent readings: {torn:?}");
        assert!(handle.read().timestamp > 0, "scheduler never ticked");

        tokio::time::timeout(Duration::from_secs(5), sensor.stop())
            .await
            .expect("stop deadlocked")
            .unwrap();

        let frozen = handle.read();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.read(), frozen);
    }

    #[test]
    fn test_start_outside_runtime_is_reported() {
        let mut sensor = sensor(SensorConfig::default());

        assert!(matches!(
            sensor.start(),
            Err(SensorError::Env(EnvError::ContextError(_)))
        ));
        assert!(!sensor.is_running());
        assert!(matches!(sensor.read(), Err(SensorError::NotStarted)));
    }
}
