//! Periodic Scheduler - the background tick that drives the simulation.
//!
//! ```text
//!   spawn ──► ACTIVE ──sleep(period)──► tick ──rearm?──┐
//!               ▲                                      │ yes
//!               └──────────────────────────────────────┘
//!               │ stop(): active=false + notify, await task
//!               ▼
//!            stopped (task returned, never runs again)
//! ```

use crate::motion::{self, Direction};
use crate::safety;
use crate::state::{SensorReading, SharedState};

use mock_sensor_env::{EnvError, NoiseSource, SensorContext, MAX_JITTER_MM};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Reading published by this tick
    pub reading: SensorReading,

    /// Direction after this tick
    pub direction: Direction,

    /// False once the sensor has been deactivated
    pub rearm: bool,
}

/// The tick body: motion, safety evaluation and state write under one lock.
///
/// Separate from `Scheduler` so the simulation harness can drive ticks from
/// a virtual clock.
pub struct Ticker {
    state: SharedState,
    noise: Arc<dyn NoiseSource>,
}

impl Ticker {
    /// Creates a ticker writing into `state`.
    pub fn new(state: SharedState, noise: Arc<dyn NoiseSource>) -> Self {
        Self { state, noise }
    }

    /// Runs one update cycle, stamping the reading with `now`.
    ///
    /// A deactivated state is left untouched.
    pub fn tick(&self, now: Duration) -> TickReport {
        let report = self.state.with(|state| {
            if !state.active {
                return TickReport {
                    reading: state.reading,
                    direction: state.direction,
                    rearm: false,
                };
            }

            let jitter = self.noise.draw().clamp(0, MAX_JITTER_MM);
            let (distance_mm, direction) =
                motion::advance(state.reading.distance_mm, state.direction, jitter);
            let status_code = safety::evaluate(distance_mm);

            state.reading = SensorReading {
                timestamp: state.reading.timestamp.max(now.as_millis() as u64),
                distance_mm,
                status_code,
            };
            state.direction = direction;

            TickReport {
                reading: state.reading,
                direction,
                rearm: true,
            }
        });

        if report.rearm {
            safety::report(report.reading.distance_mm, report.reading.status_code);
            debug!(
                timestamp = report.reading.timestamp,
                distance_mm = report.reading.distance_mm,
                status = %report.reading.status_code,
                direction = %report.direction,
                "tick"
            );
        }

        report
    }
}

/// A running periodic task that ticks a `Ticker` every `period`.
pub struct Scheduler {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    /// Spawns the periodic task on `ctx`. The first tick fires one period
    /// after this call.
    pub fn spawn<Ctx: SensorContext>(ctx: Arc<Ctx>, ticker: Ticker, period: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let signal = Arc::clone(&shutdown);
        let clock = Arc::clone(&ctx);

        let handle = ctx.spawn("sensor-scheduler", async move {
            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = clock.sleep(period) => {}
                }

                if !ticker.tick(clock.now()).rearm {
                    break;
                }
            }
            debug!("scheduler task exited");
        });

        Self { shutdown, handle }
    }

    /// Returns true while the periodic task has not returned.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stops the task and waits for it to return.
    ///
    /// The caller is expected to have cleared `active` first so a tick that
    /// already woke up will not rearm. Once this resolves no tick is in
    /// flight and none will ever run again.
    pub async fn stop(self) -> Result<(), EnvError> {
        self.shutdown.notify_one();
        self.handle.await?;
        Ok(())
    }
}
