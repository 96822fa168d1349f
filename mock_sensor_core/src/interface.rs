//! Query/Control Interface - what callers may do with a running sensor.
//!
//! Exactly two operations: read the latest reading, and force the distance
//! (fault injection). Both take the same lock as the scheduler tick.
//!
//! # Staleness window
//!
//! `inject_distance` overwrites the distance only. Status and direction are
//! left as the last tick wrote them, so a read taken right after injecting a
//! sub-threshold value still reports `Normal`. The next tick (at most one
//! period later) recomputes the status from the injected value.

use crate::motion::Direction;
use crate::state::{SensorReading, SharedState};
use tracing::info;

/// Cloneable handle for concurrent readers and fault injectors.
#[derive(Debug, Clone)]
pub struct SensorHandle {
    state: SharedState,
}

impl SensorHandle {
    /// Creates a handle onto `state`.
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Copies the latest reading out. All three fields come from the same
    /// critical section.
    pub fn read(&self) -> SensorReading {
        self.state.with(|state| state.reading)
    }

    /// Overwrites the simulated distance. Status is recomputed by the next
    /// tick, not here.
    pub fn inject_distance(&self, distance_mm: i32) {
        self.state.with(|state| state.reading.distance_mm = distance_mm);
        info!(distance_mm, "manual distance set");
    }

    /// Current direction of travel (diagnostics only).
    pub fn direction(&self) -> Direction {
        self.state.with(|state| state.direction)
    }

    /// Returns false once the sensor has been shut down.
    pub fn is_active(&self) -> bool {
        self.state.with(|state| state.active)
    }

    pub(crate) fn deactivate(&self) {
        self.state.with(|state| state.active = false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use crate::safety::StatusCode;
    use crate::scheduler::Ticker;
    use mock_sensor_env::FixedNoise;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_read_returns_initial_snapshot() {
        let handle = SensorHandle::new(SharedState::new(&SensorConfig::default()));

        let reading = handle.read();
        assert_eq!(reading.distance_mm, 100);
        assert_eq!(reading.status_code, StatusCode::Normal);
        assert_eq!(reading.timestamp, 0);
    }

    #[test]
    fn test_injection_touches_distance_only() {
        let state = SharedState::new(&SensorConfig::default());
        let handle = SensorHandle::new(state.clone());
        let before = state.snapshot();

        handle.inject_distance(3);

        let after = state.snapshot();
        assert_eq!(after.reading.distance_mm, 3);
        assert_eq!(after.reading.status_code, before.reading.status_code);
        assert_eq!(after.reading.timestamp, before.reading.timestamp);
        assert_eq!(after.direction, before.direction);
        assert_eq!(after.active, before.active);
    }

    #[test]
    fn test_injected_value_is_stale_until_next_tick() {
        let config = SensorConfig::default().with_direction(Direction::MovingCloser);
        let state = SharedState::new(&config);
        let handle = SensorHandle::new(state.clone());
        let ticker = Ticker::new(state, Arc::new(FixedNoise::zero()));

        ticker.tick(Duration::from_millis(100));
        handle.inject_distance(3);

        let stale = handle.read();
        assert_eq!(stale.distance_mm, 3);
        assert_eq!(stale.status_code, StatusCode::Normal);

        ticker.tick(Duration::from_millis(200));

        let fresh = handle.read();
        assert_eq!(fresh.distance_mm, 5);
        assert_eq!(fresh.status_code, StatusCode::EmergencyStop);
        assert_eq!(handle.direction(), Direction::MovingAway);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_readings() {
        let state = SharedState::new(&SensorConfig::default());
        let handle = SensorHandle::new(state.clone());
        let ticker = Ticker::new(state, Arc::new(FixedNoise::new(1)));

        std::thread::scope(|scope| {
            let readers: Vec<_> = (0..4)
                .map(|_| {
                    let handle = handle.clone();
                    scope.spawn(move || {
                        for _ in 0..2_000 {
                            let reading = handle.read();
                            assert_eq!(
                                reading.status_code.is_emergency(),
                                reading.distance_mm < 10,
                                "torn reading {reading:?}"
                            );
                        }
                    })
                })
                .collect();

            for tick in 1..=500u64 {
                ticker.tick(Duration::from_millis(tick * 100));
            }

            for reader in readers {
                reader.join().unwrap();
            }
        });
    }
}
