//! Sensor configuration.

use crate::error::SensorError;
use crate::motion::{Direction, MAX_DISTANCE_MM, MIN_DISTANCE_MM};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Period between two scheduler ticks.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Distance the target starts at (mm).
pub const INITIAL_DISTANCE_MM: i32 = 100;

/// Configuration for a mock sensor instance.
///
/// Chosen once when the sensor is built; the device boundary never changes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Scheduler period (default: 100ms)
    #[serde(with = "duration_ms")]
    pub tick_period: Duration,

    /// Starting distance in mm (default: 100)
    pub initial_distance_mm: i32,

    /// Starting direction (default: moving away)
    pub initial_direction: Direction,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            tick_period: TICK_PERIOD,
            initial_distance_mm: INITIAL_DISTANCE_MM,
            initial_direction: Direction::MovingAway,
        }
    }
}

impl SensorConfig {
    /// Sets the starting direction.
    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.initial_direction = direction;
        self
    }

    /// Sets the starting distance.
    pub fn with_initial_distance(mut self, distance_mm: i32) -> Self {
        self.initial_distance_mm = distance_mm;
        self
    }

    /// Sets the tick period.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SensorError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SensorError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that a sensor state can be built from this configuration.
    pub fn validate(&self) -> Result<(), SensorError> {
        if self.tick_period.is_zero() {
            return Err(SensorError::invalid_config("tick period must be non-zero"));
        }

        if !(MIN_DISTANCE_MM..=MAX_DISTANCE_MM).contains(&self.initial_distance_mm) {
            return Err(SensorError::invalid_config(format!(
                "initial distance {}mm outside [{}, {}]",
                self.initial_distance_mm, MIN_DISTANCE_MM, MAX_DISTANCE_MM
            )));
        }

        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
