//! Sensor State - the single shared record and its guard.

use crate::config::SensorConfig;
use crate::motion::Direction;
use crate::safety::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

/// One published reading. Copied out whole on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SensorReading {
    /// Milliseconds since the sensor context started, as of the last tick
    pub timestamp: u64,

    /// Simulated distance to the target (mm)
    pub distance_mm: i32,

    /// Safety status computed by the last tick
    pub status_code: StatusCode,
}

/// The mutable sensor record.
///
/// Mutated only by the scheduler tick and by fault injection, both under
/// the `SharedState` lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorState {
    pub reading: SensorReading,
    pub direction: Direction,
    /// Cleared on shutdown; the scheduler stops rearming once it sees false
    pub active: bool,
}

impl SensorState {
    /// Builds the initial record.
    pub fn new(config: &SensorConfig) -> Self {
        Self {
            reading: SensorReading {
                timestamp: 0,
                distance_mm: config.initial_distance_mm,
                status_code: StatusCode::Normal,
            },
            direction: config.initial_direction,
            active: true,
        }
    }
}

/// Guarded handle onto the one `SensorState` of a sensor instance.
///
/// Clones share the same record. Every accessor holds the lock only for
/// the duration of a closure that does no I/O.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Mutex<SensorState>>,
}

impl SharedState {
    /// Wraps a fresh record built from `config`.
    pub fn new(config: &SensorConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SensorState::new(config))),
        }
    }

    /// Runs `f` with exclusive access to the record.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut SensorState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Copies the whole record out.
    pub fn snapshot(&self) -> SensorState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, SensorState> {
        // Every critical section writes plain values, so a poisoned lock
        // still guards a consistent record.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
