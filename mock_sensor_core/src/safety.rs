//! The Safety Evaluator - derives the status code from a distance.
//!
//! The trip is stateless: every tick recomputes the status from the current
//! distance alone. There is no hysteresis and no latch, so a target hovering
//! around the threshold flips between the two states tick by tick.

use serde::{Deserialize, Serialize};
use tracing::error;

/// Distances strictly below this trip the emergency stop (mm).
pub const TRIP_THRESHOLD_MM: i32 = 10;

/// Safety status published with every reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    /// Target at a safe distance
    #[default]
    Normal,
    /// Target inside the trip threshold; motor must be stopped
    EmergencyStop,
}

impl StatusCode {
    /// Wire value: 0 = normal, 1 = emergency stop.
    pub fn code(self) -> i32 {
        match self {
            StatusCode::Normal => 0,
            StatusCode::EmergencyStop => 1,
        }
    }

    /// Parses a wire value.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(StatusCode::Normal),
            1 => Some(StatusCode::EmergencyStop),
            _ => None,
        }
    }

    /// Returns true for `EmergencyStop`.
    pub fn is_emergency(self) -> bool {
        self == StatusCode::EmergencyStop
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Normal => write!(f, "normal"),
            StatusCode::EmergencyStop => write!(f, "emergency_stop"),
        }
    }
}

/// Maps a distance to its status. Pure.
pub fn evaluate(distance_mm: i32) -> StatusCode {
    if distance_mm < TRIP_THRESHOLD_MM {
        StatusCode::EmergencyStop
    } else {
        StatusCode::Normal
    }
}

/// Emits the safety audit event for a freshly evaluated status.
///
/// Called once per tick; an emergency is logged on every tick it holds.
pub fn report(distance_mm: i32, status: StatusCode) {
    if status.is_emergency() {
        error!(
            distance_mm,
            threshold_mm = TRIP_THRESHOLD_MM,
            "[SAFETY CRITICAL] distance below trip threshold, motor stopped"
        );
    }
}
