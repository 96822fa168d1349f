//! The Motion Model - a bouncing target between two hard stops.
//!
//! Each tick moves the simulated target by `BASE_STEP_MM + jitter` in the
//! current direction. Reaching either stop clamps the distance onto it and
//! reverses direction, which produces a triangular wave over `[5, 400]` mm.

use serde::{Deserialize, Serialize};

/// Closest the simulated target can get (mm).
pub const MIN_DISTANCE_MM: i32 = 5;

/// Farthest the simulated target can get (mm).
pub const MAX_DISTANCE_MM: i32 = 400;

/// Step size per tick before jitter (mm).
pub const BASE_STEP_MM: i32 = 15;

/// Direction the simulated target is travelling in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Distance grows each tick
    MovingAway,
    /// Distance shrinks each tick
    MovingCloser,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Direction::MovingAway => Direction::MovingCloser,
            Direction::MovingCloser => Direction::MovingAway,
        }
    }

    /// Short label for logs and exports.
    pub fn name(&self) -> &'static str {
        match self {
            Direction::MovingAway => "moving_away",
            Direction::MovingCloser => "moving_closer",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Advances the target by one tick.
///
/// Pure function: `(distance, direction, jitter) -> (distance', direction')`.
///
/// Reaching a stop in the direction of travel clamps onto it and reverses.
/// A distance that starts outside `[MIN_DISTANCE_MM, MAX_DISTANCE_MM]` (only
/// possible after fault injection) is pulled back into range without
/// reversing, so the post-tick bounds always hold.
pub fn advance(distance_mm: i32, direction: Direction, jitter_mm: i32) -> (i32, Direction) {
    let step = BASE_STEP_MM + jitter_mm;

    let (next, direction) = match direction {
        Direction::MovingAway => {
            let next = distance_mm.saturating_add(step);
            if next >= MAX_DISTANCE_MM {
                (MAX_DISTANCE_MM, Direction::MovingCloser)
            } else {
                (next, direction)
            }
        }
        Direction::MovingCloser => {
            let next = distance_mm.saturating_sub(step);
            if next <= MIN_DISTANCE_MM {
                (MIN_DISTANCE_MM, Direction::MovingAway)
            } else {
                (next, direction)
            }
        }
    };

    (next.clamp(MIN_DISTANCE_MM, MAX_DISTANCE_MM), direction)
}
