//! Noise sources for the simulated sensor.
//!
//! Every tick perturbs the step size by a small jitter in `0..=MAX_JITTER_MM`.
//! The source is a trait object so tests can pin it to a constant.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Largest jitter (in millimetres) a noise source may return.
pub const MAX_JITTER_MM: i32 = 4;

/// Supplies one bounded jitter value per tick.
///
/// Implementations must return a value in `0..=MAX_JITTER_MM`; callers clamp
/// anyway, so an out-of-range draw can never widen the step.
pub trait NoiseSource: Send + Sync {
    /// Draws the jitter for the next tick.
    fn draw(&self) -> i32;
}

/// Uniform jitter over `0..=MAX_JITTER_MM`, independent per draw.
pub struct UniformNoise {
    rng: Mutex<StdRng>,
}

impl UniformNoise {
    /// Creates a source seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl NoiseSource for UniformNoise {
    fn draw(&self) -> i32 {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        rng.gen_range(0..=MAX_JITTER_MM)
    }
}

/// Constant jitter, for deterministic traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedNoise(i32);

impl FixedNoise {
    /// Creates a source that always returns `jitter`, clamped into range.
    pub fn new(jitter: i32) -> Self {
        Self(jitter.clamp(0, MAX_JITTER_MM))
    }

    /// A source with no jitter at all.
    pub fn zero() -> Self {
        Self(0)
    }
}

impl NoiseSource for FixedNoise {
    fn draw(&self) -> i32 {
        self.0
    }
}
