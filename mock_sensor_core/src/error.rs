//! Error types for the sensor core and its transport boundary.

use mock_sensor_env::EnvError;
use thiserror::Error;

/// errno reported for a failed copy to/from the caller's buffer.
pub const EFAULT: i32 = 14;

/// errno reported for an unknown command.
pub const EINVAL: i32 = 22;

/// Lifecycle and startup errors.
#[derive(Debug, Error)]
pub enum SensorError {
    /// Operation needs a running sensor but `start()` was never called
    #[error("Sensor not started")]
    NotStarted,

    /// `start()` called on a running sensor
    #[error("Sensor already started")]
    AlreadyStarted,

    /// `stop()` (or `start()`) called after the sensor was shut down
    #[error("Sensor already stopped")]
    AlreadyStopped,

    /// State could not be initialised from the configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The environment failed (scheduler task panicked, ...)
    #[error("Environment error: {0}")]
    Env(#[from] EnvError),
}

impl SensorError {
    /// Creates a configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Errors raised while marshalling data across the device boundary.
///
/// None of these ever leaves the sensor state partially updated: reads copy
/// a snapshot taken under the lock, writes decode their argument before the
/// lock is taken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Caller buffer too small for the transfer
    #[error("Bad address: transfer needs {needed} bytes, caller supplied {supplied}")]
    Fault { needed: usize, supplied: usize },

    /// Command number not recognised
    #[error("Invalid command 0x{0:08x}")]
    InvalidCommand(u32),

    /// Wire record carried an unknown status code
    #[error("Invalid status code {0}")]
    InvalidStatus(i32),
}

impl TransportError {
    /// Negative errno, as an ioctl handler would return it.
    pub fn errno(&self) -> i32 {
        match self {
            TransportError::Fault { .. } => -EFAULT,
            TransportError::InvalidCommand(_) | TransportError::InvalidStatus(_) => -EINVAL,
        }
    }
}
