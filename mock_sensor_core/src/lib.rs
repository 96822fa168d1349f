//! Mock Distance Sensor Core
//!
//! A simulated distance sensor for exercising a safety-critical control path:
//! 1. **Motion Model**: the target bounces between 5mm and 400mm with jitter
//! 2. **Safety Evaluator**: below 10mm the status trips to emergency stop
//! 3. **Concurrency**: a periodic scheduler, concurrent readers and a fault
//!    injector all share one mutex-guarded record
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  MockSensor (lifecycle)                  │
//! │                                                          │
//! │   Scheduler ──tick──► Ticker ──┐                         │
//! │   (every 100ms)                ▼                         │
//! │                        SharedState (Mutex)               │
//! │                                ▲                         │
//! │   SensorHandle ──read/inject───┘                         │
//! │        ▲                                                 │
//! │   SensorDevice (ioctl-style boundary, WireReading)       │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod interface;
pub mod lifecycle;
pub mod motion;
pub mod safety;
pub mod scheduler;
pub mod state;
pub mod wire;

// Re-export key types for convenience
pub use config::SensorConfig;
pub use device::{SensorDevice, IOCTL_GET_DATA, IOCTL_SET_MOCK_DISTANCE};
pub use error::{SensorError, TransportError};
pub use interface::SensorHandle;
pub use lifecycle::MockSensor;
pub use motion::Direction;
pub use safety::StatusCode;
pub use scheduler::{Scheduler, TickReport, Ticker};
pub use state::{SensorReading, SensorState, SharedState};
pub use wire::WireReading;
