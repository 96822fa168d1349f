//! Mock Sensor Deterministic Simulation Harness
//!
//! This crate drives the sensor core in a controlled environment where
//! every trace is reproducible from one 64-bit seed.
//!
//! # Core Principle
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: Virtual clock advanced per tick (or by the scheduler's sleep)
//! - **Noise**: ChaCha8 stream derived from the master seed
//! - **Concurrency**: Reader/injector threads checked against every
//!   snapshot the tick published
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    ScenarioRunner                     │
//! │  ┌─────────────┐   tick(now)   ┌───────────────────┐  │
//! │  │ SimContext  │──────────────►│ Ticker / MockSensor│  │
//! │  │ (virtual    │               └─────────┬─────────┘  │
//! │  │  clock)     │                         │            │
//! │  └─────────────┘              SensorHandle / Device   │
//! │                                          │            │
//! │        TraceExport ◄── frames      Monitor (polling)  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use mock_sensor_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).with_ticks(600).run(ScenarioId::Bounce);
//! assert!(result.passed);
//! ```

mod context;
mod exporter;
pub mod monitor;
mod noise;
mod runner;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{TraceExport, TraceFrame};
pub use monitor::{Monitor, MonitorStats, SensorSample};
pub use noise::SeededNoise;
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
