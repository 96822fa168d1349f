//! JSON exporter for sensor traces.
//!
//! Exports per-tick frames so a trace can be plotted or diffed between seeds.

use mock_sensor_core::{Direction, SensorConfig, StatusCode, TickReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single tick of simulation data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Tick index (1-based)
    pub tick: u64,

    /// Timestamp written by the tick (ms)
    pub timestamp: u64,

    /// Distance after the tick (mm)
    pub distance_mm: i32,

    /// Status after the tick
    pub status: StatusCode,

    /// Direction after the tick
    pub direction: Direction,

    /// Set on the tick that followed a fault injection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub injected_mm: Option<i32>,
}

impl TraceFrame {
    pub fn from_report(tick: u64, report: &TickReport) -> Self {
        Self {
            tick,
            timestamp: report.reading.timestamp,
            distance_mm: report.reading.distance_mm,
            status: report.reading.status_code,
            direction: report.direction,
            injected_mm: None,
        }
    }
}

/// Complete trace export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Sensor configuration the run started from
    pub config: SensorConfig,

    /// All frames
    pub frames: Vec<TraceFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl TraceExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, config: SensorConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            config,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: TraceFrame) {
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
