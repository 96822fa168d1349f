//! Polling monitor - the user-space consumer of the device.
//!
//! Every poll goes through the raw command path (`IOCTL_GET_DATA` into a
//! 12-byte buffer) and decodes the wire record into a `SensorSample`, the
//! same shape downstream business logic consumes.

use mock_sensor_core::{SensorDevice, TransportError, WireReading, IOCTL_GET_DATA};
use mock_sensor_env::{EnvError, SensorContext};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// How often the monitor samples the device.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Distances below this are reported as too close (mm).
pub const PROXIMITY_WARNING_MM: i32 = 50;

/// A decoded sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Device timestamp (low 32 bits of ms)
    pub t: u32,
    /// Distance (mm)
    pub dist: i32,
    /// Status code (0 = normal, 1 = emergency stop)
    pub st: i32,
    pub unit: String,
}

impl SensorSample {
    /// Decodes a wire buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, TransportError> {
        let wire = WireReading::from_le_bytes(bytes)?;
        Ok(Self {
            t: wire.timestamp,
            dist: wire.distance_mm,
            st: wire.status_code,
            unit: "mm".to_string(),
        })
    }

    /// Returns true when the target is inside the warning distance.
    pub fn is_too_close(&self) -> bool {
        self.dist < PROXIMITY_WARNING_MM
    }
}

/// Counters kept by a running monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub polls: u64,
    pub warnings: u64,
    pub failures: u64,
    pub last: Option<SensorSample>,
}

/// Samples the device once through the raw command path.
pub fn poll_once(device: &SensorDevice) -> Result<SensorSample, TransportError> {
    let mut buffer = [0u8; WireReading::SIZE];
    device.ioctl(IOCTL_GET_DATA, &mut buffer)?;
    SensorSample::decode(&buffer)
}

/// A background task polling the device at a fixed interval.
pub struct Monitor {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
    stats: Arc<Mutex<MonitorStats>>,
}

impl Monitor {
    /// Spawns the poll loop on `ctx`. The first poll happens one interval
    /// after this call.
    pub fn spawn<Ctx: SensorContext>(ctx: Arc<Ctx>, device: SensorDevice, interval: Duration) -> Self {
        let shutdown = Arc::new(Notify::new());
        let stats = Arc::new(Mutex::new(MonitorStats::default()));

        let signal = Arc::clone(&shutdown);
        let shared = Arc::clone(&stats);
        let clock = Arc::clone(&ctx);

        let handle = ctx.spawn("sensor-monitor", async move {
            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = clock.sleep(interval) => {}
                }

                let outcome = poll_once(&device);
                let mut stats = shared.lock().unwrap_or_else(|e| e.into_inner());
                stats.polls += 1;

                match outcome {
                    Ok(sample) => {
                        if sample.is_too_close() {
                            stats.warnings += 1;
                            warn!("Too close! Distance: {}mm", sample.dist);
                        } else {
                            let json = serde_json::to_string(&sample).unwrap_or_default();
                            info!(sample = %json, "sensor data");
                        }
                        stats.last = Some(sample);
                    }
                    Err(e) => {
                        stats.failures += 1;
                        error!(errno = e.errno(), "device poll failed: {}", e);
                    }
                }
            }
        });

        Self {
            shutdown,
            handle,
            stats,
        }
    }

    /// Returns a copy of the counters so far.
    pub fn stats(&self) -> MonitorStats {
        self.stats.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Stops polling and waits for the task to return.
    pub async fn stop(self) -> Result<MonitorStats, EnvError> {
        let Self {
            shutdown,
            handle,
            stats,
        } = self;

        shutdown.notify_one();
        handle.await?;
        let stats = stats.lock().unwrap_or_else(|e| e.into_inner()).clone();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock_sensor_core::{SensorConfig, SensorHandle, SharedState};
    use mock_sensor_env::TokioContext;

    fn device() -> SensorDevice {
        SensorDevice::new(SensorHandle::new(SharedState::new(&SensorConfig::default())))
    }

    #[test]
    fn test_poll_once_decodes_the_wire_record() {
        let sample = poll_once(&device()).unwrap();

        assert_eq!(
            sample,
            SensorSample {
                t: 0,
                dist: 100,
                st: 0,
                unit: "mm".to_string(),
            }
        );
        assert!(!sample.is_too_close());
    }

    #[test]
    fn test_sample_json_shape() {
        let sample = poll_once(&device()).unwrap();
        let json = serde_json::to_value(&sample).unwrap();

        assert_eq!(json, serde_json::json!({ "t": 0, "dist": 100, "st": 0, "unit": "mm" }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_polls_and_warns() {
        let device = device();
        let monitor = Monitor::spawn(TokioContext::shared(), device.clone(), POLL_INTERVAL);

        tokio::time::sleep(Duration::from_millis(1_200)).await;
        device.set_mock_distance(20);
        tokio::time::sleep(Duration::from_millis(500)).await;

        let stats = monitor.stop().await.unwrap();
        assert_eq!(stats.polls, 3);
        assert_eq!(stats.warnings, 1);
        assert_eq!(stats.failures, 0);
        assert_eq!(stats.last.map(|s| s.dist), Some(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_returns_final_stats() {
        let device = device();
        let monitor = Monitor::spawn(TokioContext::shared(), device.clone(), POLL_INTERVAL);

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let live = monitor.stats();
        let stopped = monitor.stop().await.unwrap();

        assert_eq!(stopped, live);
        assert_eq!(stopped.polls, 2);
        assert_eq!(stopped.last.map(|s| s.dist), Some(100));
    }
}
