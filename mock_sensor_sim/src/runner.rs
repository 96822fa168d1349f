//! Scenario runner - executes the sensor test scenarios.

use crate::context::SimContext;
use crate::exporter::{TraceExport, TraceFrame};
use crate::scenarios::ScenarioId;

use mock_sensor_core::motion::{MAX_DISTANCE_MM, MIN_DISTANCE_MM};
use mock_sensor_core::safety::evaluate;
use mock_sensor_core::{
    Direction, MockSensor, SensorConfig, SensorError, SensorHandle, SensorReading, SharedState,
    StatusCode, Ticker,
};
use mock_sensor_env::SensorContext;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::ScopedJoinHandle;
use tracing::{debug, info, warn};

/// First value fault-injected by the contention scenario. Injected values
/// lie far outside the motion range so they can be told apart from tick
/// output.
const INJECTION_MARKER_BASE: i32 = 1_000;
const INJECTION_MARKER_SPAN: i32 = 1_000;

/// Cap on readings each contention reader keeps for verification.
const MAX_READS_PER_READER: usize = 50_000;

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Last reading observed
    pub final_reading: Option<SensorReading>,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,

    /// Per-tick trace (only for virtual-clock scenarios)
    pub frames: Vec<TraceFrame>,
}

impl ScenarioResult {
    fn new(scenario: ScenarioId, seed: u64) -> Self {
        Self {
            scenario,
            seed,
            passed: false,
            total_ticks: 0,
            final_reading: None,
            failure_reason: None,
            metrics: ScenarioMetrics::default(),
            frames: Vec::new(),
        }
    }

    fn finish(mut self, violations: Vec<String>) -> Self {
        self.passed = violations.is_empty();
        if !self.passed {
            let shown: Vec<&str> = violations.iter().take(3).map(String::as_str).collect();
            self.failure_reason = Some(format!(
                "{} violation(s): {}",
                violations.len(),
                shown.join("; ")
            ));
        }
        self
    }

    /// Packs the trace into an export.
    pub fn to_export(&self, config: SensorConfig) -> TraceExport {
        let mut export = TraceExport::new(self.scenario.name(), self.seed, config);
        for frame in &self.frames {
            export.add_frame(frame.clone());
        }
        export.finalize(self.passed, self.failure_reason.clone());
        export
    }
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default)]
pub struct ScenarioMetrics {
    /// Direction reversals seen
    pub reversals: u64,

    /// Ticks that published EMERGENCY_STOP
    pub emergency_ticks: u64,

    /// Transitions NORMAL -> EMERGENCY_STOP
    pub trips: u64,

    /// Transitions EMERGENCY_STOP -> NORMAL
    pub clears: u64,

    /// Readings verified by concurrent readers
    pub reads_checked: u64,

    /// Fault injections performed
    pub injections: u64,

    /// Smallest distance published by a tick
    pub min_distance_mm: i32,

    /// Largest distance published by a tick
    pub max_distance_mm: i32,
}

/// Runs sensor scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Ticks per scenario
    ticks: u64,

    /// Reader threads for the contention scenario
    readers: usize,

    /// Injector threads for the contention scenario
    injectors: usize,

    /// Sensor configuration
    config: SensorConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            ticks: 600,
            readers: 4,
            injectors: 2,
            config: SensorConfig::default(),
        }
    }

    /// Sets the number of ticks.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = ticks;
        self
    }

    /// Sets the contention thread counts.
    pub fn with_threads(mut self, readers: usize, injectors: usize) -> Self {
        self.readers = readers;
        self.injectors = injectors;
        self
    }

    /// Sets the sensor configuration.
    pub fn with_config(mut self, config: SensorConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the sensor configuration.
    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        if let Err(e) = self.config.validate() {
            let mut result = ScenarioResult::new(scenario, self.seed);
            result.failure_reason = Some(e.to_string());
            return result;
        }

        match scenario {
            ScenarioId::Bounce => self.run_bounce(),
            ScenarioId::TripWire => self.run_trip_wire(),
            ScenarioId::InjectionStaleness => self.run_injection_staleness(),
            ScenarioId::Contention => self.run_contention(),
            ScenarioId::Shutdown => self.run_shutdown(),
        }
    }

    /// Builds the virtual-clock pieces every traced scenario needs.
    fn rig(&self, config: &SensorConfig) -> (Arc<SimContext>, SensorHandle, Ticker) {
        let context = SimContext::shared(self.seed);
        let state = SharedState::new(config);
        let ticker = Ticker::new(state.clone(), Arc::new(context.noise()));
        (context, SensorHandle::new(state), ticker)
    }

    /// SIM-001: Bounce - a long sweep between the stops.
    ///
    /// **Assertions**: every tick lands in `[5, 400]`, status matches the
    /// distance, timestamps never go backwards, a step away from the stops
    /// is 15-19mm, and a long enough run reverses at least once.
    fn run_bounce(&self) -> ScenarioResult {
        info!("SIM-001: Bounce - clamp and reversal sweep");

        let mut result = ScenarioResult::new(ScenarioId::Bounce, self.seed);
        let (context, handle, ticker) = self.rig(&self.config);
        let mut violations = Vec::new();

        let mut prev = handle.read();
        let mut prev_direction = self.config.initial_direction;
        result.metrics.min_distance_mm = prev.distance_mm;
        result.metrics.max_distance_mm = prev.distance_mm;

        for tick in 1..=self.ticks {
            context.advance_time(self.config.tick_period);
            let report = ticker.tick(context.now());
            let reading = report.reading;

            check_tick(tick, &reading, &mut violations);
            if reading.timestamp < prev.timestamp {
                violations.push(format!(
                    "tick {tick}: timestamp went backwards {} -> {}",
                    prev.timestamp, reading.timestamp
                ));
            }

            if report.direction != prev_direction {
                result.metrics.reversals += 1;
            } else {
                let step = (reading.distance_mm - prev.distance_mm).abs();
                if !(15..=19).contains(&step) {
                    violations.push(format!("tick {tick}: step of {step}mm outside [15, 19]"));
                }
            }

            record_status(&mut result.metrics, prev.status_code, &reading);
            result.frames.push(TraceFrame::from_report(tick, &report));

            prev = reading;
            prev_direction = report.direction;
        }

        // 395mm at most 19mm per tick: a full leg never takes more than 27 ticks
        if self.ticks >= 30 && result.metrics.reversals == 0 {
            violations.push(format!("no reversal in {} ticks", self.ticks));
        }

        result.total_ticks = self.ticks;
        result.final_reading = Some(prev);
        debug!(
            "  reversals={} min={}mm max={}mm",
            result.metrics.reversals, result.metrics.min_distance_mm, result.metrics.max_distance_mm
        );
        result.finish(violations)
    }

    /// SIM-002: TripWire - the target repeatedly dips under the threshold.
    ///
    /// **Assertions**: emergency iff distance < 10 on every tick, and the
    /// emergency both trips and clears (no latching).
    fn run_trip_wire(&self) -> ScenarioResult {
        info!("SIM-002: TripWire - emergency stop trips and clears");

        let config = self
            .config
            .clone()
            .with_initial_distance(60)
            .with_direction(Direction::MovingCloser);
        let mut result = ScenarioResult::new(ScenarioId::TripWire, self.seed);
        let (context, handle, ticker) = self.rig(&config);
        let mut violations = Vec::new();

        let mut prev = handle.read();
        result.metrics.min_distance_mm = prev.distance_mm;
        result.metrics.max_distance_mm = prev.distance_mm;

        for tick in 1..=self.ticks {
            context.advance_time(config.tick_period);
            let report = ticker.tick(context.now());

            check_tick(tick, &report.reading, &mut violations);
            record_status(&mut result.metrics, prev.status_code, &report.reading);
            result.frames.push(TraceFrame::from_report(tick, &report));
            prev = report.reading;
        }

        // From 60mm closing at >= 15mm per tick the stop is reached by tick 4
        // and left again on tick 5
        if self.ticks >= 10 {
            if result.metrics.trips == 0 {
                violations.push("emergency stop never tripped".to_string());
            }
            if result.metrics.clears == 0 {
                violations.push("emergency stop never cleared (latched?)".to_string());
            }
        }

        result.total_ticks = self.ticks;
        result.final_reading = Some(prev);
        result.finish(violations)
    }

    /// SIM-003: InjectionStaleness - status lags an injected distance by
    /// exactly one tick.
    ///
    /// **Assertions**: right after `inject_distance(3)` the reading shows
    /// 3mm with the old status; the next tick (moving closer) clamps to 5mm
    /// and trips. While moving away the same injection is carried back above
    /// the threshold by the next step.
    fn run_injection_staleness(&self) -> ScenarioResult {
        info!("SIM-003: InjectionStaleness - one-tick status lag");

        let mut result = ScenarioResult::new(ScenarioId::InjectionStaleness, self.seed);
        let (context, handle, ticker) = self.rig(&self.config);
        let mut violations = Vec::new();
        let mut tick = 0u64;

        let mut advance = |result: &mut ScenarioResult| {
            tick += 1;
            context.advance_time(self.config.tick_period);
            let report = ticker.tick(context.now());
            result.frames.push(TraceFrame::from_report(tick, &report));
            report
        };

        // Phase 1: wait for a closing leg well clear of the threshold
        let mut closing = false;
        for _ in 0..200 {
            let report = advance(&mut result);
            if report.direction == Direction::MovingCloser && report.reading.distance_mm > 30 {
                closing = true;
                break;
            }
        }
        if !closing {
            violations.push("never observed a closing leg above 30mm".to_string());
            return result.finish(violations);
        }

        let before = handle.read();
        handle.inject_distance(3);
        result.metrics.injections += 1;

        let stale = handle.read();
        if stale.distance_mm != 3 || stale.status_code != before.status_code {
            violations.push(format!("injection not stale: {stale:?} (before {before:?})"));
        }
        if stale.status_code != StatusCode::Normal {
            violations.push(format!("expected stale NORMAL, got {}", stale.status_code));
        }

        let report = advance(&mut result);
        if let Some(frame) = result.frames.last_mut() {
            frame.injected_mm = Some(3);
        }
        if report.reading.distance_mm != MIN_DISTANCE_MM
            || report.reading.status_code != StatusCode::EmergencyStop
            || report.direction != Direction::MovingAway
        {
            violations.push(format!("closing injection did not trip: {report:?}"));
        }

        // Phase 2: now moving away; the next step carries 3mm back above 10mm
        handle.inject_distance(3);
        result.metrics.injections += 1;

        let report = advance(&mut result);
        if let Some(frame) = result.frames.last_mut() {
            frame.injected_mm = Some(3);
        }
        let expected = 3 + 15..=3 + 19;
        if !expected.contains(&report.reading.distance_mm)
            || report.reading.status_code != StatusCode::Normal
        {
            violations.push(format!("receding injection misbehaved: {report:?}"));
        }

        result.total_ticks = tick;
        result.final_reading = Some(handle.read());
        result.finish(violations)
    }

    /// SIM-004: Contention - reader and injector threads against the tick.
    ///
    /// **Assertion**: every reading equals a snapshot some tick published,
    /// or carries an injected distance together with the status and
    /// timestamp of the tick before it. Anything else is a torn read.
    fn run_contention(&self) -> ScenarioResult {
        info!(
            "SIM-004: Contention - {} readers, {} injectors",
            self.readers, self.injectors
        );

        let mut result = ScenarioResult::new(ScenarioId::Contention, self.seed);
        let (context, handle, ticker) = self.rig(&self.config);
        let mut violations = Vec::new();
        let done = AtomicBool::new(false);

        let mut published = vec![handle.read()];

        let (reads, injections) = std::thread::scope(|scope| {
            let readers: Vec<_> = (0..self.readers)
                .map(|_| {
                    let handle = handle.clone();
                    let done = &done;
                    scope.spawn(move || {
                        let mut seen = Vec::new();
                        while !done.load(Ordering::Acquire) {
                            if seen.len() < MAX_READS_PER_READER {
                                seen.push(handle.read());
                            }
                            std::thread::yield_now();
                        }
                        seen
                    })
                })
                .collect();

            let injectors: Vec<_> = (0..self.injectors)
                .map(|index| {
                    let handle = handle.clone();
                    let done = &done;
                    scope.spawn(move || {
                        let mut count = 0u64;
                        let mut marker = index as i32 * 97;
                        while !done.load(Ordering::Acquire) {
                            handle.inject_distance(
                                INJECTION_MARKER_BASE + marker.rem_euclid(INJECTION_MARKER_SPAN),
                            );
                            marker += 1;
                            count += 1;
                            std::thread::yield_now();
                        }
                        count
                    })
                })
                .collect();

            for _ in 0..self.ticks {
                context.advance_time(self.config.tick_period);
                published.push(ticker.tick(context.now()).reading);
                std::thread::yield_now();
            }
            done.store(true, Ordering::Release);

            let reads: Vec<SensorReading> = join_workers("reader", readers, &mut violations)
                .into_iter()
                .flatten()
                .collect();
            let injections: u64 = join_workers("injector", injectors, &mut violations)
                .into_iter()
                .sum();
            (reads, injections)
        });

        for (tick, reading) in published.iter().enumerate().skip(1) {
            check_tick(tick as u64, reading, &mut violations);
        }

        let exact: HashSet<SensorReading> = published.iter().copied().collect();
        let status_at: HashMap<u64, StatusCode> = published
            .iter()
            .map(|r| (r.timestamp, r.status_code))
            .collect();
        let markers = INJECTION_MARKER_BASE..INJECTION_MARKER_BASE + INJECTION_MARKER_SPAN;

        for reading in &reads {
            let consistent = exact.contains(reading)
                || (markers.contains(&reading.distance_mm)
                    && status_at.get(&reading.timestamp) == Some(&reading.status_code));
            if !consistent {
                violations.push(format!("torn reading {reading:?}"));
            }
        }

        if self.readers > 0 && reads.is_empty() {
            warn!("contention readers recorded no readings");
        }

        result.metrics.reads_checked = reads.len() as u64;
        result.metrics.injections = injections;
        result.total_ticks = self.ticks;
        result.final_reading = Some(handle.read());
        result.finish(violations)
    }

    /// SIM-005: Shutdown - the real scheduler on the virtual clock.
    ///
    /// **Assertions**: ticks ran before stop, state is frozen after stop
    /// returns no matter how far time advances, and a second stop is
    /// rejected.
    fn run_shutdown(&self) -> ScenarioResult {
        info!("SIM-005: Shutdown - synchronous scheduler stop");

        let mut result = ScenarioResult::new(ScenarioId::Shutdown, self.seed);
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                result.failure_reason = Some(format!("failed to build runtime: {e}"));
                return result;
            }
        };

        let context = SimContext::shared(self.seed);
        let noise = Arc::new(context.noise());
        let config = self.config.clone();
        let yields = self.ticks.max(1) * 2;

        let outcome: Result<Vec<String>, SensorError> = runtime.block_on(async {
            let mut violations = Vec::new();
            let mut sensor = MockSensor::new(Arc::clone(&context), noise, config);
            let handle = sensor.start()?;

            for _ in 0..yields {
                tokio::task::yield_now().await;
            }

            sensor.stop().await?;
            let frozen = handle.read();

            if frozen.timestamp == 0 {
                violations.push("scheduler never ticked before stop".to_string());
            }
            if handle.is_active() {
                violations.push("state still active after stop".to_string());
            }

            for _ in 0..yields {
                tokio::task::yield_now().await;
            }
            context.advance_time(std::time::Duration::from_secs(60));

            if handle.read() != frozen {
                violations.push(format!("state changed after stop: {:?} -> {:?}", frozen, handle.read()));
            }
            if !matches!(sensor.stop().await, Err(SensorError::AlreadyStopped)) {
                violations.push("second stop was not rejected".to_string());
            }

            result.final_reading = Some(frozen);
            Ok(violations)
        });

        result.total_ticks = result
            .final_reading
            .map(|r| r.timestamp / self.config.tick_period.as_millis().max(1) as u64)
            .unwrap_or(0);

        match outcome {
            Ok(violations) => result.finish(violations),
            Err(e) => result.finish(vec![format!("sensor error: {e}")]),
        }
    }
}

/// Joins scoped worker threads, recording any that panicked.
fn join_workers<T>(
    role: &str,
    workers: Vec<ScopedJoinHandle<'_, T>>,
    violations: &mut Vec<String>,
) -> Vec<T> {
    workers
        .into_iter()
        .enumerate()
        .filter_map(|(index, worker)| match worker.join() {
            Ok(value) => Some(value),
            Err(_) => {
                violations.push(format!("{role} thread {index} panicked"));
                None
            }
        })
        .collect()
}

/// Per-tick invariants shared by all scenarios.
fn check_tick(tick: u64, reading: &SensorReading, violations: &mut Vec<String>) {
    if !(MIN_DISTANCE_MM..=MAX_DISTANCE_MM).contains(&reading.distance_mm) {
        violations.push(format!("tick {tick}: distance {}mm out of bounds", reading.distance_mm));
    }
    if reading.status_code != evaluate(reading.distance_mm) {
        violations.push(format!(
            "tick {tick}: status {} does not match distance {}mm",
            reading.status_code, reading.distance_mm
        ));
    }
}

fn record_status(metrics: &mut ScenarioMetrics, prev: StatusCode, reading: &SensorReading) {
    metrics.min_distance_mm = metrics.min_distance_mm.min(reading.distance_mm);
    metrics.max_distance_mm = metrics.max_distance_mm.max(reading.distance_mm);

    if reading.status_code.is_emergency() {
        metrics.emergency_ticks += 1;
    }
    match (prev, reading.status_code) {
        (StatusCode::Normal, StatusCode::EmergencyStop) => metrics.trips += 1,
        (StatusCode::EmergencyStop, StatusCode::Normal) => metrics.clears += 1,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bounce_passes() {
        let result = ScenarioRunner::new(42).with_ticks(300).run(ScenarioId::Bounce);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 300);
        assert_eq!(result.frames.len(), 300);
        assert!(result.metrics.reversals >= 2);
        assert_eq!(result.metrics.max_distance_mm, MAX_DISTANCE_MM);
    }

    #[test]
    fn test_bounce_is_deterministic_per_seed() {
        let a = ScenarioRunner::new(7).with_ticks(120).run(ScenarioId::Bounce);
        let b = ScenarioRunner::new(7).with_ticks(120).run(ScenarioId::Bounce);
        let c = ScenarioRunner::new(8).with_ticks(120).run(ScenarioId::Bounce);

        assert_eq!(a.frames, b.frames);
        assert_ne!(a.frames, c.frames);
    }

    #[test]
    fn test_trip_wire_trips_and_clears() {
        let result = ScenarioRunner::new(42).with_ticks(200).run(ScenarioId::TripWire);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.trips >= 1);
        assert!(result.metrics.clears >= 1);
        assert_eq!(result.metrics.min_distance_mm, MIN_DISTANCE_MM);
    }

    #[test]
    fn test_injection_staleness_passes() {
        let result = ScenarioRunner::new(42).run(ScenarioId::InjectionStaleness);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.injections, 2);
        let injected: Vec<_> = result.frames.iter().filter(|f| f.injected_mm.is_some()).collect();
        assert_eq!(injected.len(), 2);
        assert_eq!(injected[0].status, StatusCode::EmergencyStop);
    }

    #[test]
    fn test_contention_has_no_torn_reads() {
        let result = ScenarioRunner::new(42)
            .with_ticks(200)
            .with_threads(4, 2)
            .run(ScenarioId::Contention);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.total_ticks, 200);
    }

    #[test]
    fn test_panicked_worker_is_a_violation() {
        let mut violations = Vec::new();

        let joined = std::thread::scope(|scope| {
            let workers = vec![
                scope.spawn(|| 3u64),
                scope.spawn(|| -> u64 { panic!("worker died") }),
                scope.spawn(|| 4u64),
            ];
            join_workers("injector", workers, &mut violations)
        });

        assert_eq!(joined, vec![3, 4]);
        assert_eq!(violations, vec!["injector thread 1 panicked".to_string()]);
    }

    #[test]
    fn test_shutdown_freezes_state() {
        let result = ScenarioRunner::new(42).with_ticks(20).run(ScenarioId::Shutdown);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.total_ticks > 0);
    }

    #[test]
    fn test_invalid_config_fails_the_run() {
        let config = SensorConfig::default().with_initial_distance(1_000);
        let result = ScenarioRunner::new(42).with_config(config).run(ScenarioId::Bounce);

        assert!(!result.passed);
        assert!(result.failure_reason.unwrap().contains("Invalid configuration"));
    }

    #[test]
    fn test_export_carries_frames() {
        let runner = ScenarioRunner::new(3).with_ticks(50);
        let result = runner.run(ScenarioId::Bounce);
        let export = result.to_export(runner.config().clone());

        assert_eq!(export.frames.len(), 50);
        assert_eq!(export.scenario, "bounce");
        assert!(export.passed);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn test_bounce_holds_for_any_seed(seed in any::<u64>(), start in MIN_DISTANCE_MM..=MAX_DISTANCE_MM) {
            let config = SensorConfig::default().with_initial_distance(start);
            let result = ScenarioRunner::new(seed)
                .with_ticks(100)
                .with_config(config)
                .run(ScenarioId::Bounce);
            prop_assert!(result.passed, "{:?}", result.failure_reason);
        }
    }
}
