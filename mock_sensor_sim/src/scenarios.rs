//! Test scenarios for the simulated sensor.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// SIM-001: Long run between the stops; bounds, reversals, status purity
    Bounce,

    /// SIM-002: Repeated trips across the 10mm line, no latching
    TripWire,

    /// SIM-003: Injected value is stale until the next tick
    InjectionStaleness,

    /// SIM-004: Concurrent readers and injectors while ticking
    Contention,

    /// SIM-005: No tick runs after a synchronous stop
    Shutdown,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Bounce,
            ScenarioId::TripWire,
            ScenarioId::InjectionStaleness,
            ScenarioId::Contention,
            ScenarioId::Shutdown,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Bounce => "bounce",
            ScenarioId::TripWire => "trip_wire",
            ScenarioId::InjectionStaleness => "injection_staleness",
            ScenarioId::Contention => "contention",
            ScenarioId::Shutdown => "shutdown",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Bounce => "Target sweeps [5, 400]mm; clamp, reversal and status purity every tick",
            ScenarioId::TripWire => "Target dips under 10mm; emergency stop trips and clears with distance",
            ScenarioId::InjectionStaleness => "Inject 3mm; status stays stale until the next tick recomputes it",
            ScenarioId::Contention => "Reader and injector threads hammer the sensor while it ticks",
            ScenarioId::Shutdown => "Stop the scheduler; state never changes afterwards",
        }
    }

    /// Returns true if the scenario drives the tick from a virtual clock
    /// (and can therefore be exported frame by frame).
    pub fn is_traced(&self) -> bool {
        matches!(
            self,
            ScenarioId::Bounce | ScenarioId::TripWire | ScenarioId::InjectionStaleness
        )
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bounce" | "sim-001" => Ok(ScenarioId::Bounce),
            "trip_wire" | "tripwire" | "sim-002" => Ok(ScenarioId::TripWire),
            "injection_staleness" | "staleness" | "sim-003" => Ok(ScenarioId::InjectionStaleness),
            "contention" | "stress" | "sim-004" => Ok(ScenarioId::Contention),
            "shutdown" | "sim-005" => Ok(ScenarioId::Shutdown),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
        }
    }

    #[test]
    fn test_aliases_and_unknown() {
        assert_eq!("SIM-004".parse::<ScenarioId>(), Ok(ScenarioId::Contention));
        assert_eq!("TripWire".parse::<ScenarioId>(), Ok(ScenarioId::TripWire));
        assert!("split_brain".parse::<ScenarioId>().is_err());
    }
}
