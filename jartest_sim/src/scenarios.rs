//! Jar-test scenarios for the deterministic simulator.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// JT-001: Dosed jar enters RapidMix on the first in-band tick
    ReachRapidMix,

    /// JT-002: Nothing reacts before the minimum rapid-mix time
    GatedGrowth,

    /// JT-003: Turbidity falls while flocs settle out
    SettlingClears,

    /// JT-004: An under-dosed jar never leaves Idle
    InsufficientDose,

    // ═══════════════════════════════════════════════════
    // BENCH PROTOCOLS - full gang-stirrer runs
    // ═══════════════════════════════════════════════════
    /// JT-005: Rapid mix, slow mix, settle on every jar
    StandardProtocol,

    /// JT-006: Increasing dose across the bank
    DoseLadder,

    /// JT-007: Increasing pH across the bank
    PhSweep,

    /// JT-008: Reset in the middle of a run, then start over
    ResetMidRun,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ReachRapidMix,
            ScenarioId::GatedGrowth,
            ScenarioId::SettlingClears,
            ScenarioId::InsufficientDose,
            // Protocols
            ScenarioId::StandardProtocol,
            ScenarioId::DoseLadder,
            ScenarioId::PhSweep,
            ScenarioId::ResetMidRun,
        ]
    }

    /// Returns the single-behavior scenarios.
    pub fn basic() -> Vec<ScenarioId> {
        Self::all().into_iter().filter(|s| !s.is_protocol()).collect()
    }

    /// Returns the full bench protocols only.
    pub fn protocols() -> Vec<ScenarioId> {
        Self::all().into_iter().filter(|s| s.is_protocol()).collect()
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ReachRapidMix => "reach_rapid_mix",
            ScenarioId::GatedGrowth => "gated_growth",
            ScenarioId::SettlingClears => "settling_clears",
            ScenarioId::InsufficientDose => "insufficient_dose",
            ScenarioId::StandardProtocol => "standard_protocol",
            ScenarioId::DoseLadder => "dose_ladder",
            ScenarioId::PhSweep => "ph_sweep",
            ScenarioId::ResetMidRun => "reset_mid_run",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ReachRapidMix => "Dose 6 mL, stir at 100 RPM, expect RapidMix and mixing",
            ScenarioId::GatedGrowth => "5s in band then stop: no floc, turbidity stays raw",
            ScenarioId::SettlingClears => "Mix, stop the stirrer, watch turbidity fall as flocs settle",
            ScenarioId::InsufficientDose => "Dose 1 mL at 100 RPM for 100s: never leaves Idle",
            ScenarioId::StandardProtocol => "100 RPM 1 min, 30 RPM 20 min, settle on every jar",
            ScenarioId::DoseLadder => "Dose from half to 2.5x the minimum across the bank",
            ScenarioId::PhSweep => "pH 4 to 10 across the bank, best pH settles most",
            ScenarioId::ResetMidRun => "Reset during slow mix, verify fresh jars, rerun",
        }
    }

    /// Returns true if this runs a full multi-phase protocol.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            ScenarioId::StandardProtocol
                | ScenarioId::DoseLadder
                | ScenarioId::PhSweep
                | ScenarioId::ResetMidRun
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
            "reach_rapid_mix" | "reachrapidmix" | "jt-001" => Ok(ScenarioId::ReachRapidMix),
            "gated_growth" | "gatedgrowth" | "jt-002" => Ok(ScenarioId::GatedGrowth),
            "settling_clears" | "settlingclears" | "jt-003" => Ok(ScenarioId::SettlingClears),
            "insufficient_dose" | "insufficientdose" | "jt-004" => Ok(ScenarioId::InsufficientDose),
            "standard_protocol" | "standardprotocol" | "standard" | "jt-005" => {
                Ok(ScenarioId::StandardProtocol)
            }
            "dose_ladder" | "doseladder" | "jt-006" => Ok(ScenarioId::DoseLadder),
            "ph_sweep" | "phsweep" | "jt-007" => Ok(ScenarioId::PhSweep),
            "reset_mid_run" | "resetmidrun" | "reset" | "jt-008" => Ok(ScenarioId::ResetMidRun),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            assert_eq!(scenario.name().parse::<ScenarioId>(), Ok(scenario));
            assert_eq!(scenario.to_string(), scenario.name());
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!("JT-005".parse::<ScenarioId>(), Ok(ScenarioId::StandardProtocol));
        assert_eq!("reset".parse::<ScenarioId>(), Ok(ScenarioId::ResetMidRun));
        assert!("time_warp".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_groups_partition_all() {
        assert_eq!(ScenarioId::basic().len() + ScenarioId::protocols().len(), ScenarioId::all().len());
        assert!(ScenarioId::protocols().iter().all(|s| s.is_protocol()));
    }
}
