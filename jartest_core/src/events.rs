//! Events reported by a jar to its host.

use crate::phase::Phase;
use serde::{Deserialize, Serialize};

/// Settled floc mass reported once the settle buffer crosses its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettleEvent {
    /// Accumulated settling loss since the previous event
    pub mass: f64,
}

impl SettleEvent {
    /// Normalized size in [0, 1] for a sludge deposit of this mass.
    ///
    /// Grows logarithmically so a long settling run does not produce a few
    /// huge deposits.
    pub fn sludge_scale(&self) -> f64 {
        ((1.0 + self.mass.max(0.0)).log10() + 0.2).clamp(0.0, 1.0)
    }
}

/// Something the host may want to react to (UI, logs, visuals).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JarEvent {
    /// Cumulative dose crossed the flocculation minimum
    SufficiencyReached { dose_ml: f64 },

    PhaseChanged { from: Phase, to: Phase, rpm: f64 },

    /// Rapid-mix latch closed and flocs were seeded
    MixingComplete { rapid_mix_time: f64, seed_floc: f64 },

    Settled(SettleEvent),
}

impl JarEvent {
    /// The settle event, if this is one.
    pub fn as_settled(&self) -> Option<&SettleEvent> {
        match self {
            JarEvent::Settled(event) => Some(event),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sludge_scale() {
        assert_relative_eq!(SettleEvent { mass: 0.0 }.sludge_scale(), 0.2);
        assert_relative_eq!(SettleEvent { mass: 9.0 }.sludge_scale(), 1.0);
        assert!(SettleEvent { mass: 0.06 }.sludge_scale() < SettleEvent { mass: 0.5 }.sludge_scale());
    }

    #[test]
    fn test_event_json_shape() {
        let event = JarEvent::PhaseChanged {
            from: Phase::RapidMix,
            to: Phase::SlowMix,
            rpm: 30.0,
        };
        let json = serde_json::to_value(event).unwrap();

        assert_eq!(json["kind"], "phase_changed");
        assert_eq!(json["from"], "rapid_mix");
        assert_eq!(json["to"], "slow_mix");
    }
}
