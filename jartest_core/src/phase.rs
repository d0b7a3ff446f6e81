//! The jar-test phase machine.
//!
//! Phases are driven purely by the stirrer speed and the time spent in the
//! current phase. There is no terminal state: the machine keeps following
//! the RPM it is given for as long as the host keeps ticking it.
//!
//! ```text
//!            rapid band                 slow band / timeout
//!   Idle ───────────────► RapidMix ◄──────────────────────► SlowMix
//!                            │  ▲        rpm > slow max        │
//!          rpm < slow min    │  │ rapid band                   │ timeout / rpm < slow min
//!                            ▼  │                              ▼
//!                          Settling ◄──────────────────────────┘
//! ```

use crate::config::JarConfig;
use crate::state::JarState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Jar test phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Not mixing, or not enough coagulant
    #[default]
    Idle,

    /// High-shear dispersal of the coagulant
    RapidMix,

    /// Gentle agitation that builds flocs
    SlowMix,

    /// Quiescent; flocs drop out
    Settling,
}

impl Phase {
    pub fn all() -> [Phase; 4] {
        [Phase::Idle, Phase::RapidMix, Phase::SlowMix, Phase::Settling]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::RapidMix => "rapid_mix",
            Phase::SlowMix => "slow_mix",
            Phase::Settling => "settling",
        }
    }

    /// True for the two stirred phases.
    pub fn is_mixing(&self) -> bool {
        matches!(self, Phase::RapidMix | Phase::SlowMix)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A change of phase observed during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub from: Phase,
    pub to: Phase,
}

/// What the phase machine did during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PhaseUpdate {
    pub transition: Option<PhaseTransition>,

    /// The mixing latch closed on this tick
    pub mixing_completed: bool,
}

/// Evaluates phase transitions and the rapid-mix latch.
#[derive(Debug, Clone, Copy)]
pub struct PhaseController<'a> {
    config: &'a JarConfig,
}

impl<'a> PhaseController<'a> {
    pub fn new(config: &'a JarConfig) -> Self {
        Self { config }
    }

    /// The phase to enter from `phase`, if any, given the current RPM and
    /// the time already spent in `phase`.
    pub fn next_phase(&self, phase: Phase, rpm: f64, elapsed: f64) -> Option<Phase> {
        let c = self.config;
        let in_rapid = c.in_rapid_band(rpm);
        let in_slow = c.in_slow_band(rpm);

        match phase {
            Phase::Idle => in_rapid.then_some(Phase::RapidMix),

            Phase::RapidMix => {
                if elapsed >= c.rapid_mix_duration || rpm < c.rapid_mix_min_rpm {
                    if in_slow {
                        Some(Phase::SlowMix)
                    } else if rpm < c.slow_mix_min_rpm {
                        Some(Phase::Settling)
                    } else {
                        None
                    }
                } else {
                    None
                }
            }

            Phase::SlowMix => {
                if elapsed >= c.slow_mix_duration || rpm < c.slow_mix_min_rpm {
                    Some(Phase::Settling)
                } else if rpm > c.slow_mix_max_rpm {
                    Some(Phase::RapidMix)
                } else {
                    None
                }
            }

            Phase::Settling => {
                if in_rapid {
                    Some(Phase::RapidMix)
                } else if in_slow {
                    Some(Phase::SlowMix)
                } else {
                    None
                }
            }
        }
    }

    /// Advances the phase machine on `state` by `dt` seconds.
    ///
    /// Without sufficient chemical the jar is held in `Idle`, the mixing
    /// latch is cleared and any unreported settled mass is dropped. Otherwise at most one transition is taken, then
    /// in-band rapid mixing is accumulated toward the latch.
    pub fn update(&self, state: &mut JarState, dt: f64) -> PhaseUpdate {
        let mut update = PhaseUpdate::default();

        if !state.has_sufficient_chemical {
            if state.phase != Phase::Idle {
                debug!("Insufficient chemical - returning to idle from {}", state.phase);
                update.transition = Some(PhaseTransition {
                    from: state.phase,
                    to: Phase::Idle,
                });
                state.phase = Phase::Idle;
                state.phase_elapsed = 0.0;
            } else {
                state.phase_elapsed += dt;
            }
            state.has_been_mixed_properly = false;
            state.rapid_mix_accum_time = 0.0;
            state.settled_mass_accum = 0.0;
            return update;
        }

        state.phase_elapsed += dt;
        if let Some(next) = self.next_phase(state.phase, state.rpm, state.phase_elapsed) {
            debug!("Started {} phase at {:.1} RPM", next, state.rpm);
            update.transition = Some(PhaseTransition {
                from: state.phase,
                to: next,
            });
            state.phase = next;
            state.phase_elapsed = 0.0;
        }

        if state.phase == Phase::RapidMix && self.config.in_rapid_band(state.rpm) {
            state.rapid_mix_accum_time += dt;

            if !state.has_been_mixed_properly
                && state.rapid_mix_accum_time >= self.config.minimum_rapid_mix_time
            {
                state.has_been_mixed_properly = true;
                update.mixing_completed = true;
                debug!(
                    "Rapid mix complete ({:.1}s) - reactions activated",
                    state.rapid_mix_accum_time
                );
            }
        }

        update
    }
}
