//! Invariant monitor - checks every jar after every tick.
//!
//! The monitor plays the role of a ground-truth oracle: it does not
//! simulate anything itself, it only asserts that the engine never leaves
//! the states the model allows.

use jartest_core::{JarConfig, JarState, Phase, TurbidityModel};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Tolerance for float comparisons in the checks.
const EPSILON: f64 = 1e-9;

/// Which property was broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A value became NaN or infinite
    NonFinite,

    /// Dose or floc went below zero
    Negative,

    /// Turbidity left [0, 1] or floc exceeded its ceiling
    OutOfRange,

    /// Floc or turbidity moved before mixing completed
    MixingGate,

    /// Jar was short of chemical yet did not return to Idle
    IdleWithoutChemical,

    /// A tick added dose
    DoseIncreased,

    /// Settle buffer held more than one event's worth of mass
    SettleBuffer,
}

/// One broken property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub tick: u64,
    pub jar: usize,
    pub kind: ViolationKind,
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tick {} jar {}: {:?} ({})",
            self.tick, self.jar, self.kind, self.detail
        )
    }
}

/// Collects invariant violations over a run.
#[derive(Debug, Clone, Default)]
pub struct InvariantMonitor {
    violations: Vec<Violation>,
    checks: u64,
}

impl InvariantMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks one jar's tick from `before` to `after`.
    ///
    /// Returns the number of violations found.
    pub fn observe(
        &mut self,
        tick: u64,
        jar: usize,
        before: &JarState,
        after: &JarState,
        config: &JarConfig,
    ) -> usize {
        let found = check(before, after, config);
        let count = found.len();
        self.checks += 1;

        for (kind, detail) in found {
            warn!("Invariant violated at tick {} in jar {}: {:?} ({})", tick, jar, kind, detail);
            self.violations.push(Violation {
                tick,
                jar,
                kind,
                detail,
            });
        }
        count
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Number of jar-ticks checked.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    pub fn clear(&mut self) {
        self.violations.clear();
        self.checks = 0;
    }
}

fn check(before: &JarState, after: &JarState, config: &JarConfig) -> Vec<(ViolationKind, String)> {
    let mut found = Vec::new();

    for (name, value) in [
        ("dose_ml", after.dose_ml),
        ("floc_size", after.floc_size),
        ("turbidity", after.turbidity),
        ("settled_mass_accum", after.settled_mass_accum),
    ] {
        if !value.is_finite() {
            found.push((ViolationKind::NonFinite, format!("{} = {}", name, value)));
        } else if value < 0.0 {
            found.push((ViolationKind::Negative, format!("{} = {}", name, value)));
        }
    }

    if after.turbidity > 1.0 {
        found.push((
            ViolationKind::OutOfRange,
            format!("turbidity = {}", after.turbidity),
        ));
    }
    if after.floc_size > config.max_floc_size {
        found.push((
            ViolationKind::OutOfRange,
            format!("floc_size = {} > {}", after.floc_size, config.max_floc_size),
        ));
    }

    if !after.has_been_mixed_properly {
        let raw = TurbidityModel::new(config.turbidity).raw_value();
        if after.floc_size != 0.0 {
            found.push((
                ViolationKind::MixingGate,
                format!("floc_size = {} before mixing", after.floc_size),
            ));
        }
        if after.settled_mass_accum != 0.0 {
            found.push((
                ViolationKind::MixingGate,
                format!("settle buffer = {} before mixing", after.settled_mass_accum),
            ));
        }
        if (after.turbidity - raw).abs() > EPSILON {
            found.push((
                ViolationKind::MixingGate,
                format!("turbidity = {} before mixing, raw = {}", after.turbidity, raw),
            ));
        }
    }

    // A jar that started the tick short of chemical must end it idle
    if !before.has_sufficient_chemical
        && (after.phase != Phase::Idle || after.has_been_mixed_properly)
    {
        found.push((
            ViolationKind::IdleWithoutChemical,
            format!(
                "phase = {}, mixed = {} with {:.3} mL",
                after.phase, after.has_been_mixed_properly, after.dose_ml
            ),
        ));
    }

    if after.dose_ml > before.dose_ml + EPSILON {
        found.push((
            ViolationKind::DoseIncreased,
            format!("{} -> {} mL", before.dose_ml, after.dose_ml),
        ));
    }

    if after.settled_mass_accum > config.settle_spawn_threshold + EPSILON {
        found.push((
            ViolationKind::SettleBuffer,
            format!("buffer = {}", after.settled_mass_accum),
        ));
    }

    found
}
