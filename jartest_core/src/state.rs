//! The per-jar aggregate state.

use crate::config::JarConfig;
use crate::phase::Phase;
use serde::{Deserialize, Serialize};

/// pH assumed when no pH is supplied.
pub const NEUTRAL_PH: f64 = 7.0;

/// Everything the engine knows about one jar.
///
/// Plain data: every field is a scalar, so a step can copy the state,
/// mutate the copy and hand it back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JarState {
    /// Cumulative coagulant volume (mL)
    pub dose_ml: f64,

    /// Stirrer speed supplied by the host
    pub rpm: f64,

    /// Water pH in [0, 14]
    pub ph: f64,

    /// Jar capacity (mL)
    pub water_volume_ml: f64,

    /// Abstract floc mass/size
    pub floc_size: f64,

    /// Normalized turbidity, 1 = raw water
    pub turbidity: f64,

    pub phase: Phase,

    /// Seconds since entering `phase`
    pub phase_elapsed: f64,

    pub has_sufficient_chemical: bool,

    /// One-way latch set once enough in-band rapid mixing has happened
    pub has_been_mixed_properly: bool,

    /// Qualifying rapid-mix seconds
    pub rapid_mix_accum_time: f64,

    /// Settling loss not yet reported as a settle event
    pub settled_mass_accum: f64,
}

impl JarState {
    /// State of a freshly filled jar.
    pub fn initial(config: &JarConfig) -> Self {
        Self {
            dose_ml: 0.0,
            rpm: 0.0,
            ph: NEUTRAL_PH,
            water_volume_ml: config.water_volume_ml,
            floc_size: 0.0,
            turbidity: crate::turbidity::TurbidityModel::new(config.turbidity).raw_value(),
            phase: Phase::Idle,
            phase_elapsed: 0.0,
            has_sufficient_chemical: config.minimum_dose_for_flocculation <= 0.0,
            has_been_mixed_properly: false,
            rapid_mix_accum_time: 0.0,
            settled_mass_accum: 0.0,
        }
    }

    /// Forces derived quantities back into their valid ranges.
    pub(crate) fn clamp_derived(&mut self, max_floc_size: f64) {
        self.floc_size = finite_or_zero(self.floc_size).clamp(0.0, max_floc_size);
        self.dose_ml = finite_or_zero(self.dose_ml).max(0.0);
        self.turbidity = finite_or_zero(self.turbidity).clamp(0.0, 1.0);
        self.settled_mass_accum = finite_or_zero(self.settled_mass_accum).max(0.0);
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
