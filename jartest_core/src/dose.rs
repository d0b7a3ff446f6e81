//! Dose accumulation and the flocculation threshold.

use crate::config::JarConfig;
use crate::state::JarState;
use tracing::info;

/// Tracks cumulative coagulant and whether it is enough to flocculate.
#[derive(Debug, Clone, Copy)]
pub struct DoseAccumulator {
    minimum_ml: f64,
    max_ml: Option<f64>,
}

impl DoseAccumulator {
    pub fn new(config: &JarConfig) -> Self {
        Self {
            minimum_ml: config.minimum_dose_for_flocculation,
            max_ml: config.max_dose_ml,
        }
    }

    pub fn is_sufficient(&self, dose_ml: f64) -> bool {
        dose_ml >= self.minimum_ml
    }

    /// Adds `ml` of coagulant to the jar.
    ///
    /// Non-positive and non-finite volumes are ignored. Returns true when
    /// this addition moved the jar from insufficient to sufficient.
    pub fn add(&self, state: &mut JarState, ml: f64) -> bool {
        if !(ml > 0.0 && ml.is_finite()) {
            return false;
        }

        let was_sufficient = state.has_sufficient_chemical;
        let mut total = state.dose_ml + ml;
        if let Some(cap) = self.max_ml {
            total = total.min(cap.max(state.dose_ml));
        }
        state.dose_ml = total;
        self.refresh(state);

        let reached = !was_sufficient && state.has_sufficient_chemical;
        if reached {
            info!(
                "Sufficient coagulant added ({:.1} mL) - begin rapid mix to start the reaction",
                state.dose_ml
            );
        }
        reached
    }

    /// Removes dose used up by the reaction, never going below zero.
    pub fn consume(&self, state: &mut JarState, ml: f64) -> f64 {
        let consumed = ml.clamp(0.0, state.dose_ml);
        state.dose_ml -= consumed;
        self.refresh(state);
        consumed
    }

    /// Recomputes the sufficiency flag from the current dose.
    pub fn refresh(&self, state: &mut JarState) {
        state.has_sufficient_chemical = self.is_sufficient(state.dose_ml);
    }
}
