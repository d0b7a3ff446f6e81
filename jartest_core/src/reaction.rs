//! Floc growth, shear break-up, settling and dose consumption.
//!
//! One call to [`ReactionModel::advance`] integrates a single explicit Euler
//! step of the floc balance:
//!
//! ```text
//! growth   = k_g · doseFactor · η(pH) · (1 + k_c · floc) · dt · m_g(phase)
//! shear    = k_s · rpm · floc · dt · m_s(phase)
//! settling = (floc − threshold) · 0.1 · dt · m_settle(phase)     if floc > threshold
//! floc'    = max(0, floc + growth − shear − settling)
//! ```

use crate::config::JarConfig;
use crate::dose::DoseAccumulator;
use crate::events::SettleEvent;
use crate::phase::Phase;
use crate::state::JarState;

/// Fraction of the excess floc above the threshold that settles per second.
const SETTLING_FRACTION: f64 = 0.1;

/// Dose consumed per unit of floc growth during vigorous rapid mixing.
const CONSUMPTION_PER_GROWTH: f64 = 0.5;

/// Growth and shear scaling for each phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseMultipliers {
    pub growth: f64,
    pub shear: f64,
    pub settling: f64,
}

impl PhaseMultipliers {
    pub fn for_phase(phase: Phase) -> Self {
        match phase {
            Phase::Idle => Self {
                growth: 0.1,
                shear: 0.0,
                settling: 1.0,
            },
            Phase::RapidMix => Self {
                growth: 2.0,
                shear: 2.0,
                settling: 1.0,
            },
            Phase::SlowMix => Self {
                growth: 1.5,
                shear: 0.5,
                settling: 1.0,
            },
            Phase::Settling => Self {
                growth: 0.2,
                shear: 0.0,
                settling: 3.0,
            },
        }
    }
}

/// Terms of one reaction step, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReactionStep {
    pub efficiency: f64,
    pub growth: f64,
    pub shear_loss: f64,
    pub settling_loss: f64,
    pub dose_consumed: f64,
}

/// The floc balance for one jar configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReactionModel<'a> {
    config: &'a JarConfig,
}

impl<'a> ReactionModel<'a> {
    pub fn new(config: &'a JarConfig) -> Self {
        Self { config }
    }

    /// Dose concentration normalized to a 1-liter reference.
    pub fn dose_factor(&self, state: &JarState) -> f64 {
        state.dose_ml.max(0.0) / (state.water_volume_ml / 1000.0)
    }

    pub fn efficiency(&self, state: &JarState) -> f64 {
        self.config.efficiency.efficiency(state.ph)
    }

    /// Seeds the floc population when the mixing latch closes.
    pub fn seed(&self, state: &mut JarState) -> f64 {
        state.floc_size = (state.dose_ml * self.config.floc_seed_per_ml)
            .clamp(0.0, self.config.max_floc_size);
        state.floc_size
    }

    /// Advances the floc balance by `dt` seconds.
    ///
    /// Before the jar has been mixed properly nothing reacts: floc is held
    /// at zero and no dose is consumed.
    pub fn advance(&self, state: &mut JarState, dt: f64) -> ReactionStep {
        let efficiency = self.efficiency(state);

        if !state.has_been_mixed_properly {
            state.floc_size = 0.0;
            return ReactionStep {
                efficiency,
                ..ReactionStep::default()
            };
        }

        let c = self.config;
        let m = PhaseMultipliers::for_phase(state.phase);
        let floc = state.floc_size;

        let growth = c.growth_rate
            * self.dose_factor(state)
            * efficiency
            * (1.0 + c.coalescence_rate * floc)
            * dt
            * m.growth;
        let shear_loss = c.shear_factor * state.rpm.max(0.0) * floc * dt * m.shear;
        let settling_loss = if floc > c.settling_threshold {
            (floc - c.settling_threshold) * SETTLING_FRACTION * dt * m.settling
        } else {
            0.0
        };

        state.floc_size = (floc + growth - shear_loss - settling_loss).clamp(0.0, c.max_floc_size);

        let dose_consumed =
            if state.phase == Phase::RapidMix && state.rpm > c.consumption_rpm_threshold {
                DoseAccumulator::new(c).consume(state, growth * CONSUMPTION_PER_GROWTH)
            } else {
                0.0
            };

        ReactionStep {
            efficiency,
            growth,
            shear_loss,
            settling_loss,
            dose_consumed,
        }
    }

    /// Buffers settled mass and emits a settle event once it exceeds the
    /// spawn threshold.
    pub fn collect_settled(&self, state: &mut JarState, settling_loss: f64) -> Option<SettleEvent> {
        if settling_loss <= 0.0 || settling_loss.is_nan() {
            return None;
        }

        state.settled_mass_accum += settling_loss;
        if state.settled_mass_accum > self.config.settle_spawn_threshold {
            let event = SettleEvent {
                mass: state.settled_mass_accum,
            };
            state.settled_mass_accum = 0.0;
            Some(event)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mixed_state(config: &JarConfig, phase: Phase, rpm: f64, dose_ml: f64) -> JarState {
        let mut state = JarState::initial(config);
        state.dose_ml = dose_ml;
        state.has_sufficient_chemical = true;
        state.has_been_mixed_properly = true;
        state.phase = phase;
        state.rpm = rpm;
        state
    }

    #[test]
    fn test_gate_holds_floc_at_zero() {
        let config = JarConfig::alum();
        let model = ReactionModel::new(&config);
        let mut state = mixed_state(&config, Phase::RapidMix, 110.0, 20.0);
        state.has_been_mixed_properly = false;
        state.floc_size = 3.0;

        let step = model.advance(&mut state, 1.0);

        assert_eq!(state.floc_size, 0.0);
        assert_eq!(state.dose_ml, 20.0);
        assert_eq!(step.growth, 0.0);
        assert_eq!(step.dose_consumed, 0.0);
    }

    #[test]
    fn test_growth_formula() {
        let config = JarConfig::alum();
        let model = ReactionModel::new(&config);
        let mut state = mixed_state(&config, Phase::SlowMix, 30.0, 6.0);
        state.floc_size = 0.2;

        let step = model.advance(&mut state, 0.5);

        // 0.6 · 6 · 1 · (1 + 0.2·0.2) · 0.5 · 1.5
        assert_relative_eq!(step.growth, 0.6 * 6.0 * 1.04 * 0.5 * 1.5, epsilon = 1e-12);
        // 0.01 · 30 · 0.2 · 0.5 · 0.5
        assert_relative_eq!(step.shear_loss, 0.015, epsilon = 1e-12);
        assert_eq!(step.settling_loss, 0.0);
        assert_relative_eq!(
            state.floc_size,
            0.2 + step.growth - step.shear_loss,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_dose_factor_scales_with_volume() {
        let config = JarConfig {
            water_volume_ml: 500.0,
            ..JarConfig::alum()
        };
        let model = ReactionModel::new(&config);
        let state = mixed_state(&config, Phase::Idle, 0.0, 6.0);
        assert_relative_eq!(model.dose_factor(&state), 12.0);
    }

    #[test]
    fn test_settling_triples_in_settling_phase() {
        let config = JarConfig {
            growth_rate: 0.0,
            ..JarConfig::alum()
        };
        let model = ReactionModel::new(&config);

        let mut idle = mixed_state(&config, Phase::Idle, 0.0, 6.0);
        idle.floc_size = 2.5;
        let mut settling = idle;
        settling.phase = Phase::Settling;

        let idle_step = model.advance(&mut idle, 1.0);
        let settle_step = model.advance(&mut settling, 1.0);

        assert_relative_eq!(idle_step.settling_loss, 0.2, epsilon = 1e-12);
        assert_relative_eq!(settle_step.settling_loss, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_consumption_only_above_threshold_in_rapid_mix() {
        let config = JarConfig::alum();
        let model = ReactionModel::new(&config);

        let mut at_threshold = mixed_state(&config, Phase::RapidMix, 100.0, 6.0);
        model.advance(&mut at_threshold, 0.1);
        assert_eq!(at_threshold.dose_ml, 6.0);

        let mut fast = mixed_state(&config, Phase::RapidMix, 110.0, 6.0);
        let step = model.advance(&mut fast, 0.1);
        assert!(step.dose_consumed > 0.0);
        assert_relative_eq!(fast.dose_ml, 6.0 - 0.5 * step.growth, epsilon = 1e-12);

        let mut slow = mixed_state(&config, Phase::SlowMix, 110.0, 6.0);
        model.advance(&mut slow, 0.1);
        assert_eq!(slow.dose_ml, 6.0);
    }

    #[test]
    fn test_heavy_shear_never_goes_negative() {
        let config = JarConfig::alum();
        let model = ReactionModel::new(&config);
        let mut state = mixed_state(&config, Phase::RapidMix, 5000.0, 0.0);
        state.floc_size = 4.0;

        model.advance(&mut state, 10.0);
        assert_eq!(state.floc_size, 0.0);
    }

    #[test]
    fn test_slow_mix_growth_is_capped() {
        let config = JarConfig::alum();
        let model = ReactionModel::new(&config);
        let mut state = mixed_state(&config, Phase::SlowMix, 30.0, 30.0);
        state.floc_size = 1.0;

        for _ in 0..2000 {
            model.advance(&mut state, 1.0);
        }
        assert!(state.floc_size.is_finite());
        assert!(state.floc_size <= config.max_floc_size);
    }

    #[test]
    fn test_settle_events_fire_past_threshold() {
        let config = JarConfig {
            settle_spawn_threshold: 0.5,
            ..JarConfig::default()
        };
        let model = ReactionModel::new(&config);
        let mut state = JarState::initial(&config);

        assert!(model.collect_settled(&mut state, 0.25).is_none());
        assert!(model.collect_settled(&mut state, 0.0).is_none());
        // Exactly at the threshold is not "exceeding" it
        assert!(model.collect_settled(&mut state, 0.25).is_none());

        let event = model.collect_settled(&mut state, 0.125).unwrap();
        assert_eq!(event.mass, 0.625);
        assert_eq!(state.settled_mass_accum, 0.0);
    }

    #[test]
    fn test_settle_buffer_ignores_nan_and_negative_loss() {
        let config = JarConfig::default();
        let model = ReactionModel::new(&config);
        let mut state = JarState::initial(&config);

        assert!(model.collect_settled(&mut state, f64::NAN).is_none());
        assert!(model.collect_settled(&mut state, -1.0).is_none());
        assert_eq!(state.settled_mass_accum, 0.0);
    }
}
