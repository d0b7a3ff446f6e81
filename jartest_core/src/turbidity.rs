//! Turbidity policies.
//!
//! Both policies report turbidity normalized to [0, 1] and stay pinned at
//! their raw value until the jar has been mixed properly.

use crate::config::TurbidityPolicy;
use crate::phase::Phase;
use crate::state::JarState;

/// Converts floc dynamics and phase into turbidity.
#[derive(Debug, Clone, Copy)]
pub struct TurbidityModel {
    policy: TurbidityPolicy,
}

impl TurbidityModel {
    pub fn new(policy: TurbidityPolicy) -> Self {
        Self { policy }
    }

    /// Turbidity of untreated water under this policy.
    ///
    /// Target-seeking starts from full raw turbidity. Proportional turbidity
    /// tracks floc, and untreated water has none.
    pub fn raw_value(&self) -> f64 {
        match self.policy {
            TurbidityPolicy::Proportional { .. } => 0.0,
            TurbidityPolicy::TargetSeeking { .. } => 1.0,
        }
    }

    /// Normalized turbidity the target-seeking policy converges to at the
    /// given coagulation efficiency.
    pub fn target_fraction(&self, efficiency: f64) -> Option<f64> {
        match self.policy {
            TurbidityPolicy::Proportional { .. } => None,
            TurbidityPolicy::TargetSeeking {
                initial_ntu,
                min_final_ntu,
                ..
            } => {
                let efficiency = efficiency.clamp(0.0, 1.0);
                let target_ntu = min_final_ntu + (1.0 - efficiency) * (initial_ntu - min_final_ntu);
                Some((target_ntu / initial_ntu).clamp(0.0, 1.0))
            }
        }
    }

    /// Approach rate for the current phase (1/s). Idle holds turbidity.
    fn approach_rate(mixing_rate: f64, settling_rate: f64, phase: Phase) -> f64 {
        match phase {
            Phase::Idle => 0.0,
            Phase::RapidMix | Phase::SlowMix => mixing_rate,
            Phase::Settling => settling_rate,
        }
    }

    /// Updates `state.turbidity` for a step of `dt` seconds.
    pub fn update(&self, state: &mut JarState, efficiency: f64, dt: f64) {
        if !state.has_been_mixed_properly {
            state.turbidity = self.raw_value();
            return;
        }

        state.turbidity = match self.policy {
            TurbidityPolicy::Proportional { normalization, .. } => state.floc_size / normalization,
            TurbidityPolicy::TargetSeeking {
                mixing_rate,
                settling_rate,
                ..
            } => {
                let target = self.target_fraction(efficiency).unwrap_or(1.0);
                let t = (dt * Self::approach_rate(mixing_rate, settling_rate, state.phase))
                    .clamp(0.0, 1.0);
                state.turbidity + (target - state.turbidity) * t
            }
        }
        .clamp(0.0, 1.0);
    }

    /// Turbidity in NTU.
    ///
    /// Proportional turbidity starts at 0, so an unmixed proportional jar
    /// reports 0 NTU rather than the raw-water reading.
    pub fn ntu(&self, turbidity: f64) -> f64 {
        turbidity.clamp(0.0, 1.0) * self.policy.initial_ntu()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JarConfig;
    use approx::assert_relative_eq;

    fn mixed(config: &JarConfig, phase: Phase) -> JarState {
        let mut state = JarState::initial(config);
        state.has_been_mixed_properly = true;
        state.phase = phase;
        state
    }

    #[test]
    fn test_proportional_policy() {
        let config = JarConfig::ph_jar();
        let model = TurbidityModel::new(config.turbidity);
        let mut state = mixed(&config, Phase::SlowMix);

        state.floc_size = 1.0;
        model.update(&mut state, 1.0, 0.1);
        assert_relative_eq!(state.turbidity, 0.5);

        state.floc_size = 7.0;
        model.update(&mut state, 1.0, 0.1);
        assert_eq!(state.turbidity, 1.0);
    }

    #[test]
    fn test_target_fraction() {
        let model = TurbidityModel::new(TurbidityPolicy::default());

        assert_relative_eq!(model.target_fraction(1.0).unwrap(), 0.02);
        assert_relative_eq!(model.target_fraction(0.0).unwrap(), 1.0);
        assert_relative_eq!(model.target_fraction(0.5).unwrap(), 0.51);
    }

    #[test]
    fn test_settling_clears_faster_than_mixing() {
        let model = TurbidityModel::new(TurbidityPolicy::default());
        let config = JarConfig::default();

        let mut mixing = mixed(&config, Phase::SlowMix);
        let mut settling = mixed(&config, Phase::Settling);
        model.update(&mut mixing, 1.0, 1.0);
        model.update(&mut settling, 1.0, 1.0);

        assert_relative_eq!(mixing.turbidity, 1.0 - 0.98 * 0.025, epsilon = 1e-12);
        assert_relative_eq!(settling.turbidity, 1.0 - 0.98 * 0.12, epsilon = 1e-12);
    }

    #[test]
    fn test_idle_holds_turbidity() {
        let model = TurbidityModel::new(TurbidityPolicy::default());
        let config = JarConfig::default();
        let mut state = mixed(&config, Phase::Idle);
        state.turbidity = 0.4;

        model.update(&mut state, 1.0, 10.0);
        assert_eq!(state.turbidity, 0.4);
    }

    #[test]
    fn test_pinned_until_mixed() {
        let config = JarConfig::default();
        let model = TurbidityModel::new(config.turbidity);
        let mut state = JarState::initial(&config);
        state.phase = Phase::Settling;

        model.update(&mut state, 1.0, 100.0);
        assert_eq!(state.turbidity, 1.0);

        let alum = JarConfig::alum();
        let model = TurbidityModel::new(alum.turbidity);
        let mut state = JarState::initial(&alum);
        state.floc_size = 12.0;
        model.update(&mut state, 1.0, 1.0);
        assert_eq!(state.turbidity, 0.0);
    }

    #[test]
    fn test_large_step_does_not_overshoot() {
        let model = TurbidityModel::new(TurbidityPolicy::default());
        let config = JarConfig::default();
        let mut state = mixed(&config, Phase::Settling);

        model.update(&mut state, 1.0, 1_000.0);
        assert_relative_eq!(state.turbidity, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn test_ntu_conversion() {
        let model = TurbidityModel::new(TurbidityPolicy::default());
        assert_relative_eq!(model.ntu(0.5), 50.0);
        assert_relative_eq!(model.ntu(2.0), 100.0);
    }
}
