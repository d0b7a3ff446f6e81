//! Jar configuration - the named constants of one jar-test variant.
//!
//! Every variant of the jar test (alum-only, pH jar, refined NTU jar) is the
//! same engine with a different `JarConfig`. The pH sensitivity and the
//! turbidity formula are selected by [`EfficiencyModel`] and
//! [`TurbidityPolicy`] rather than by separate jar types.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

// ============================================================================
// pH EFFICIENCY
// ============================================================================

/// How coagulation efficiency depends on pH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EfficiencyModel {
    /// pH is not modeled; efficiency is always 1.0
    Unmodeled,

    /// Gaussian bell centered at the optimal pH
    Gaussian { optimal_ph: f64, sigma: f64 },

    /// Linear fall-off from a center pH, reaching 0 at `half_width` away
    Linear { center_ph: f64, half_width: f64 },
}

impl Default for EfficiencyModel {
    fn default() -> Self {
        // Alum coagulates best slightly below neutral
        Self::Gaussian {
            optimal_ph: 6.75,
            sigma: 1.0,
        }
    }
}

impl EfficiencyModel {
    /// Coagulation efficiency in [0, 1] at the given pH.
    pub fn efficiency(&self, ph: f64) -> f64 {
        let raw = match *self {
            Self::Unmodeled => 1.0,
            Self::Gaussian { optimal_ph, sigma } => {
                let d = ph - optimal_ph;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            }
            Self::Linear {
                center_ph,
                half_width,
            } => 1.0 - (ph - center_ph).abs() / half_width,
        };
        raw.clamp(0.0, 1.0)
    }

    /// The pH at which efficiency peaks, if pH is modeled.
    pub fn optimal_ph(&self) -> Option<f64> {
        match *self {
            Self::Unmodeled => None,
            Self::Gaussian { optimal_ph, .. } => Some(optimal_ph),
            Self::Linear { center_ph, .. } => Some(center_ph),
        }
    }

    pub fn is_modeled(&self) -> bool {
        !matches!(self, Self::Unmodeled)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Unmodeled => Ok(()),
            Self::Gaussian { optimal_ph, sigma } => {
                ConfigError::require_non_negative("optimal_ph", optimal_ph)?;
                ConfigError::require_positive("sigma", sigma)
            }
            Self::Linear {
                center_ph,
                half_width,
            } => {
                ConfigError::require_non_negative("center_ph", center_ph)?;
                ConfigError::require_positive("half_width", half_width)
            }
        }
    }
}

// ============================================================================
// TURBIDITY POLICY
// ============================================================================

/// Formula used to turn floc dynamics into normalized turbidity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TurbidityPolicy {
    /// `turbidity = clamp01(floc_size / normalization)`
    Proportional {
        /// Floc size that maps to full turbidity (2 or 30 depending on scale)
        normalization: f64,
        /// NTU reported for turbidity 1.0
        initial_ntu: f64,
    },

    /// Exponential approach toward an efficiency-dependent floor.
    TargetSeeking {
        /// Raw water turbidity (NTU)
        initial_ntu: f64,
        /// Best achievable turbidity at full efficiency (NTU)
        min_final_ntu: f64,
        /// Approach rate during RapidMix and SlowMix (1/s)
        mixing_rate: f64,
        /// Approach rate during Settling (1/s)
        settling_rate: f64,
    },
}

impl Default for TurbidityPolicy {
    fn default() -> Self {
        Self::TargetSeeking {
            initial_ntu: 100.0,
            min_final_ntu: 2.0,
            mixing_rate: 0.025,
            settling_rate: 0.12,
        }
    }
}

impl TurbidityPolicy {
    /// NTU corresponding to normalized turbidity 1.0.
    pub fn initial_ntu(&self) -> f64 {
        match *self {
            Self::Proportional { initial_ntu, .. } => initial_ntu,
            Self::TargetSeeking { initial_ntu, .. } => initial_ntu,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            Self::Proportional {
                normalization,
                initial_ntu,
            } => {
                ConfigError::require_positive("normalization", normalization)?;
                ConfigError::require_positive("initial_ntu", initial_ntu)
            }
            Self::TargetSeeking {
                initial_ntu,
                min_final_ntu,
                mixing_rate,
                settling_rate,
            } => {
                ConfigError::require_positive("initial_ntu", initial_ntu)?;
                if !(0.0..=initial_ntu).contains(&min_final_ntu) {
                    return Err(ConfigError::InvalidNtuRange {
                        initial: initial_ntu,
                        min_final: min_final_ntu,
                    });
                }
                ConfigError::require_non_negative("mixing_rate", mixing_rate)?;
                ConfigError::require_non_negative("settling_rate", settling_rate)
            }
        }
    }
}

// ============================================================================
// JAR CONFIGURATION
// ============================================================================

/// Constants for one simulated jar. Units are mL, RPM and seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JarConfig {
    /// Jar capacity (default: 1000 mL)
    pub water_volume_ml: f64,

    /// Dose at which flocculation becomes possible (default: 5 mL)
    pub minimum_dose_for_flocculation: f64,

    /// Optional ceiling on the cumulative dose (default: none)
    pub max_dose_ml: Option<f64>,

    pub rapid_mix_min_rpm: f64,
    pub rapid_mix_max_rpm: f64,
    pub slow_mix_min_rpm: f64,
    pub slow_mix_max_rpm: f64,

    /// Maximum RapidMix dwell before handing over (default: 120 s)
    pub rapid_mix_duration: f64,

    /// Maximum SlowMix dwell before settling (default: 1200 s)
    pub slow_mix_duration: f64,

    /// In-band rapid-mix time required before any reaction (default: 10 s)
    pub minimum_rapid_mix_time: f64,

    pub growth_rate: f64,
    pub shear_factor: f64,
    pub coalescence_rate: f64,

    /// Floc size above which flocs start to settle out (default: 0.5)
    pub settling_threshold: f64,

    /// Floc seeded per mL of dose when mixing completes (default: 0.01)
    pub floc_seed_per_ml: f64,

    /// Upper clamp on floc size (default: 100)
    pub max_floc_size: f64,

    /// RapidMix consumes dose only above this RPM (default: 100)
    pub consumption_rpm_threshold: f64,

    /// Settled mass that triggers a settle event (default: 0.05)
    pub settle_spawn_threshold: f64,

    pub efficiency: EfficiencyModel,
    pub turbidity: TurbidityPolicy,
}

impl Default for JarConfig {
    fn default() -> Self {
        Self::refined()
    }
}

impl JarConfig {
    /// Gaussian pH efficiency with target-seeking turbidity.
    pub fn refined() -> Self {
        Self {
            water_volume_ml: 1000.0,
            minimum_dose_for_flocculation: 5.0,
            max_dose_ml: None,
            rapid_mix_min_rpm: 80.0,
            rapid_mix_max_rpm: 120.0,
            slow_mix_min_rpm: 20.0,
            slow_mix_max_rpm: 50.0,
            rapid_mix_duration: 120.0,
            slow_mix_duration: 1200.0,
            minimum_rapid_mix_time: 10.0,
            growth_rate: 0.6,
            shear_factor: 0.01,
            coalescence_rate: 0.2,
            settling_threshold: 0.5,
            floc_seed_per_ml: 0.01,
            max_floc_size: 100.0,
            consumption_rpm_threshold: 100.0,
            settle_spawn_threshold: 0.05,
            efficiency: EfficiencyModel::default(),
            turbidity: TurbidityPolicy::default(),
        }
    }

    /// Alum-only jar: pH ignored, turbidity proportional to floc on a 0-30 scale.
    pub fn alum() -> Self {
        Self {
            efficiency: EfficiencyModel::Unmodeled,
            turbidity: TurbidityPolicy::Proportional {
                normalization: 30.0,
                initial_ntu: 100.0,
            },
            ..Self::refined()
        }
    }

    /// pH-sensitive alum jar: linear pH efficiency around 7.5, turbidity on
    /// a 0-2 floc scale.
    ///
    /// Unlike a bare pH jar this one still needs the flocculation minimum
    /// and the rapid-mix latch before anything reacts, and growth scales
    /// with the dose.
    pub fn ph_jar() -> Self {
        Self {
            efficiency: EfficiencyModel::Linear {
                center_ph: 7.5,
                half_width: 5.0,
            },
            turbidity: TurbidityPolicy::Proportional {
                normalization: 2.0,
                initial_ntu: 100.0,
            },
            ..Self::refined()
        }
    }

    /// True if `rpm` lies in the closed rapid-mix band.
    pub fn in_rapid_band(&self, rpm: f64) -> bool {
        rpm >= self.rapid_mix_min_rpm && rpm <= self.rapid_mix_max_rpm
    }

    /// True if `rpm` lies in the closed slow-mix band.
    pub fn in_slow_band(&self, rpm: f64) -> bool {
        rpm >= self.slow_mix_min_rpm && rpm <= self.slow_mix_max_rpm
    }

    /// Rejects configurations the engine cannot run meaningfully.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.water_volume_ml > 0.0 && self.water_volume_ml.is_finite()) {
            return Err(ConfigError::InvalidWaterVolume(self.water_volume_ml));
        }

        validate_band("rapid-mix", self.rapid_mix_min_rpm, self.rapid_mix_max_rpm)?;
        validate_band("slow-mix", self.slow_mix_min_rpm, self.slow_mix_max_rpm)?;

        ConfigError::require_non_negative(
            "minimum_dose_for_flocculation",
            self.minimum_dose_for_flocculation,
        )?;
        if let Some(cap) = self.max_dose_ml {
            if cap < self.minimum_dose_for_flocculation || cap.is_nan() {
                return Err(ConfigError::DoseCapBelowMinimum {
                    cap,
                    minimum: self.minimum_dose_for_flocculation,
                });
            }
        }

        ConfigError::require_positive("rapid_mix_duration", self.rapid_mix_duration)?;
        ConfigError::require_positive("slow_mix_duration", self.slow_mix_duration)?;
        ConfigError::require_positive("minimum_rapid_mix_time", self.minimum_rapid_mix_time)?;

        ConfigError::require_non_negative("growth_rate", self.growth_rate)?;
        ConfigError::require_non_negative("shear_factor", self.shear_factor)?;
        ConfigError::require_non_negative("coalescence_rate", self.coalescence_rate)?;
        ConfigError::require_non_negative("settling_threshold", self.settling_threshold)?;
        ConfigError::require_non_negative("floc_seed_per_ml", self.floc_seed_per_ml)?;
        ConfigError::require_positive("max_floc_size", self.max_floc_size)?;
        ConfigError::require_non_negative(
            "consumption_rpm_threshold",
            self.consumption_rpm_threshold,
        )?;
        ConfigError::require_positive("settle_spawn_threshold", self.settle_spawn_threshold)?;

        self.efficiency.validate()?;
        self.turbidity.validate()
    }
}

fn validate_band(band: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min >= 0.0 && min <= max && max.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidRpmBand { band, min, max })
    }
}
