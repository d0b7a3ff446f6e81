//! Error types for jar construction.

use thiserror::Error;

/// A jar configuration that violates the construction contract.
///
/// Tick-time operations never fail; everything that could make the
/// numeric model meaningless is rejected here instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Jar capacity must be strictly positive
    #[error("Water volume must be positive, got {0} mL")]
    InvalidWaterVolume(f64),

    /// RPM band with negative bounds or min above max
    #[error("Invalid {band} RPM band: [{min}, {max}]")]
    InvalidRpmBand {
        band: &'static str,
        min: f64,
        max: f64,
    },

    /// Parameter that must be > 0
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    /// Parameter that must be >= 0
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    /// Final turbidity floor outside the raw-water range
    #[error("Minimum final turbidity {min_final} NTU outside [0, {initial}]")]
    InvalidNtuRange { initial: f64, min_final: f64 },

    /// Dose cap that would make flocculation unreachable
    #[error("Dose cap {cap} mL is below the flocculation minimum {minimum} mL")]
    DoseCapBelowMinimum { cap: f64, minimum: f64 },
}

impl ConfigError {
    /// Checks that `value` is strictly positive (NaN fails).
    pub fn require_positive(name: &'static str, value: f64) -> Result<(), Self> {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(Self::NonPositive { name, value })
        }
    }

    /// Checks that `value` is zero or positive (NaN fails).
    pub fn require_non_negative(name: &'static str, value: f64) -> Result<(), Self> {
        if value >= 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(Self::Negative { name, value })
        }
    }
}
