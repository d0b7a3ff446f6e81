//! JarTest Core - Coagulation/Flocculation Jar-Test Engine
//!
//! Simulates the bench jar test: coagulant is dosed into turbid water, the
//! jar is stirred through rapid mix, slow mix and settling, and turbidity
//! falls as flocs form and drop out.
//!
//! The engine is split into four components, leaves first:
//! 1. **DoseAccumulator**: cumulative dose and the flocculation threshold
//! 2. **PhaseController**: RPM/time driven phase machine with a rapid-mix latch
//! 3. **ReactionModel**: floc growth, shear, settling and dose consumption
//! 4. **TurbidityModel**: proportional or target-seeking turbidity
//!
//! All of them operate on a plain [`JarState`]; [`Jar`] owns one state and
//! exposes it through the [`JarEngine`] trait.
//!
//! # Example
//!
//! ```
//! use jartest_core::{Jar, JarConfig, JarEngine, Phase};
//!
//! let mut jar = Jar::new(JarConfig::default()).unwrap();
//! jar.add_dose(6.0);
//! jar.set_rpm(100.0);
//! jar.tick(1.0);
//!
//! assert_eq!(jar.current_phase(), Phase::RapidMix);
//! ```

pub mod config;
pub mod dose;
pub mod error;
pub mod events;
pub mod jar;
pub mod phase;
pub mod reaction;
pub mod state;
pub mod turbidity;

// Re-export key types for convenience
pub use config::{EfficiencyModel, JarConfig, TurbidityPolicy};
pub use dose::DoseAccumulator;
pub use error::ConfigError;
pub use events::{JarEvent, SettleEvent};
pub use jar::{step, Jar, JarEngine, StepOutcome};
pub use phase::{Phase, PhaseController, PhaseTransition};
pub use reaction::{ReactionModel, ReactionStep};
pub use state::{JarState, NEUTRAL_PH};
pub use turbidity::TurbidityModel;
