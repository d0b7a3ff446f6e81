//! The jar engine - one simulated jar driven by host ticks.
//!
//! The engine has no clock of its own. The host supplies stirrer speed,
//! dose and pH between ticks and calls [`JarEngine::tick`] once per frame:
//!
//! ```text
//!   add_dose / set_rpm / set_ph          tick(dt)
//!  ─────────────────────────────►  ┌─────────────────────┐
//!                                  │ 1. PhaseController  │
//!                                  │ 2. ReactionModel    │──► drain_events()
//!                                  │ 3. TurbidityModel   │      (settle, phase, …)
//!                                  │ 4. settle buffer    │
//!                                  └─────────────────────┘
//! ```
//!
//! [`step`] is the same tick as a pure function over a copied state, for
//! hosts that want to keep their own state history.

use crate::config::JarConfig;
use crate::dose::DoseAccumulator;
use crate::error::ConfigError;
use crate::events::JarEvent;
use crate::phase::{Phase, PhaseController};
use crate::reaction::ReactionModel;
use crate::state::JarState;
use crate::turbidity::TurbidityModel;
use tracing::{debug, trace};

/// Result of a pure [`step`].
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub state: JarState,
    pub events: Vec<JarEvent>,
}

/// Advances `state` by `dt` seconds under `config` without mutating it.
///
/// Non-positive or non-finite `dt` leaves the state untouched.
pub fn step(state: &JarState, config: &JarConfig, dt: f64) -> StepOutcome {
    let mut next = *state;
    let mut events = Vec::new();

    if !(dt > 0.0 && dt.is_finite()) {
        return StepOutcome { state: next, events };
    }

    let dose = DoseAccumulator::new(config);
    let reaction = ReactionModel::new(config);
    let turbidity = TurbidityModel::new(config.turbidity);

    dose.refresh(&mut next);

    // 1. Phase machine and mixing latch
    let update = PhaseController::new(config).update(&mut next, dt);
    if let Some(transition) = update.transition {
        events.push(JarEvent::PhaseChanged {
            from: transition.from,
            to: transition.to,
            rpm: next.rpm,
        });
    }
    if update.mixing_completed {
        let seed_floc = reaction.seed(&mut next);
        events.push(JarEvent::MixingComplete {
            rapid_mix_time: next.rapid_mix_accum_time,
            seed_floc,
        });
    }

    // 2. Floc balance and dose consumption
    let reacted = reaction.advance(&mut next, dt);

    // 3. Turbidity
    turbidity.update(&mut next, reacted.efficiency, dt);

    // 4. Settled mass
    if let Some(settled) = reaction.collect_settled(&mut next, reacted.settling_loss) {
        debug!("Settled {:.3} of floc mass", settled.mass);
        events.push(JarEvent::Settled(settled));
    }

    next.clamp_derived(config.max_floc_size);

    trace!(
        "phase={} floc={:.3} turbidity={:.3} growth={:.3} shear={:.3} settling={:.3} dose={:.2}mL",
        next.phase,
        next.floc_size,
        next.turbidity,
        reacted.growth,
        reacted.shear_loss,
        reacted.settling_loss,
        next.dose_ml,
    );

    StepOutcome {
        state: next,
        events,
    }
}

/// The interface a host (renderer, UI, harness) drives a jar through.
pub trait JarEngine {
    /// Advances the simulation by `dt` seconds (already time-scaled).
    fn tick(&mut self, dt: f64);

    fn add_dose(&mut self, ml: f64);

    fn set_rpm(&mut self, rpm: f64);

    /// Sets the pH, clamped to [0, 14].
    fn set_ph(&mut self, value: f64);

    /// Returns the jar to its freshly constructed state.
    fn reset(&mut self);

    fn turbidity_normalized(&self) -> f64;

    /// Turbidity in NTU.
    ///
    /// Under the proportional policy untreated water holds no floc, so a
    /// jar reads 0 NTU until it has been mixed properly.
    fn turbidity_ntu(&self) -> f64;

    fn floc_size(&self) -> f64;

    fn current_phase(&self) -> Phase;

    fn has_sufficient_chemical(&self) -> bool;

    fn has_been_mixed_properly(&self) -> bool;

    /// Takes the events produced since the last drain.
    fn drain_events(&mut self) -> Vec<JarEvent>;
}

/// A single simulated jar.
#[derive(Debug, Clone)]
pub struct Jar {
    config: JarConfig,
    state: JarState,
    pending: Vec<JarEvent>,
}

impl Jar {
    /// Creates a jar, rejecting invalid configurations.
    pub fn new(config: JarConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = JarState::initial(&config);
        Ok(Self {
            config,
            state,
            pending: Vec::new(),
        })
    }

    pub fn config(&self) -> &JarConfig {
        &self.config
    }

    pub fn state(&self) -> &JarState {
        &self.state
    }

    pub fn dose_ml(&self) -> f64 {
        self.state.dose_ml
    }

    pub fn rpm(&self) -> f64 {
        self.state.rpm
    }

    pub fn ph(&self) -> f64 {
        self.state.ph
    }

    /// Coagulation efficiency at the current pH.
    pub fn efficiency(&self) -> f64 {
        self.config.efficiency.efficiency(self.state.ph)
    }

    /// Number of events waiting to be drained.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }
}

impl JarEngine for Jar {
    fn tick(&mut self, dt: f64) {
        let outcome = step(&self.state, &self.config, dt);
        self.state = outcome.state;
        self.pending.extend(outcome.events);
    }

    fn add_dose(&mut self, ml: f64) {
        let dose = DoseAccumulator::new(&self.config);
        if dose.add(&mut self.state, ml) {
            self.pending.push(JarEvent::SufficiencyReached {
                dose_ml: self.state.dose_ml,
            });
        }
    }

    fn set_rpm(&mut self, rpm: f64) {
        self.state.rpm = if rpm.is_finite() { rpm.max(0.0) } else { 0.0 };
    }

    fn set_ph(&mut self, value: f64) {
        if !value.is_nan() {
            self.state.ph = value.clamp(0.0, 14.0);
        }
    }

    fn reset(&mut self) {
        // Replace state and drop queued events together
        self.state = JarState::initial(&self.config);
        self.pending.clear();
        debug!("Jar reset - ready for new test");
    }

    fn turbidity_normalized(&self) -> f64 {
        self.state.turbidity
    }

    fn turbidity_ntu(&self) -> f64 {
        TurbidityModel::new(self.config.turbidity).ntu(self.state.turbidity)
    }

    fn floc_size(&self) -> f64 {
        self.state.floc_size
    }

    fn current_phase(&self) -> Phase {
        self.state.phase
    }

    fn has_sufficient_chemical(&self) -> bool {
        self.state.has_sufficient_chemical
    }

    fn has_been_mixed_properly(&self) -> bool {
        self.state.has_been_mixed_properly
    }

    fn drain_events(&mut self) -> Vec<JarEvent> {
        std::mem::take(&mut self.pending)
    }
}
