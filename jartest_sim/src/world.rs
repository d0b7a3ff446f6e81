//! SimWorld - the simulation harness container.

use crate::bank::{JarBank, DEFAULT_JAR_COUNT};
use crate::error::SimError;
use crate::monitor::InvariantMonitor;
use crate::program::StirProgram;

use jartest_core::{JarConfig, JarEngine, JarEvent, JarState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::path::Path;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Number of jars on the stirrer
    pub num_jars: usize,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Maximum simulation duration in seconds (0 = unlimited)
    pub max_duration_secs: f64,

    /// Simulated seconds per real second
    pub time_scale: f64,

    /// Standard deviation of delivered dose (mL); 0 disables jitter
    pub dose_jitter_std: f64,

    /// Configuration shared by every jar
    pub jar: JarConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            num_jars: DEFAULT_JAR_COUNT,
            tick_rate_hz: 20,
            max_duration_secs: 0.0,
            time_scale: 1.0,
            dose_jitter_std: 0.0,
            jar: JarConfig::default(),
        }
    }
}

impl SimConfig {
    /// Simulated seconds advanced per tick.
    pub fn dt(&self) -> f64 {
        self.time_scale / self.tick_rate_hz as f64
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.tick_rate_hz == 0 {
            return Err(SimError::setup("tick rate must be at least 1 Hz"));
        }
        if !(self.time_scale > 0.0 && self.time_scale.is_finite()) {
            return Err(SimError::setup(format!(
                "time scale must be positive, got {}",
                self.time_scale
            )));
        }
        if !(self.dose_jitter_std >= 0.0 && self.dose_jitter_std.is_finite()) {
            return Err(SimError::setup(format!(
                "dose jitter must be non-negative, got {}",
                self.dose_jitter_std
            )));
        }
        Ok(())
    }
}

/// Reads a jar configuration from a JSON file.
///
/// Missing fields fall back to the defaults.
pub fn load_jar_config(path: impl AsRef<Path>) -> Result<JarConfig, SimError> {
    let path = path.as_ref();
    let text =
        std::fs::read_to_string(path).map_err(|e| SimError::io(path.display().to_string(), e))?;
    let config: JarConfig = serde_json::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

/// The SimWorld - a jar bank, its stirrer program and a virtual clock.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    bank: JarBank,

    program: StirProgram,

    /// Clock time at which the current program started
    program_start: f64,

    monitor: InvariantMonitor,

    /// RNG for pipette jitter
    dose_rng: ChaCha8Rng,

    /// Current simulation time (seconds)
    time: f64,

    tick_count: u64,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;

        // Derive the jitter seed separately from the master seed
        let dose_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let bank = JarBank::new(config.num_jars, config.jar.clone())?;

        Ok(Self {
            config,
            bank,
            program: StirProgram::new(),
            program_start: 0.0,
            monitor: InvariantMonitor::new(),
            dose_rng: ChaCha8Rng::seed_from_u64(dose_seed),
            time: 0.0,
            tick_count: 0,
        })
    }

    /// Replaces the stirrer program; it starts at the current time.
    pub fn set_program(&mut self, program: StirProgram) {
        debug!(
            "Loaded stir program with {} steps ({:.0}s)",
            program.steps().len(),
            program.total_duration()
        );
        self.program = program;
        self.program_start = self.time;
    }

    pub fn program(&self) -> &StirProgram {
        &self.program
    }

    /// Seconds since the current program started.
    pub fn program_time(&self) -> f64 {
        self.time - self.program_start
    }

    pub fn bank(&self) -> &JarBank {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut JarBank {
        &mut self.bank
    }

    pub fn monitor(&self) -> &InvariantMonitor {
        &self.monitor
    }

    /// Current simulation time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Current tick count.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn dt(&self) -> f64 {
        self.config.dt()
    }

    /// Pipettes `ml` into one jar, with jitter. Returns the delivered volume.
    pub fn dose_jar(&mut self, index: usize, ml: f64) -> Option<f64> {
        if index >= self.bank.len() {
            return None;
        }
        let delivered = self.jittered(ml);
        self.bank.add_dose(index, delivered);
        Some(delivered)
    }

    /// Pipettes `ml` into every jar. Returns the delivered volumes.
    pub fn dose_all(&mut self, ml: f64) -> Vec<f64> {
        (0..self.bank.len())
            .filter_map(|i| self.dose_jar(i, ml))
            .collect()
    }

    fn jittered(&mut self, ml: f64) -> f64 {
        let std = self.config.dose_jitter_std;
        if std <= 0.0 || ml <= 0.0 || ml.is_nan() {
            return ml;
        }
        match Normal::new(0.0, std) {
            Ok(noise) => (ml + noise.sample(&mut self.dose_rng)).max(0.0),
            Err(_) => ml,
        }
    }

    /// Advances one tick: applies the program RPM, steps every jar and
    /// checks invariants. Returns the events produced, tagged by jar.
    pub fn tick(&mut self) -> Vec<(usize, JarEvent)> {
        let dt = self.dt();
        let rpm = self.program.rpm_at(self.program_time());
        self.bank.set_rpm(rpm);

        let before: Vec<JarState> = self.bank.jars().iter().map(|j| *j.state()).collect();
        let events = self.bank.tick(dt);

        for (index, jar) in self.bank.jars().iter().enumerate() {
            self.monitor
                .observe(self.tick_count, index, &before[index], jar.state(), jar.config());
        }

        self.time += dt;
        self.tick_count += 1;
        events
    }

    /// Resets every jar. The clock and program keep running.
    pub fn reset_jars(&mut self) {
        self.bank.reset_all();
    }

    /// True once the configured maximum duration has elapsed.
    pub fn is_expired(&self) -> bool {
        self.config.max_duration_secs > 0.0 && self.time >= self.config.max_duration_secs
    }

    /// Mean NTU over all jars.
    pub fn mean_ntu(&self) -> f64 {
        let jars = self.bank.jars();
        jars.iter().map(|j| j.turbidity_ntu()).sum::<f64>() / jars.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jartest_core::Phase;
    use proptest::prelude::*;

    fn world(config: SimConfig) -> SimWorld {
        SimWorld::new(config).unwrap()
    }

    #[test]
    fn test_rejects_bad_setup() {
        for config in [
            SimConfig { tick_rate_hz: 0, ..Default::default() },
            SimConfig { time_scale: 0.0, ..Default::default() },
            SimConfig { dose_jitter_std: -1.0, ..Default::default() },
            SimConfig { num_jars: 0, ..Default::default() },
        ] {
            assert!(SimWorld::new(config).is_err());
        }
    }

    #[test]
    fn test_time_scale_multiplies_dt() {
        let mut w = world(SimConfig {
            tick_rate_hz: 10,
            time_scale: 5.0,
            ..Default::default()
        });
        assert_eq!(w.dt(), 0.5);

        for _ in 0..4 {
            w.tick();
        }
        assert_eq!(w.tick_count(), 4);
        assert_eq!(w.time(), 2.0);
    }

    #[test]
    fn test_program_drives_rpm() {
        let mut w = world(SimConfig {
            tick_rate_hz: 10,
            ..Default::default()
        });
        w.dose_all(6.0);
        w.set_program(StirProgram::constant(100.0, 1.0).then(30.0, 1.0));

        w.tick();
        assert_eq!(w.bank().rpm(), 100.0);
        assert!(w.bank().jars().iter().all(|j| j.current_phase() == Phase::RapidMix));

        while w.program_time() < 1.5 {
            w.tick();
        }
        assert_eq!(w.bank().rpm(), 30.0);
        assert!(w.monitor().is_clean());
    }

    #[test]
    fn test_jitter_is_seeded() {
        let config = SimConfig {
            dose_jitter_std: 0.5,
            ..Default::default()
        };
        let a = world(config.clone()).dose_all(6.0);
        let b = world(config.clone()).dose_all(6.0);
        let c = world(SimConfig { seed: 7, ..config }).dose_all(6.0);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.iter().any(|&ml| ml != 6.0));
    }

    #[test]
    fn test_no_jitter_delivers_exact_dose() {
        let mut w = world(SimConfig::default());
        assert_eq!(w.dose_jar(0, 6.0), Some(6.0));
        assert_eq!(w.dose_jar(99, 6.0), None);
        assert_eq!(w.bank().jar(0).unwrap().dose_ml(), 6.0);
    }

    #[test]
    fn test_expiry() {
        let mut w = world(SimConfig {
            tick_rate_hz: 1,
            max_duration_secs: 3.0,
            ..Default::default()
        });
        assert!(!w.is_expired());
        for _ in 0..3 {
            w.tick();
        }
        assert!(w.is_expired());
    }

    #[test]
    fn test_load_jar_config_missing_file() {
        let err = load_jar_config("/nonexistent/jar.json").unwrap_err();
        assert!(matches!(err, SimError::Io { .. }));
    }

    #[test]
    fn test_load_jar_config_from_json() {
        let path = std::env::temp_dir().join("jartest_sim_load_config.json");
        std::fs::write(&path, r#"{ "minimum_dose_for_flocculation": 2.5 }"#).unwrap();

        let config = load_jar_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.minimum_dose_for_flocculation, 2.5);
        assert_eq!(config.water_volume_ml, JarConfig::default().water_volume_ml);
    }

    proptest! {
        #[test]
        fn prop_random_programs_keep_invariants(
            steps in prop::collection::vec((0.0f64..200.0, 0.5f64..20.0), 1..6),
            dose in 0.0f64..15.0,
            ph in 0.0f64..14.0,
            jitter in 0.0f64..1.0,
            seed in any::<u64>(),
        ) {
            let mut w = world(SimConfig {
                seed,
                num_jars: 3,
                tick_rate_hz: 4,
                dose_jitter_std: jitter,
                ..Default::default()
            });
            w.dose_all(dose);
            for i in 0..3 {
                w.bank_mut().set_ph(i, ph);
            }

            let program = steps
                .iter()
                .fold(StirProgram::new(), |p, &(rpm, secs)| p.then(rpm, secs));
            let end = program.total_duration() + 5.0;
            w.set_program(program);

            while w.program_time() < end {
                w.tick();
            }

            prop_assert!(w.monitor().is_clean(), "{:?}", w.monitor().violations());
        }
    }
}
