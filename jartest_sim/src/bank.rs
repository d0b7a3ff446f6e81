//! Gang stirrer - a row of jars sharing one stirrer speed.
//!
//! Each jar keeps its own dose, pH and state. The stirrer speed is applied
//! to every jar at once, the way a bench gang stirrer drives all paddles
//! from one motor.

use crate::error::SimError;
use jartest_core::{Jar, JarConfig, JarEngine, JarEvent};
use tracing::debug;

/// Number of jars on a standard bench stirrer.
pub const DEFAULT_JAR_COUNT: usize = 6;

/// A bank of jars driven by a shared RPM.
#[derive(Debug, Clone)]
pub struct JarBank {
    jars: Vec<Jar>,
    selected: usize,
    rpm: f64,
}

impl JarBank {
    /// Creates `count` identical jars.
    pub fn new(count: usize, config: JarConfig) -> Result<Self, SimError> {
        Self::from_configs(vec![config; count])
    }

    /// Creates one jar per configuration.
    pub fn from_configs(configs: Vec<JarConfig>) -> Result<Self, SimError> {
        if configs.is_empty() {
            return Err(SimError::setup("a jar bank needs at least one jar"));
        }

        let jars = configs
            .into_iter()
            .map(Jar::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            jars,
            selected: 0,
            rpm: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.jars.len()
    }

    /// Always false; a bank holds at least one jar.
    pub fn is_empty(&self) -> bool {
        self.jars.is_empty()
    }

    pub fn jar(&self, index: usize) -> Option<&Jar> {
        self.jars.get(index)
    }

    pub fn jar_mut(&mut self, index: usize) -> Option<&mut Jar> {
        self.jars.get_mut(index)
    }

    pub fn jars(&self) -> &[Jar] {
        &self.jars
    }

    /// Selects the jar that manual dosing targets. Returns false if out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.jars.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_jar(&self) -> &Jar {
        &self.jars[self.selected]
    }

    pub fn selected_jar_mut(&mut self) -> &mut Jar {
        &mut self.jars[self.selected]
    }

    /// Current shared stirrer speed.
    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    /// Sets the stirrer speed on every jar.
    pub fn set_rpm(&mut self, rpm: f64) {
        for jar in &mut self.jars {
            jar.set_rpm(rpm);
        }
        self.rpm = self.jars[0].rpm();
    }

    /// Doses one jar. Returns true if the dose made it sufficient.
    ///
    /// The jar's `SufficiencyReached` event is reported with the next tick.
    pub fn add_dose(&mut self, index: usize, ml: f64) -> bool {
        let Some(jar) = self.jars.get_mut(index) else {
            return false;
        };
        let was_sufficient = jar.has_sufficient_chemical();
        jar.add_dose(ml);
        !was_sufficient && jar.has_sufficient_chemical()
    }

    /// Sets one jar's pH. Returns false if out of range.
    pub fn set_ph(&mut self, index: usize, ph: f64) -> bool {
        match self.jars.get_mut(index) {
            Some(jar) => {
                jar.set_ph(ph);
                true
            }
            None => false,
        }
    }

    /// Advances every jar by `dt` and collects their events, tagged by jar index.
    pub fn tick(&mut self, dt: f64) -> Vec<(usize, JarEvent)> {
        let mut events = Vec::new();
        for (index, jar) in self.jars.iter_mut().enumerate() {
            jar.tick(dt);
            events.extend(jar.drain_events().into_iter().map(|e| (index, e)));
        }
        events
    }

    /// Resets every jar and stops the stirrer.
    pub fn reset_all(&mut self) {
        for jar in &mut self.jars {
            jar.reset();
        }
        self.rpm = 0.0;
        self.selected = 0;
        debug!("Reset all {} jars", self.jars.len());
    }

    /// Index and NTU of the clearest jar.
    pub fn clearest(&self) -> Option<(usize, f64)> {
        self.jars
            .iter()
            .enumerate()
            .map(|(i, jar)| (i, jar.turbidity_ntu()))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jartest_core::Phase;

    #[test]
    fn test_empty_bank_rejected() {
        assert!(JarBank::new(0, JarConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = JarConfig {
            water_volume_ml: 0.0,
            ..JarConfig::default()
        };
        assert!(matches!(
            JarBank::new(2, config),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn test_shared_rpm_reaches_every_jar() {
        let mut bank = JarBank::new(DEFAULT_JAR_COUNT, JarConfig::default()).unwrap();
        bank.set_rpm(100.0);

        assert_eq!(bank.rpm(), 100.0);
        assert!(bank.jars().iter().all(|j| j.rpm() == 100.0));

        bank.set_rpm(-5.0);
        assert_eq!(bank.rpm(), 0.0);
    }

    #[test]
    fn test_per_jar_dosing() {
        let mut bank = JarBank::new(3, JarConfig::default()).unwrap();

        assert!(!bank.add_dose(1, 4.0));
        assert!(bank.add_dose(1, 2.0));
        assert!(!bank.add_dose(7, 10.0));

        assert_eq!(bank.jar(0).unwrap().dose_ml(), 0.0);
        assert_eq!(bank.jar(1).unwrap().dose_ml(), 6.0);
        assert!(bank.jar(1).unwrap().has_sufficient_chemical());
    }

    #[test]
    fn test_only_dosed_jars_start_mixing() {
        let mut bank = JarBank::new(2, JarConfig::default()).unwrap();
        bank.add_dose(0, 6.0);
        bank.set_rpm(100.0);

        let events = bank.tick(0.1);

        assert_eq!(bank.jar(0).unwrap().current_phase(), Phase::RapidMix);
        assert_eq!(bank.jar(1).unwrap().current_phase(), Phase::Idle);
        assert!(events.iter().all(|(i, _)| *i == 0));
        assert!(!events.is_empty());
    }

    #[test]
    fn test_selection() {
        let mut bank = JarBank::new(3, JarConfig::default()).unwrap();
        assert!(bank.select(2));
        assert!(!bank.select(3));
        assert_eq!(bank.selected(), 2);

        bank.selected_jar_mut().add_dose(6.0);
        assert_eq!(bank.selected_jar().dose_ml(), 6.0);
    }

    #[test]
    fn test_reset_all_restores_fresh_jars() {
        let config = JarConfig::default();
        let mut bank = JarBank::new(2, config.clone()).unwrap();
        bank.add_dose(0, 6.0);
        bank.set_ph(1, 5.0);
        bank.set_rpm(100.0);
        for _ in 0..200 {
            bank.tick(0.1);
        }

        bank.reset_all();

        let fresh = Jar::new(config).unwrap();
        for jar in bank.jars() {
            assert_eq!(jar.state(), fresh.state());
            assert_eq!(jar.pending_events(), 0);
        }
        assert_eq!(bank.rpm(), 0.0);
    }

    #[test]
    fn test_clearest_prefers_best_ph() {
        let mut bank = JarBank::new(2, JarConfig::refined()).unwrap();
        bank.set_ph(0, 4.0);
        bank.set_ph(1, 6.75);
        bank.add_dose(0, 6.0);
        bank.add_dose(1, 6.0);
        bank.set_rpm(100.0);
        for _ in 0..300 {
            bank.tick(0.5);
        }

        let (best, ntu) = bank.clearest().unwrap();
        assert_eq!(best, 1);
        assert!(ntu < bank.jar(0).unwrap().turbidity_ntu());
    }
}
