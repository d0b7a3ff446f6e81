//! Stirrer programs - timed sequences of stirrer speeds.
//!
//! A bench jar test is run by setting the gang stirrer to a speed for a
//! fixed time, then the next speed, and so on. After the last step the
//! stirrer stops.

use serde::{Deserialize, Serialize};

/// Settling time of the bench protocol (30 min).
pub const STANDARD_SETTLE_SECS: f64 = 1800.0;

/// One stirrer setting held for a fixed time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StirStep {
    pub rpm: f64,
    pub duration_secs: f64,
}

/// An ordered list of stirrer settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StirProgram {
    steps: Vec<StirStep>,
}

impl StirProgram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step. Non-positive durations are skipped.
    pub fn then(mut self, rpm: f64, duration_secs: f64) -> Self {
        if duration_secs > 0.0 {
            self.steps.push(StirStep {
                rpm: rpm.max(0.0),
                duration_secs,
            });
        }
        self
    }

    /// The classic protocol: 1 min rapid mix at 100 RPM, 20 min slow mix at
    /// 30 RPM, then `settle_secs` of settling.
    ///
    /// Pass [`STANDARD_SETTLE_SECS`] for the full bench run; scenarios use a
    /// shorter observation window.
    pub fn standard(settle_secs: f64) -> Self {
        Self::new()
            .then(100.0, 60.0)
            .then(30.0, 1200.0)
            .then(0.0, settle_secs)
    }

    /// A single speed held for `duration_secs`.
    pub fn constant(rpm: f64, duration_secs: f64) -> Self {
        Self::new().then(rpm, duration_secs)
    }

    pub fn steps(&self) -> &[StirStep] {
        &self.steps
    }

    pub fn total_duration(&self) -> f64 {
        self.steps.iter().map(|s| s.duration_secs).sum()
    }

    /// Stirrer speed at `t` seconds into the program; 0 after the end.
    pub fn rpm_at(&self, t: f64) -> f64 {
        let mut start = 0.0;
        for step in &self.steps {
            let end = start + step.duration_secs;
            if t < end {
                return step.rpm;
            }
            start = end;
        }
        0.0
    }

    /// True once `t` is past the last step.
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.total_duration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_program_schedule() {
        let program = StirProgram::standard(600.0);

        assert_eq!(program.steps().len(), 3);
        assert_eq!(program.total_duration(), 1860.0);
        assert_eq!(program.rpm_at(0.0), 100.0);
        assert_eq!(program.rpm_at(59.9), 100.0);
        assert_eq!(program.rpm_at(60.0), 30.0);
        assert_eq!(program.rpm_at(1259.0), 30.0);
        assert_eq!(program.rpm_at(1300.0), 0.0);
    }

    #[test]
    fn test_bench_protocol_settles_half_an_hour() {
        let program = StirProgram::standard(STANDARD_SETTLE_SECS);

        assert_eq!(program.total_duration(), 3060.0);
        assert_eq!(program.steps()[2].rpm, 0.0);
        assert_eq!(program.steps()[2].duration_secs, 1800.0);
    }

    #[test]
    fn test_stops_after_last_step() {
        let program = StirProgram::constant(100.0, 10.0);

        assert!(!program.is_finished(9.0));
        assert!(program.is_finished(10.0));
        assert_eq!(program.rpm_at(25.0), 0.0);
    }

    #[test]
    fn test_skips_empty_steps() {
        let program = StirProgram::new().then(100.0, 0.0).then(-20.0, 5.0);

        assert_eq!(program.steps().len(), 1);
        assert_eq!(program.rpm_at(1.0), 0.0);
    }
}
