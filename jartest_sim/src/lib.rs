//! Jar-Test Deterministic Simulation Harness
//!
//! This crate puts a bench of simulated jars on a virtual gang stirrer and
//! runs scripted jar tests against them, deterministically.
//!
//! # Core Principle: One Seed, One Run
//!
//! Everything that could vary between runs is controlled:
//! - **Time**: a virtual clock advanced by a fixed `dt` per tick
//! - **Stirring**: a [`StirProgram`] of timed RPM steps
//! - **Randomness**: pipette jitter drawn from a ChaCha RNG seeded once
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        SimWorld                          │
//! │  ┌────────────────┐   rpm_at(t)   ┌───────────────────┐  │
//! │  │  StirProgram   │──────────────►│     JarBank       │  │
//! │  └────────────────┘               │  ┌─────┐ ┌─────┐  │  │
//! │  ┌────────────────┐  dose_jar()   │  │ Jar │ │ Jar │… │  │
//! │  │ ChaCha8 jitter │──────────────►│  └─────┘ └─────┘  │  │
//! │  └────────────────┘               └─────────┬─────────┘  │
//! │                                   before/after│ states    │
//! │                               ┌─────────────▼─────────┐  │
//! │                               │   InvariantMonitor    │  │
//! │                               └───────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use jartest_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42, 6)
//!     .with_duration(300.0)
//!     .run(ScenarioId::StandardProtocol);
//! assert!(result.passed);
//! ```

mod bank;
mod error;
mod exporter;
mod monitor;
mod program;
mod runner;
mod world;
pub mod scenarios;

pub use bank::{JarBank, DEFAULT_JAR_COUNT};
pub use error::SimError;
pub use exporter::{JarFrame, SimEvent, SimExport, SimFrame};
pub use monitor::{InvariantMonitor, Violation, ViolationKind};
pub use program::{StirProgram, StirStep, STANDARD_SETTLE_SECS};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{load_jar_config, SimConfig, SimWorld};
