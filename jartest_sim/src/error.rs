//! Error types for the simulation harness.

use jartest_core::ConfigError;
use thiserror::Error;

/// Errors raised while setting up or exporting a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Jar configuration rejected by the engine
    #[error("Invalid jar configuration: {0}")]
    Config(#[from] ConfigError),

    /// Reading a config file or writing an export failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Harness parameters that cannot be simulated
    #[error("Invalid simulation setup: {0}")]
    Setup(String),
}

impl SimError {
    /// Creates an I/O error tagged with the offending path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a setup error.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }
}
