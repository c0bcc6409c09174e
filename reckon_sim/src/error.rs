//! Errors raised by the simulation harness.

use reckon_core::{ConfigError, DecodeError, TimeTagError};
use reckon_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("Encoding failed: {0}")]
    Encode(#[from] DecodeError),

    #[error("Time tag: {0}")]
    TimeTag(#[from] TimeTagError),

    #[error("Invalid noise standard deviation: {0}")]
    InvalidNoise(f64),

    #[error("Config: {0}")]
    Config(#[from] ConfigError),

    #[error("Feed: {0}")]
    Env(#[from] EnvError),

    #[error("I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("Capture line {line}: {source}")]
    CaptureParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
}
