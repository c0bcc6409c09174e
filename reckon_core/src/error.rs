//! Error types for the evaluation engine.

use crate::evaluation::EvaluationOutcome;
use reckon_env::ObjectId;
use thiserror::Error;

/// Failures while decoding a spatial variant record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Payload ended before the record did
    #[error("Truncated spatial record: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    /// Payload is empty (no discriminant octet)
    #[error("Empty spatial record")]
    Empty,

    /// Discriminant outside 0..=9
    #[error("Unknown spatial discriminant: {0}")]
    UnknownDiscriminant(u8),

    /// Frozen octet other than 0 or 1
    #[error("Invalid frozen flag: {0}")]
    InvalidFrozenFlag(u8),

    /// Floating point representation is not one of the four IEEE-754 forms
    #[error("Unsupported float encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Failures while decoding the user-supplied time tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeTagError {
    /// Neither 4 (DIS) nor 8 (hex) bytes
    #[error("Time tag has invalid length {0}")]
    InvalidLength(usize),

    /// 8-byte tag that is not an ASCII hex string
    #[error("Time tag is not a hex string: {0:?}")]
    NotHex(String),

    /// Offset cannot be represented in the requested tag format
    #[error("Offset of {0} microseconds does not fit the time tag format")]
    OutOfRange(i64),
}

/// Failures of a single dead-reckoning computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReckonError {
    /// Discriminant 1 is static and is never dead reckoned
    #[error("Algorithm 1 is static and does not dead reckon")]
    StaticModel,

    /// Discriminant without an extrapolation formula
    #[error("Incorrect algorithm provided: {0}")]
    UnsupportedModel(u8),

    /// Input vector without exactly three components
    #[error("Incorrect input vector length for {name}: {len}")]
    MalformedVector { name: &'static str, len: usize },
}

/// Failures while ingesting one attribute update.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    #[error("Failed to decode spatial attribute: {0}")]
    Decode(#[from] DecodeError),

    #[error("Object {0} has not been discovered")]
    UndiscoveredObject(ObjectId),
}

/// Test-parameter loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unable to parse test parameters: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unable to read test parameters: {0}")]
    Io(#[from] std::io::Error),

    #[error("{name} must be non-negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("{name} range is empty: min {min} > max {max}")]
    InvalidRange { name: &'static str, min: f64, max: f64 },

    #[error("testTimeout of {0} seconds is out of range")]
    TimeoutOutOfRange(f64),
}

/// Run-level outcomes other than a pass.
#[derive(Debug, Clone, Error)]
pub enum RunError {
    /// No object produced more than two samples, so nothing could be compared
    #[error("Insufficient data was received")]
    InsufficientData,

    #[error("{failures} Dead Reckoning calculations failed")]
    DeadReckoningFailures {
        failures: usize,
        outcome: Box<EvaluationOutcome>,
    },

    #[error("Timestamps are required but non timestamped spatial information was received from {} object(s)", objects.len())]
    NonTimestampedUpdates {
        objects: Vec<ObjectId>,
        outcome: Box<EvaluationOutcome>,
    },
}

impl RunError {
    /// True when no comparison could be attempted.
    pub fn is_inconclusive(&self) -> bool {
        matches!(self, RunError::InsufficientData)
    }

    /// The evaluation statistics, when an evaluation pass ran.
    pub fn outcome(&self) -> Option<&EvaluationOutcome> {
        match self {
            RunError::InsufficientData => None,
            RunError::DeadReckoningFailures { outcome, .. }
            | RunError::NonTimestampedUpdates { outcome, .. } => Some(outcome),
        }
    }
}
