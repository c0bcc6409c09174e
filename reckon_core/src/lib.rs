//! Reckon Core - Dead-Reckoning Conformance Engine
//!
//! Checks that the spatial updates an entity publishes agree with the
//! dead-reckoning model it claims to use:
//! 1. **Decode**: spatial variant records into samples (`spatial`)
//! 2. **Timestamp**: rebuild absolute times from cyclic time tags (`time_tag`)
//! 3. **Extrapolate**: DIS models 2-9 (`dead_reckoning`)
//! 4. **Score**: consecutive pairs against tolerance bands (`evaluation`)

pub mod config;
pub mod dead_reckoning;
pub mod diagnostics;
pub mod error;
pub mod evaluation;
pub mod history;
pub mod math;
pub mod spatial;
pub mod time_tag;
pub mod verifier;

// Re-export key types for convenience
pub use config::TestParams;
pub use dead_reckoning::{DeadReckoningModel, Extrapolation, KinematicState};
pub use diagnostics::{DiagnosticEvent, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use error::{ConfigError, DecodeError, IngestError, ReckonError, RunError, TimeTagError};
pub use evaluation::{EvaluationOutcome, Evaluator, ObjectTally, ToleranceConfig, Verdict};
pub use spatial::{Alignment, FloatEncoding, SpatialDecoder, SpatialEncoder, SpatialSample, WireLayout};
pub use verifier::DeadReckoningVerifier;
