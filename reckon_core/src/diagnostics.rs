//! Diagnostics channel
//!
//! Components report what they do through a `Diagnostics` sink handed to
//! them at construction. `TracingDiagnostics` forwards to `tracing`;
//! `RecordingDiagnostics` keeps events for inspection.

use crate::evaluation::{ObjectTally, PairReport};
use crate::error::TimeTagError;
use reckon_env::ObjectId;
use std::sync::Mutex;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

/// Why a pair was accepted without extrapolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Previous sample uses the static model
    Static,
    /// Current sample is frozen
    Frozen,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// Update discarded before reaching the history
    UpdateDropped { object: ObjectId, reason: String },
    /// Update for an object that was never discovered
    UndiscoveredObject { object: ObjectId },
    /// Time tag unusable, receive time used instead
    TimestampFallback {
        object: ObjectId,
        error: TimeTagError,
        received: SystemTime,
    },
    PairSkipped { object: ObjectId, reason: SkipReason },
    /// Pair could not be extrapolated and counts as a failure
    PairFailed { object: ObjectId, reason: String },
    PairEvaluated(Box<PairReport>),
    ObjectSummary { object: ObjectId, tally: ObjectTally },
    RunSummary {
        successes: usize,
        failures: usize,
        success: bool,
    },
}

/// Sink for diagnostic events.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, event: DiagnosticEvent);
}

impl<D: Diagnostics + ?Sized> Diagnostics for std::sync::Arc<D> {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::UpdateDropped { object, reason } => {
                error!(%object, %reason, "Dropped spatial update");
            }
            DiagnosticEvent::UndiscoveredObject { object } => {
                info!(%object, "Received attribute values but object has not been discovered, ignoring");
            }
            DiagnosticEvent::TimestampFallback { object, error, .. } => {
                warn!(%object, %error, "Using receive time for non timestamped update");
            }
            DiagnosticEvent::PairSkipped { object, reason } => {
                debug!(%object, ?reason, "Pair accepted without dead reckoning");
            }
            DiagnosticEvent::PairFailed { object, reason } => {
                error!(%object, %reason, "Dead reckoning pair failed");
            }
            DiagnosticEvent::PairEvaluated(report) => {
                let r = &*report;
                info!(
                    object = %r.object,
                    model = r.model.name(),
                    delta_t = r.delta_t,
                    distance_travelled = r.distance_travelled,
                    position_deviation = r.position.magnitude,
                    dx = r.position.dx,
                    dy = r.position.dy,
                    dz = r.position.dz,
                    orientation_deviation = r.orientation.map(|o| o.norm),
                    passed = r.passed,
                    "Dead reckoning pair evaluated"
                );
                if r.orientation.is_none() {
                    warn!(model = r.model.name(), "Orientation not calculated by model");
                }
            }
            DiagnosticEvent::ObjectSummary { object, tally } => {
                info!(
                    %object,
                    successes = tally.successes,
                    failures = tally.failures,
                    success_rate = tally.success_rate().map(|r| r * 100.0),
                    "Object summary"
                );
            }
            DiagnosticEvent::RunSummary {
                successes,
                failures,
                success,
            } => {
                info!(successes, failures, success, "Evaluation complete");
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events
            .lock()
            .map(|e| e.iter().filter(|ev| predicate(ev)).count())
            .unwrap_or(0)
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, event: DiagnosticEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
