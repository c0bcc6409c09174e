//! Dead-reckoning evaluation
//!
//! Walks each object's history in time order and checks every consecutive
//! pair: the earlier sample is extrapolated with its own model to the
//! later sample's time, and the prediction is scored against the later
//! sample.
//!
//! # Pair checks, in order
//! 1. Previous sample static (discriminant 1): pass.
//! 2. Previous discriminant above 9: fail.
//! 3. Current sample frozen: pass.
//! 4. Otherwise extrapolate and compare against the tolerance bands.
//!
//! Bands are inclusive at both ends. Orientation differences are wrapped
//! into (-π, π] per axis before taking the Euclidean norm.

use crate::dead_reckoning::{DeadReckoningModel, MAX_DISCRIMINANT, STATIC_DISCRIMINANT};
use crate::diagnostics::{DiagnosticEvent, Diagnostics, SkipReason};
use crate::error::{ReckonError, RunError};
use crate::history::{ObjectHistories, SamplePair};
use crate::math::magnitude;
use nalgebra::Vector3;
use reckon_env::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// TOLERANCES
// =============================================================================

/// Inclusive acceptance bands for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Metres
    pub position_min: f64,
    pub position_max: f64,
    /// Radians
    pub orientation_min: f64,
    pub orientation_max: f64,
    /// Position and orientation must both pass
    pub require_both: bool,
    /// Non-timestamped updates fail the run
    pub timestamp_required: bool,
}

impl ToleranceConfig {
    pub fn position_within(&self, deviation: f64) -> bool {
        deviation >= self.position_min && deviation <= self.position_max
    }

    pub fn orientation_within(&self, deviation: f64) -> bool {
        deviation >= self.orientation_min && deviation <= self.orientation_max
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            position_min: 0.0,
            position_max: 1.0,
            orientation_min: 0.0,
            orientation_max: 0.1,
            require_both: true,
            timestamp_required: false,
        }
    }
}

// =============================================================================
// DEVIATIONS
// =============================================================================

/// Predicted minus actual position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deviation {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub magnitude: f64,
}

pub fn position_deviation(predicted: &Vector3<f64>, actual: &Vector3<f64>) -> Deviation {
    let d = predicted - actual;
    Deviation {
        dx: d.x,
        dy: d.y,
        dz: d.z,
        magnitude: magnitude(&d),
    }
}

/// Per-axis wrapped angle differences and their norm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngularDeviation {
    pub d_phi: f64,
    pub d_theta: f64,
    pub d_psi: f64,
    pub norm: f64,
}

/// |a - b| wrapped to [0, π].
#[inline]
pub fn wrapped_angle_difference(a: f64, b: f64) -> f64 {
    let delta = a - b;
    delta.sin().atan2(delta.cos()).abs()
}

pub fn orientation_deviation(predicted: &Vector3<f64>, actual: &Vector3<f64>) -> AngularDeviation {
    let d_phi = wrapped_angle_difference(predicted.x, actual.x);
    let d_theta = wrapped_angle_difference(predicted.y, actual.y);
    let d_psi = wrapped_angle_difference(predicted.z, actual.z);
    AngularDeviation {
        d_phi,
        d_theta,
        d_psi,
        norm: (d_phi * d_phi + d_theta * d_theta + d_psi * d_psi).sqrt(),
    }
}

// =============================================================================
// PAIR RESULTS
// =============================================================================

/// Full numeric trail of one extrapolated pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub object: ObjectId,
    pub model: DeadReckoningModel,
    /// Seconds between the two samples
    pub delta_t: f64,
    pub predicted_position: Vector3<f64>,
    pub actual_position: Vector3<f64>,
    /// None when the model does not compute orientation
    pub predicted_orientation: Option<Vector3<f64>>,
    pub actual_orientation: Vector3<f64>,
    pub position: Deviation,
    pub orientation: Option<AngularDeviation>,
    /// Straight-line distance between the two actual positions
    pub distance_travelled: f64,
    pub position_ok: bool,
    pub orientation_ok: Option<bool>,
    pub passed: bool,
    pub tolerance: ToleranceConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Accepted without extrapolation
    Skipped(SkipReason),
    Evaluated(Box<PairReport>),
    /// No usable model; counts as a failure
    Invalid(ReckonError),
}

impl PairOutcome {
    pub fn passed(&self) -> bool {
        match self {
            PairOutcome::Skipped(_) => true,
            PairOutcome::Evaluated(report) => report.passed,
            PairOutcome::Invalid(_) => false,
        }
    }
}

/// Success and failure counts of one object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ObjectTally {
    pub successes: usize,
    pub failures: usize,
}

impl ObjectTally {
    pub fn record(&mut self, passed: bool) {
        if passed {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    /// successes / (successes + failures); None when nothing was compared.
    pub fn success_rate(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            n => Some(self.successes as f64 / n as f64),
        }
    }
}

/// Statistics of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationOutcome {
    pub per_object: BTreeMap<ObjectId, ObjectTally>,
    pub total: ObjectTally,
    /// No pair failed
    pub success: bool,
}

impl EvaluationOutcome {
    pub fn successes(&self) -> usize {
        self.total.successes
    }

    pub fn failures(&self) -> usize {
        self.total.failures
    }
}

/// Run-level result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Inconclusive,
}

impl Verdict {
    pub fn from_result(result: &Result<EvaluationOutcome, RunError>) -> Self {
        match result {
            Ok(_) => Verdict::Pass,
            Err(e) if e.is_inconclusive() => Verdict::Inconclusive,
            Err(_) => Verdict::Fail,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
            Verdict::Inconclusive => "INCONCLUSIVE",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Scores sample pairs against a tolerance configuration.
pub struct Evaluator<'a> {
    tolerance: ToleranceConfig,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> Evaluator<'a> {
    pub fn new(tolerance: ToleranceConfig, diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            tolerance,
            diagnostics,
        }
    }

    pub fn tolerance(&self) -> &ToleranceConfig {
        &self.tolerance
    }

    /// Checks a single pair and reports the outcome to diagnostics.
    pub fn evaluate_pair(&self, object: &ObjectId, pair: &SamplePair<'_>) -> PairOutcome {
        let outcome = self.check_pair(object, pair);

        let event = match &outcome {
            PairOutcome::Skipped(reason) => DiagnosticEvent::PairSkipped {
                object: object.clone(),
                reason: *reason,
            },
            PairOutcome::Evaluated(report) => DiagnosticEvent::PairEvaluated(report.clone()),
            PairOutcome::Invalid(err) => DiagnosticEvent::PairFailed {
                object: object.clone(),
                reason: err.to_string(),
            },
        };
        self.diagnostics.emit(event);

        outcome
    }

    fn check_pair(&self, object: &ObjectId, pair: &SamplePair<'_>) -> PairOutcome {
        let previous = pair.previous;
        let current = pair.current;
        let discriminant = previous.discriminant();

        if discriminant == STATIC_DISCRIMINANT {
            return PairOutcome::Skipped(SkipReason::Static);
        }
        if discriminant > MAX_DISCRIMINANT {
            return PairOutcome::Invalid(ReckonError::UnsupportedModel(discriminant));
        }
        if current.is_frozen {
            return PairOutcome::Skipped(SkipReason::Frozen);
        }

        let model = match DeadReckoningModel::from_discriminant(discriminant) {
            Ok(model) => model,
            Err(err) => return PairOutcome::Invalid(err),
        };

        let delta_t = pair.delta_seconds();
        let extrapolation = model.extrapolate(&previous.kinematic_state(), delta_t);

        let position = position_deviation(&extrapolation.position, &current.position);
        let position_ok = self.tolerance.position_within(position.magnitude);

        let orientation = extrapolation
            .orientation
            .map(|predicted| orientation_deviation(&predicted, &current.orientation));
        let orientation_ok = orientation.map(|o| self.tolerance.orientation_within(o.norm));

        let passed = if self.tolerance.require_both {
            position_ok && orientation_ok.unwrap_or(true)
        } else {
            position_ok || orientation_ok.unwrap_or(false)
        };

        PairOutcome::Evaluated(Box::new(PairReport {
            object: object.clone(),
            model,
            delta_t,
            predicted_position: extrapolation.position,
            actual_position: current.position,
            predicted_orientation: extrapolation.orientation,
            actual_orientation: current.orientation,
            position,
            orientation,
            distance_travelled: magnitude(&(current.position - previous.position)),
            position_ok,
            orientation_ok,
            passed,
            tolerance: self.tolerance,
        }))
    }

    /// One pass over every object's history.
    pub fn evaluate(&self, histories: &ObjectHistories) -> EvaluationOutcome {
        let mut outcome = EvaluationOutcome::default();

        for (object, history) in histories.iter() {
            let mut tally = ObjectTally::default();
            for pair in history.pairs() {
                tally.record(self.evaluate_pair(object, &pair).passed());
            }

            self.diagnostics.emit(DiagnosticEvent::ObjectSummary {
                object: object.clone(),
                tally,
            });

            outcome.total.successes += tally.successes;
            outcome.total.failures += tally.failures;
            outcome.per_object.insert(object.clone(), tally);
        }

        outcome.success = outcome.total.failures == 0;
        self.diagnostics.emit(DiagnosticEvent::RunSummary {
            successes: outcome.total.successes,
            failures: outcome.total.failures,
            success: outcome.success,
        });

        outcome
    }
}
