//! Dead-reckoning verifier
//!
//! Owns the ingestion state of one test run. Updates arrive through
//! `on_update` while the session is subscribed; once ingestion has stopped,
//! `run_evaluation` scores the collected histories and decides the run.
//!
//! ```ignore
//! let mut verifier = DeadReckoningVerifier::new(ctx, &params, TracingDiagnostics);
//! while let Some(update) = source.recv().await {
//!     let _ = verifier.on_update(&update);
//! }
//! let verdict = Verdict::from_result(&verifier.run_evaluation());
//! ```

use crate::config::TestParams;
use crate::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::error::{IngestError, RunError};
use crate::evaluation::{EvaluationOutcome, Evaluator, ToleranceConfig};
use crate::history::{ObjectHistories, SampleHistory};
use crate::spatial::SpatialDecoder;
use crate::time_tag::{TimeReconstructor, TimestampSource};
use reckon_env::{AttributeUpdate, ObjectId, ReckonContext};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::SystemTime;

pub struct DeadReckoningVerifier<C: ReckonContext, D: Diagnostics> {
    ctx: Arc<C>,
    diagnostics: D,
    tolerance: ToleranceConfig,
    decoder: SpatialDecoder,
    histories: ObjectHistories,
    reconstructor: TimeReconstructor,
    /// Discovered objects; `None` accepts every object
    discovered: Option<BTreeSet<ObjectId>>,
}

impl<C: ReckonContext, D: Diagnostics> DeadReckoningVerifier<C, D> {
    pub fn new(ctx: Arc<C>, params: &TestParams, diagnostics: D) -> Self {
        Self {
            ctx,
            diagnostics,
            tolerance: params.tolerance(),
            decoder: SpatialDecoder::new(params.wire_layout),
            histories: ObjectHistories::new(),
            reconstructor: TimeReconstructor::new(),
            discovered: None,
        }
    }

    /// Only accept updates for objects passed to `discover`.
    pub fn with_discovery_gating(mut self) -> Self {
        self.discovered = Some(BTreeSet::new());
        self
    }

    /// Registers a discovered object. Returns false if it was already known.
    pub fn discover(&mut self, object: ObjectId) -> bool {
        match &mut self.discovered {
            Some(known) => known.insert(object),
            None => true,
        }
    }

    /// Forgets a discovered object. Its samples are kept for evaluation.
    pub fn remove(&mut self, object: &ObjectId) -> bool {
        match &mut self.discovered {
            Some(known) => known.remove(object),
            None => false,
        }
    }

    /// Ingests one attribute update, returning the timestamp it was stored under.
    pub fn on_update(&mut self, update: &AttributeUpdate) -> Result<SystemTime, IngestError> {
        // Receive time first, before any decoding work
        let now = self.ctx.system_time();
        let object = &update.object;

        if let Some(known) = &self.discovered {
            if !known.contains(object) {
                self.diagnostics.emit(DiagnosticEvent::UndiscoveredObject {
                    object: object.clone(),
                });
                return Err(IngestError::UndiscoveredObject(object.clone()));
            }
        }

        let sample = match self.decoder.decode(&update.payload) {
            Ok(sample) => sample,
            Err(err) => {
                self.diagnostics.emit(DiagnosticEvent::UpdateDropped {
                    object: object.clone(),
                    reason: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let previous = self.histories.get(object).and_then(SampleHistory::last_time);
        let assignment = self.reconstructor.assign(object, &update.tag, previous, now);

        if let TimestampSource::ReceiveTime(error) = &assignment.source {
            self.diagnostics.emit(DiagnosticEvent::TimestampFallback {
                object: object.clone(),
                error: error.clone(),
                received: now,
            });
        }

        self.histories.entry(object).insert(assignment.timestamp, sample);
        Ok(assignment.timestamp)
    }

    /// True iff at least one object has more than two stored samples.
    pub fn is_sufficient_data_received(&self) -> bool {
        self.histories.has_sufficient_data()
    }

    /// Scores every stored pair and decides the run.
    ///
    /// Ingestion must have stopped before this is called.
    pub fn run_evaluation(&self) -> Result<EvaluationOutcome, RunError> {
        if !self.is_sufficient_data_received() {
            return Err(RunError::InsufficientData);
        }

        let outcome = Evaluator::new(self.tolerance, &self.diagnostics).evaluate(&self.histories);

        if outcome.failures() > 0 {
            return Err(RunError::DeadReckoningFailures {
                failures: outcome.failures(),
                outcome: Box::new(outcome),
            });
        }

        let untimed = self.reconstructor.non_timestamped();
        if self.tolerance.timestamp_required && !untimed.is_empty() {
            return Err(RunError::NonTimestampedUpdates {
                objects: untimed.iter().cloned().collect(),
                outcome: Box::new(outcome),
            });
        }

        Ok(outcome)
    }

    /// Objects that sent at least one update without a usable time tag.
    pub fn non_timestamped_objects(&self) -> &BTreeSet<ObjectId> {
        self.reconstructor.non_timestamped()
    }

    pub fn object_count(&self) -> usize {
        self.histories.len()
    }

    pub fn sample_count(&self, object: &ObjectId) -> usize {
        self.histories.get(object).map_or(0, SampleHistory::len)
    }

    pub fn histories(&self) -> &ObjectHistories {
        &self.histories
    }

    pub fn tolerance(&self) -> &ToleranceConfig {
        &self.tolerance
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    /// Drops all samples and non-timestamped marks.
    pub fn reset(&mut self) {
        self.histories.clear();
        self.reconstructor.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;
    use crate::spatial::{SpatialEncoder, SpatialSample};
    use crate::time_tag::encode_hex_tag;
    use async_trait::async_trait;
    use nalgebra::Vector3;
    use std::sync::Mutex;
    use std::time::{Duration, UNIX_EPOCH};

    /// Wall clock that only moves when told to.
    struct ManualClock {
        time: Mutex<SystemTime>,
    }

    impl ManualClock {
        fn shared() -> Arc<Self> {
            Arc::new(Self {
                time: Mutex::new(UNIX_EPOCH + Duration::from_secs(1_704_103_200 + 600)),
            })
        }

        fn advance(&self, d: Duration) {
            *self.time.lock().unwrap() += d;
        }
    }

    #[async_trait]
    impl ReckonContext for ManualClock {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn system_time(&self) -> SystemTime {
            *self.time.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            self.advance(duration);
        }
    }

    type Verifier = DeadReckoningVerifier<ManualClock, Arc<RecordingDiagnostics>>;

    fn params(timestamp_required: bool) -> TestParams {
        TestParams::with_tolerance(ToleranceConfig {
            position_min: 0.0,
            position_max: 0.5,
            orientation_min: 0.0,
            orientation_max: 0.1,
            require_both: true,
            timestamp_required,
        })
    }

    fn verifier(timestamp_required: bool) -> (Arc<ManualClock>, Arc<RecordingDiagnostics>, Verifier) {
        let clock = ManualClock::shared();
        let diagnostics = Arc::new(RecordingDiagnostics::new());
        let v = DeadReckoningVerifier::new(Arc::clone(&clock), &params(timestamp_required), Arc::clone(&diagnostics));
        (clock, diagnostics, v)
    }

    fn rvw_payload(x: f64, vx: f64) -> Vec<u8> {
        let sample = SpatialSample {
            discriminant: 4,
            position: Vector3::new(x, 0.0, 0.0),
            velocity: Vector3::new(vx, 0.0, 0.0),
            ..SpatialSample::default()
        };
        SpatialEncoder::default().encode(&sample).unwrap()
    }

    fn tagged(object: &str, x: f64, vx: f64, micros: i64) -> AttributeUpdate {
        AttributeUpdate::new(object, rvw_payload(x, vx), encode_hex_tag(micros).unwrap().to_vec())
    }

    #[test]
    fn test_constant_velocity_run_passes() {
        let (_, _, mut v) = verifier(true);
        for i in 0..5 {
            v.on_update(&tagged("tank", 10.0 * i as f64, 10.0, i * 1_000_000)).unwrap();
        }

        assert!(v.is_sufficient_data_received());
        let outcome = v.run_evaluation().unwrap();
        assert_eq!(outcome.successes(), 4);
        assert!(outcome.success);
    }

    #[test]
    fn test_tag_timestamps_override_arrival() {
        let (clock, _, mut v) = verifier(false);

        let first = v.on_update(&tagged("tank", 0.0, 10.0, 0)).unwrap();
        clock.advance(Duration::from_secs(7));
        let second = v.on_update(&tagged("tank", 5.0, 10.0, 500_000)).unwrap();

        assert_eq!(second.duration_since(first).unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn test_insufficient_data_is_inconclusive() {
        let (_, _, mut v) = verifier(false);
        v.on_update(&tagged("a", 0.0, 10.0, 0)).unwrap();
        v.on_update(&tagged("a", 10.0, 10.0, 1_000_000)).unwrap();
        v.on_update(&tagged("b", 0.0, 10.0, 0)).unwrap();

        let err = v.run_evaluation().unwrap_err();
        assert!(err.is_inconclusive());
        assert!(err.outcome().is_none());
    }

    #[test]
    fn test_deviation_fails_run() {
        let (_, _, mut v) = verifier(false);
        v.on_update(&tagged("tank", 0.0, 10.0, 0)).unwrap();
        v.on_update(&tagged("tank", 10.0, 10.0, 1_000_000)).unwrap();
        v.on_update(&tagged("tank", 35.0, 10.0, 2_000_000)).unwrap();

        match v.run_evaluation() {
            Err(RunError::DeadReckoningFailures { failures, outcome }) => {
                assert_eq!(failures, 1);
                assert_eq!(outcome.successes(), 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_untimed_updates_fail_only_when_required() {
        for required in [false, true] {
            let (clock, diagnostics, mut v) = verifier(required);
            for i in 0..3 {
                let update = AttributeUpdate::new("jeep", rvw_payload(10.0 * i as f64, 10.0), Vec::new());
                v.on_update(&update).unwrap();
                clock.advance(Duration::from_secs(1));
            }

            assert!(v.non_timestamped_objects().contains(&ObjectId::from("jeep")));
            assert_eq!(
                diagnostics.count(|e| matches!(e, DiagnosticEvent::TimestampFallback { .. })),
                3
            );

            let result = v.run_evaluation();
            if required {
                assert!(matches!(result, Err(RunError::NonTimestampedUpdates { .. })));
            } else {
                assert!(result.is_ok());
            }
        }
    }

    #[test]
    fn test_bad_payload_is_dropped() {
        let (_, diagnostics, mut v) = verifier(false);
        let update = AttributeUpdate::new("tank", vec![4, 0, 0], encode_hex_tag(0).unwrap().to_vec());

        assert!(matches!(v.on_update(&update), Err(IngestError::Decode(_))));
        assert_eq!(v.sample_count(&ObjectId::from("tank")), 0);
        assert_eq!(
            diagnostics.count(|e| matches!(e, DiagnosticEvent::UpdateDropped { .. })),
            1
        );
    }

    #[test]
    fn test_discovery_gating() {
        let (_, _, v) = verifier(false);
        let mut v = v.with_discovery_gating();

        let err = v.on_update(&tagged("ghost", 0.0, 0.0, 0)).unwrap_err();
        assert_eq!(err, IngestError::UndiscoveredObject(ObjectId::from("ghost")));

        assert!(v.discover(ObjectId::from("ghost")));
        assert!(!v.discover(ObjectId::from("ghost")));
        v.on_update(&tagged("ghost", 0.0, 0.0, 0)).unwrap();
        assert_eq!(v.object_count(), 1);

        assert!(v.remove(&ObjectId::from("ghost")));
        assert!(v.on_update(&tagged("ghost", 0.0, 0.0, 1)).is_err());
        assert_eq!(v.sample_count(&ObjectId::from("ghost")), 1);
    }

    #[test]
    fn test_reset_clears_state() {
        let (_, _, mut v) = verifier(false);
        v.on_update(&AttributeUpdate::new("x", rvw_payload(0.0, 0.0), Vec::new())).unwrap();
        v.reset();
        assert_eq!(v.object_count(), 0);
        assert!(v.non_timestamped_objects().is_empty());
    }
}
