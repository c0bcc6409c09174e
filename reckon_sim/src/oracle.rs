//! Ground truth oracle for simulation.
//!
//! The Oracle plays the system under test:
//! - Moves every entity with the dead-reckoning model it claims
//! - Publishes spatial attribute updates through the wire codec
//! - Stamps each update with a time tag
//!
//! Published noise is applied to the update only, never to the truth.

use crate::error::SimError;
use nalgebra::Vector3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use reckon_core::dead_reckoning::DeadReckoningModel;
use reckon_core::time_tag::{encode_dis_tag, encode_hex_tag, micros_past_hour};
use reckon_core::{KinematicState, SpatialEncoder, SpatialSample, WireLayout};
use reckon_env::{AttributeUpdate, ObjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;

/// How published updates are time-tagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagMode {
    /// 4-byte DIS timestamp
    Dis,
    /// 8-character hex microseconds
    Hex,
    /// Empty tag
    None,
}

/// A ground truth entity in the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEntity {
    pub object: ObjectId,

    /// Dead-reckoning model the entity publishes under
    pub discriminant: u8,

    /// True kinematic state
    pub truth: KinematicState,

    pub frozen: bool,

    /// Entity is still publishing
    pub active: bool,

    /// Publish rounds before the entity leaves, `None` to stay for the run
    #[serde(default)]
    pub leaves_after: Option<usize>,
}

impl SimEntity {
    pub fn new(object: impl Into<ObjectId>, discriminant: u8, truth: KinematicState) -> Self {
        Self {
            object: object.into(),
            discriminant,
            truth,
            frozen: false,
            active: true,
            leaves_after: None,
        }
    }

    pub fn frozen(mut self) -> Self {
        self.frozen = true;
        self
    }

    pub fn leaving_after(mut self, rounds: usize) -> Self {
        self.leaves_after = Some(rounds);
        self
    }

    /// Advances the truth by `dt` seconds with the entity's own model.
    ///
    /// Only the fields the entity's record carries take part.
    fn step(&mut self, dt: f64) {
        if self.frozen {
            return;
        }
        // Other and static entities do not move
        let Ok(model) = DeadReckoningModel::from_discriminant(self.discriminant) else {
            return;
        };
        let Ok(published) = SpatialSample::from_state(self.discriminant, &self.truth, false) else {
            return;
        };
        let state = published.kinematic_state();

        let next = model.extrapolate(&state, dt);
        self.truth.position = next.position;
        if let Some(orientation) = next.orientation {
            self.truth.orientation = orientation;
        }
        self.truth.velocity += state.acceleration * dt;
    }
}

/// The Oracle - owns ground truth and produces the published updates.
pub struct Oracle {
    /// RNG for published noise
    physics_rng: ChaCha8Rng,

    entities: BTreeMap<ObjectId, SimEntity>,

    /// Current simulation time (seconds)
    current_time: f64,

    /// Position noise standard deviation (meters), 0 for exact updates
    position_noise_std: f64,

    encoder: SpatialEncoder,

    tag_mode: TagMode,
}

impl Oracle {
    /// Creates an Oracle with the given physics seed.
    ///
    /// The physics seed is kept apart from the delivery seed so that
    /// changing jitter doesn't affect trajectories.
    pub fn new(physics_seed: u64, layout: WireLayout) -> Self {
        Self {
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            entities: BTreeMap::new(),
            current_time: 0.0,
            position_noise_std: 0.0,
            encoder: SpatialEncoder::new(layout),
            tag_mode: TagMode::Dis,
        }
    }

    pub fn set_position_noise(&mut self, std_dev: f64) -> Result<(), SimError> {
        if std_dev.is_nan() || std_dev < 0.0 {
            return Err(SimError::InvalidNoise(std_dev));
        }
        self.position_noise_std = std_dev;
        Ok(())
    }

    pub fn set_tag_mode(&mut self, mode: TagMode) {
        self.tag_mode = mode;
    }

    /// Adds an entity, replacing any entity with the same name.
    pub fn spawn(&mut self, entity: SimEntity) -> ObjectId {
        let object = entity.object.clone();
        self.entities.insert(object.clone(), entity);
        object
    }

    /// Stops publishing for an entity.
    pub fn remove_entity(&mut self, object: &ObjectId) {
        if let Some(entity) = self.entities.get_mut(object) {
            entity.active = false;
        }
    }

    /// Advances physics by dt seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;
        for entity in self.entities.values_mut().filter(|e| e.active) {
            entity.step(dt);
        }
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn active_entities(&self) -> Vec<&SimEntity> {
        self.entities.values().filter(|e| e.active).collect()
    }

    /// Encodes one update per active entity, tagged for `time`.
    pub fn publish(&mut self, time: SystemTime) -> Result<Vec<AttributeUpdate>, SimError> {
        let tag = self.time_tag(time)?;
        let noise = if self.position_noise_std > 0.0 {
            Some(
                Normal::new(0.0, self.position_noise_std)
                    .map_err(|_| SimError::InvalidNoise(self.position_noise_std))?,
            )
        } else {
            None
        };

        let mut updates = Vec::new();
        for entity in self.entities.values().filter(|e| e.active) {
            let mut state = entity.truth;
            if let Some(normal) = &noise {
                state.position += Vector3::new(
                    normal.sample(&mut self.physics_rng),
                    normal.sample(&mut self.physics_rng),
                    normal.sample(&mut self.physics_rng),
                );
            }
            let sample = SpatialSample::from_state(entity.discriminant, &state, entity.frozen)?;
            let payload = self.encoder.encode(&sample)?;
            updates.push(AttributeUpdate::new(entity.object.clone(), payload, tag.clone()));
        }
        Ok(updates)
    }

    fn time_tag(&self, time: SystemTime) -> Result<Vec<u8>, SimError> {
        let micros = micros_past_hour(time);
        Ok(match self.tag_mode {
            TagMode::Dis => encode_dis_tag(micros)?.to_vec(),
            TagMode::Hex => encode_hex_tag(micros)?.to_vec(),
            TagMode::None => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use reckon_core::time_tag::decode_time_tag;
    use reckon_core::SpatialDecoder;
    use std::time::{Duration, UNIX_EPOCH};

    fn moving(vx: f64) -> KinematicState {
        KinematicState {
            velocity: Vector3::new(vx, 0.0, 0.0),
            ..KinematicState::default()
        }
    }

    fn truth(oracle: &Oracle, object: &ObjectId) -> KinematicState {
        oracle.entities[object].truth
    }

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_704_067_200 + secs)
    }

    #[test]
    fn test_oracle_step() {
        let mut oracle = Oracle::new(42, WireLayout::default());
        let id = oracle.spawn(SimEntity::new("fpw", 2, moving(10.0)));

        oracle.step(1.0);

        let entity = &oracle.entities[&id];
        assert_relative_eq!(entity.truth.position.x, 10.0, epsilon = 1e-12);
        assert_relative_eq!(oracle.time(), 1.0);
    }

    #[test]
    fn test_varying_velocity_integrates_acceleration() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        let state = KinematicState {
            acceleration: Vector3::new(2.0, 0.0, 0.0),
            ..moving(0.0)
        };
        let id = oracle.spawn(SimEntity::new("fvw", 5, state));

        oracle.step(1.0);
        oracle.step(1.0);

        let entity = &oracle.entities[&id];
        // x = a t^2 / 2 over two exact steps
        assert_relative_eq!(entity.truth.position.x, 4.0, epsilon = 1e-9);
        assert_relative_eq!(entity.truth.velocity.x, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frozen_and_static_entities_hold_position() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        let frozen = oracle.spawn(SimEntity::new("frozen", 2, moving(5.0)).frozen());
        let fixed = oracle.spawn(SimEntity::new("static", 1, moving(5.0)));

        oracle.step(3.0);

        assert_eq!(truth(&oracle, &frozen).position, Vector3::zeros());
        assert_eq!(truth(&oracle, &fixed).position, Vector3::zeros());
    }

    #[test]
    fn test_fields_outside_the_record_are_ignored() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        let state = KinematicState {
            orientation: Vector3::new(0.0, 0.0, 0.5),
            angular_velocity: Vector3::new(0.0, 0.0, 1.0),
            ..moving(2.0)
        };
        // FPB carries no angular velocity
        let id = oracle.spawn(SimEntity::new("fpb", 6, state));

        oracle.step(1.0);

        let truth = truth(&oracle, &id);
        assert_relative_eq!(truth.orientation.z, 0.5, epsilon = 1e-9);
        assert_relative_eq!(truth.position.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_publish_round_trips_through_decoder() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        oracle.spawn(SimEntity::new("a", 2, moving(3.0)));
        oracle.step(2.0);

        let updates = oracle.publish(at(90)).unwrap();
        assert_eq!(updates.len(), 1);

        let sample = SpatialDecoder::new(WireLayout::default())
            .decode(&updates[0].payload)
            .unwrap();
        assert_eq!(sample.discriminant, 2);
        assert_relative_eq!(sample.position.x, 6.0);
        assert_relative_eq!(sample.velocity.x, 3.0);

        let tag = decode_time_tag(&updates[0].tag).unwrap();
        assert!((tag.micros_past_hour - 90_000_000).abs() < 5);
    }

    #[test]
    fn test_tag_modes() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        oracle.spawn(SimEntity::new("a", 2, moving(1.0)));

        oracle.set_tag_mode(TagMode::Hex);
        let hex = oracle.publish(at(1)).unwrap();
        assert_eq!(hex[0].tag, b"000F4240".to_vec());

        oracle.set_tag_mode(TagMode::None);
        assert!(oracle.publish(at(1)).unwrap()[0].tag.is_empty());
    }

    #[test]
    fn test_noise_is_deterministic_and_leaves_truth() {
        let publish = |seed| {
            let mut oracle = Oracle::new(seed, WireLayout::default());
            oracle.set_position_noise(1.0).unwrap();
            let id = oracle.spawn(SimEntity::new("a", 2, moving(0.0)));
            let update = oracle.publish(at(0)).unwrap().remove(0);
            assert_eq!(truth(&oracle, &id).position, Vector3::zeros());
            update.payload
        };

        assert_eq!(publish(7), publish(7));
        assert_ne!(publish(7), publish(8));
    }

    #[test]
    fn test_invalid_noise_rejected() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        assert!(matches!(oracle.set_position_noise(-1.0), Err(SimError::InvalidNoise(_))));
    }

    #[test]
    fn test_removed_entity_stops_publishing() {
        let mut oracle = Oracle::new(1, WireLayout::default());
        let id = oracle.spawn(SimEntity::new("a", 2, moving(1.0)));
        oracle.spawn(SimEntity::new("b", 2, moving(1.0)));

        oracle.remove_entity(&id);

        let updates = oracle.publish(at(0)).unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].object.as_str(), "b");
        assert_eq!(oracle.active_entities().len(), 1);
    }
}
