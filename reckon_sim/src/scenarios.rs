//! Conformance scenarios for the verifier.
//!
//! Each scenario describes a federate publishing under one or more
//! dead-reckoning models, and the verdict the verifier must reach.

use crate::error::SimError;
use crate::oracle::{SimEntity, TagMode};
use nalgebra::Vector3;
use reckon_core::{KinematicState, TestParams, ToleranceConfig, Verdict};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 2024-01-01 00:00:00 UTC
const BASE_EPOCH_SECS: u64 = 1_704_067_200;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// DRM 2 entities cruising in straight lines
    ConstantVelocity,

    /// DRM 4 and 5 with constant acceleration
    Accelerating,

    /// DRM 3 with world-frame rotation
    Rotating,

    /// DRM 6, 7 and 8 in the body frame
    BodyAxis,

    /// Frozen entity, every pair skipped
    Frozen,

    /// Static entities only
    Static,

    /// Published positions carry 2m Gaussian noise
    Noisy,

    /// Updates without time tags while timestamps are required
    Untimed,

    /// Hex-tagged run across the top of the hour
    HourRollover,

    /// Too few updates to judge
    Sparse,

    /// One entity stops publishing partway through
    Departure,
}

/// Everything the runner needs to stage a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioSetup {
    pub params: TestParams,
    pub entities: Vec<SimEntity>,
    pub position_noise_std: f64,
    pub tag_mode: TagMode,

    /// Wall-clock time at simulation start
    pub epoch: SystemTime,

    /// Publish rounds
    pub rounds: usize,

    /// Time between publish rounds
    pub period: Duration,
}

impl ScenarioSetup {
    fn new(entities: Vec<SimEntity>) -> Self {
        Self {
            params: TestParams::with_tolerance(ToleranceConfig::default()),
            entities,
            position_noise_std: 0.0,
            tag_mode: TagMode::Dis,
            epoch: UNIX_EPOCH + Duration::from_secs(BASE_EPOCH_SECS),
            rounds: 50,
            period: Duration::from_millis(100),
        }
    }
}

fn state(position: [f64; 3], velocity: [f64; 3]) -> KinematicState {
    KinematicState {
        position: Vector3::from(position),
        velocity: Vector3::from(velocity),
        ..KinematicState::default()
    }
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::ConstantVelocity,
            ScenarioId::Accelerating,
            ScenarioId::Rotating,
            ScenarioId::BodyAxis,
            ScenarioId::Frozen,
            ScenarioId::Static,
            ScenarioId::Noisy,
            ScenarioId::Untimed,
            ScenarioId::HourRollover,
            ScenarioId::Sparse,
            ScenarioId::Departure,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::ConstantVelocity => "constant_velocity",
            ScenarioId::Accelerating => "accelerating",
            ScenarioId::Rotating => "rotating",
            ScenarioId::BodyAxis => "body_axis",
            ScenarioId::Frozen => "frozen",
            ScenarioId::Static => "static",
            ScenarioId::Noisy => "noisy",
            ScenarioId::Untimed => "untimed",
            ScenarioId::HourRollover => "hour_rollover",
            ScenarioId::Sparse => "sparse",
            ScenarioId::Departure => "departure",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::ConstantVelocity => "Three FPW entities at constant velocity, DIS tags",
            ScenarioId::Accelerating => "FVW and RVW entities under constant acceleration",
            ScenarioId::Rotating => "RPW entity turning about two world axes",
            ScenarioId::BodyAxis => "FPB, RPB and RVB entities, body-axis rates on RPB and RVB",
            ScenarioId::Frozen => "Frozen FPW entity, every pair skipped",
            ScenarioId::Static => "Static entities, every pair skipped",
            ScenarioId::Noisy => "FPW entity publishing positions with 2m noise",
            ScenarioId::Untimed => "Untagged updates while timestamps are required",
            ScenarioId::HourRollover => "Hex-tagged updates crossing the top of the hour",
            ScenarioId::Sparse => "Two updates per entity, not enough to judge",
            ScenarioId::Departure => "Two FPW entities, one leaving after 20 rounds",
        }
    }

    /// Verdict a conforming verifier reaches.
    pub fn expected_verdict(&self) -> Verdict {
        match self {
            ScenarioId::Noisy | ScenarioId::Untimed => Verdict::Fail,
            ScenarioId::Sparse => Verdict::Inconclusive,
            _ => Verdict::Pass,
        }
    }

    pub fn setup(&self) -> ScenarioSetup {
        match self {
            ScenarioId::ConstantVelocity => ScenarioSetup::new(vec![
                SimEntity::new("fpw-1", 2, state([0.0, 0.0, 100.0], [20.0, 5.0, 0.0])),
                SimEntity::new("fpw-2", 2, state([500.0, -200.0, 50.0], [-12.0, 8.0, 1.5])),
                SimEntity::new("fpw-3", 2, state([-1000.0, 300.0, 0.0], [0.0, -30.0, 0.0])),
            ]),

            ScenarioId::Accelerating => ScenarioSetup::new(vec![
                SimEntity::new(
                    "fvw-1",
                    5,
                    KinematicState {
                        acceleration: Vector3::new(1.0, 0.5, 0.0),
                        ..state([0.0, 0.0, 0.0], [10.0, 0.0, 0.0])
                    },
                ),
                SimEntity::new(
                    "rvw-1",
                    4,
                    KinematicState {
                        acceleration: Vector3::new(0.5, 0.0, -0.25),
                        angular_velocity: Vector3::new(0.0, 0.0, 0.2),
                        orientation: Vector3::new(0.0, 0.0, 0.3),
                        ..state([100.0, 100.0, 20.0], [5.0, 5.0, 0.0])
                    },
                ),
            ]),

            ScenarioId::Rotating => ScenarioSetup::new(vec![SimEntity::new(
                "rpw-1",
                3,
                KinematicState {
                    orientation: Vector3::new(0.2, 0.1, 0.4),
                    angular_velocity: Vector3::new(0.1, 0.0, 0.3),
                    ..state([0.0, 0.0, 10.0], [10.0, 0.0, 0.0])
                },
            )]),

            ScenarioId::BodyAxis => ScenarioSetup::new(vec![
                SimEntity::new(
                    "fpb-1",
                    6,
                    KinematicState {
                        orientation: Vector3::new(0.0, 0.05, 0.6),
                        ..state([0.0, 0.0, 0.0], [15.0, 0.0, 0.0])
                    },
                ),
                SimEntity::new(
                    "rpb-1",
                    7,
                    KinematicState {
                        angular_velocity: Vector3::new(0.0, 0.0, 0.25),
                        orientation: Vector3::new(0.0, 0.0, 1.0),
                        ..state([50.0, 0.0, 0.0], [12.0, 0.0, 0.0])
                    },
                ),
                SimEntity::new(
                    "rvb-1",
                    8,
                    KinematicState {
                        acceleration: Vector3::new(0.5, 0.0, 0.0),
                        angular_velocity: Vector3::new(0.05, 0.0, 0.2),
                        ..state([0.0, 80.0, 5.0], [8.0, 0.0, 0.0])
                    },
                ),
            ]),

            ScenarioId::Frozen => ScenarioSetup::new(vec![SimEntity::new(
                "frozen-1",
                2,
                state([10.0, 10.0, 0.0], [30.0, 0.0, 0.0]),
            )
            .frozen()]),

            ScenarioId::Static => ScenarioSetup::new(vec![
                SimEntity::new("static-1", 1, state([0.0, 0.0, 0.0], [0.0, 0.0, 0.0])),
                SimEntity::new("static-2", 1, state([5.0, 5.0, 0.0], [0.0, 0.0, 0.0])),
            ]),

            ScenarioId::Noisy => ScenarioSetup {
                position_noise_std: 2.0,
                ..ScenarioSetup::new(vec![SimEntity::new(
                    "noisy-1",
                    2,
                    state([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]),
                )])
            },

            ScenarioId::Untimed => {
                let mut setup = ScenarioSetup::new(vec![SimEntity::new(
                    "untimed-1",
                    2,
                    state([0.0, 0.0, 0.0], [10.0, 0.0, 0.0]),
                )]);
                setup.tag_mode = TagMode::None;
                setup.params.timestamp_required = true;
                setup
            }

            ScenarioId::HourRollover => ScenarioSetup {
                tag_mode: TagMode::Hex,
                epoch: UNIX_EPOCH + Duration::from_secs(BASE_EPOCH_SECS + 3595),
                rounds: 100,
                ..ScenarioSetup::new(vec![SimEntity::new(
                    "rollover-1",
                    2,
                    state([0.0, 0.0, 0.0], [25.0, -5.0, 0.0]),
                )])
            },

            ScenarioId::Sparse => ScenarioSetup {
                rounds: 2,
                ..ScenarioSetup::new(vec![
                    SimEntity::new("sparse-1", 2, state([0.0, 0.0, 0.0], [1.0, 0.0, 0.0])),
                    SimEntity::new("sparse-2", 2, state([9.0, 0.0, 0.0], [0.0, 1.0, 0.0])),
                ])
            },

            ScenarioId::Departure => ScenarioSetup::new(vec![
                SimEntity::new("leaving-1", 2, state([0.0, 0.0, 0.0], [15.0, 0.0, 0.0]))
                    .leaving_after(20),
                SimEntity::new("staying-1", 2, state([0.0, 50.0, 0.0], [0.0, 15.0, 0.0])),
            ]),
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase().replace('-', "_");
        ScenarioId::all()
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| SimError::UnknownScenario(s.to_string()))
    }
}
