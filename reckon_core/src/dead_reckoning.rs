//! The "RECKONING" Engine - DIS dead-reckoning extrapolation models
//!
//! Predicts where an entity should be after `Δt` seconds given the state it
//! last published. Models 2-9 of the DIS family are covered; model 1 is
//! static and never extrapolated.
//!
//! | DRM | Name    | Position                          | Orientation      |
//! |-----|---------|-----------------------------------|------------------|
//! | 2   | FPW     | p0 + v0Δt                         | -                |
//! | 3,4 | RPW/RVW | p0 + v0Δt + ½a0Δt²                | DR(ω,Δt)·R0      |
//! | 5,6 | FVW/FPB | p0 + v0Δt + ½a0Δt²                | DR(ω,Δt)·R0      |
//! | 7,8 | RPB/RVB | R0ᵗ·R1(ω,Δt)·v0 + p0              | DR(ω,Δt)·R0      |
//! | 9   | FVB     | R0ᵗ·(R1·v0 + R2·(a0 − [ω]×v0)) + p0 | -              |
//!
//! Each model is a pure function from a `KinematicState` and `Δt` to an
//! `Extrapolation`; dispatch is a table lookup on the discriminant.

use crate::error::ReckonError;
use crate::math::{limit_scale, magnitude, outer_self, sign, skew, vector_from_slice};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

/// Discriminant of the static model, which is recognised but never extrapolated.
pub const STATIC_DISCRIMINANT: u8 = 1;

/// Highest discriminant with a defined layout and formula.
pub const MAX_DISCRIMINANT: u8 = 9;

// ============================================================================
// STATE & RESULT
// ============================================================================

/// State snapshot at time 0, as published by the entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KinematicState {
    /// World position
    pub position: Vector3<f64>,
    /// Linear velocity
    pub velocity: Vector3<f64>,
    /// Linear acceleration
    pub acceleration: Vector3<f64>,
    /// Euler angles (phi, theta, psi) in radians
    pub orientation: Vector3<f64>,
    /// Body-axis angular velocity (rad/s)
    pub angular_velocity: Vector3<f64>,
}

impl KinematicState {
    /// Builds a state from loosely typed slices, validating every length.
    pub fn from_slices(
        position: &[f64],
        velocity: &[f64],
        acceleration: &[f64],
        orientation: &[f64],
        angular_velocity: &[f64],
    ) -> Result<Self, ReckonError> {
        let take = |name: &'static str, values: &[f64]| {
            vector_from_slice(values).ok_or(ReckonError::MalformedVector {
                name,
                len: values.len(),
            })
        };
        Ok(Self {
            position: take("position", position)?,
            velocity: take("velocity", velocity)?,
            acceleration: take("acceleration", acceleration)?,
            orientation: take("orientation", orientation)?,
            angular_velocity: take("angular velocity", angular_velocity)?,
        })
    }
}

/// Predicted pose at time Δt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extrapolation {
    /// Model that produced the prediction
    pub model: DeadReckoningModel,
    /// Predicted world position
    pub position: Vector3<f64>,
    /// Predicted Euler angles, `None` when the model does not compute them
    pub orientation: Option<Vector3<f64>>,
}

impl Extrapolation {
    /// Predicted Euler angles, or `[0, 0, 0]` for models without orientation.
    pub fn orientation_or_zero(&self) -> Vector3<f64> {
        self.orientation.unwrap_or_else(Vector3::zeros)
    }
}

// ============================================================================
// MODELS
// ============================================================================

/// The dead-reckoning models that have an extrapolation formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeadReckoningModel {
    /// DRM 2: fixed orientation, constant velocity, world frame
    Fpw,
    /// DRM 3: rotating, constant velocity, world frame
    Rpw,
    /// DRM 4: rotating, varying velocity, world frame
    Rvw,
    /// DRM 5: fixed orientation, varying velocity, world frame
    Fvw,
    /// DRM 6: fixed orientation, constant velocity, body frame
    Fpb,
    /// DRM 7: rotating, constant velocity, body frame
    Rpb,
    /// DRM 8: rotating, varying velocity, body frame
    Rvb,
    /// DRM 9: fixed orientation, varying velocity, body frame
    Fvb,
}

type ExtrapolateFn = fn(&KinematicState, f64) -> (Vector3<f64>, Option<Vector3<f64>>);

impl DeadReckoningModel {
    /// All models in discriminant order.
    pub const ALL: [DeadReckoningModel; 8] = [
        DeadReckoningModel::Fpw,
        DeadReckoningModel::Rpw,
        DeadReckoningModel::Rvw,
        DeadReckoningModel::Fvw,
        DeadReckoningModel::Fpb,
        DeadReckoningModel::Rpb,
        DeadReckoningModel::Rvb,
        DeadReckoningModel::Fvb,
    ];

    /// Selects the model for a spatial discriminant.
    pub fn from_discriminant(discriminant: u8) -> Result<Self, ReckonError> {
        match discriminant {
            STATIC_DISCRIMINANT => Err(ReckonError::StaticModel),
            2 => Ok(DeadReckoningModel::Fpw),
            3 => Ok(DeadReckoningModel::Rpw),
            4 => Ok(DeadReckoningModel::Rvw),
            5 => Ok(DeadReckoningModel::Fvw),
            6 => Ok(DeadReckoningModel::Fpb),
            7 => Ok(DeadReckoningModel::Rpb),
            8 => Ok(DeadReckoningModel::Rvb),
            9 => Ok(DeadReckoningModel::Fvb),
            other => Err(ReckonError::UnsupportedModel(other)),
        }
    }

    /// The spatial discriminant of this model.
    pub fn discriminant(self) -> u8 {
        match self {
            DeadReckoningModel::Fpw => 2,
            DeadReckoningModel::Rpw => 3,
            DeadReckoningModel::Rvw => 4,
            DeadReckoningModel::Fvw => 5,
            DeadReckoningModel::Fpb => 6,
            DeadReckoningModel::Rpb => 7,
            DeadReckoningModel::Rvb => 8,
            DeadReckoningModel::Fvb => 9,
        }
    }

    /// DIS name of the model.
    pub fn name(self) -> &'static str {
        match self {
            DeadReckoningModel::Fpw => "DRM_FPW",
            DeadReckoningModel::Rpw => "DRM_RPW",
            DeadReckoningModel::Rvw => "DRM_RVW",
            DeadReckoningModel::Fvw => "DRM_FVW",
            DeadReckoningModel::Fpb => "DRM_FPB",
            DeadReckoningModel::Rpb => "DRM_RPB",
            DeadReckoningModel::Rvb => "DRM_RVB",
            DeadReckoningModel::Fvb => "DRM_FVB",
        }
    }

    /// Whether the model predicts orientation.
    pub fn computes_orientation(self) -> bool {
        !matches!(self, DeadReckoningModel::Fpw | DeadReckoningModel::Fvb)
    }

    /// Strategy table. Models 3-6 share the world-frame closed form and
    /// 7-8 the body-frame one.
    fn strategy(self) -> ExtrapolateFn {
        match self {
            DeadReckoningModel::Fpw => fixed_position_world,
            DeadReckoningModel::Rpw
            | DeadReckoningModel::Rvw
            | DeadReckoningModel::Fvw
            | DeadReckoningModel::Fpb => rotating_world,
            DeadReckoningModel::Rpb | DeadReckoningModel::Rvb => rotating_body,
            DeadReckoningModel::Fvb => varying_body,
        }
    }

    /// Extrapolates `state` forward by `delta_t` seconds.
    pub fn extrapolate(self, state: &KinematicState, delta_t: f64) -> Extrapolation {
        let (position, orientation) = (self.strategy())(state, delta_t);
        Extrapolation {
            model: self,
            position,
            orientation,
        }
    }

    /// Slice entry point: validates that every input has three components.
    pub fn extrapolate_slices(
        self,
        position: &[f64],
        velocity: &[f64],
        acceleration: &[f64],
        orientation: &[f64],
        angular_velocity: &[f64],
        delta_t: f64,
    ) -> Result<Extrapolation, ReckonError> {
        let state = KinematicState::from_slices(
            position,
            velocity,
            acceleration,
            orientation,
            angular_velocity,
        )?;
        Ok(self.extrapolate(&state, delta_t))
    }
}

impl std::fmt::Display for DeadReckoningModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.discriminant())
    }
}

// ========== Model implementations ==========

/// DRM 2: only the velocity term survives; orientation is not computed.
fn fixed_position_world(state: &KinematicState, delta_t: f64) -> (Vector3<f64>, Option<Vector3<f64>>) {
    let reduced = KinematicState {
        position: state.position,
        velocity: state.velocity,
        ..KinematicState::default()
    };
    let (position, _) = rotating_world(&reduced, delta_t);
    (position, None)
}

/// DRM 3-6: world-frame second-order position, rotated orientation.
fn rotating_world(state: &KinematicState, delta_t: f64) -> (Vector3<f64>, Option<Vector3<f64>>) {
    let position = state.position
        + state.velocity * delta_t
        + state.acceleration * (0.5 * delta_t * delta_t);

    (position, Some(rotated_orientation(state, delta_t)))
}

/// DRM 7-8: body-frame velocity integrated through the rotation.
fn rotating_body(state: &KinematicState, delta_t: f64) -> (Vector3<f64>, Option<Vector3<f64>>) {
    let r_zero = initial_orientation(&state.orientation);
    let r1 = first_integral(&state.angular_velocity, delta_t);

    let position = r_zero.transpose() * (r1 * state.velocity) + state.position;

    (position, Some(rotated_orientation(state, delta_t)))
}

/// DRM 9: body-frame velocity and acceleration; orientation is not computed.
fn varying_body(state: &KinematicState, delta_t: f64) -> (Vector3<f64>, Option<Vector3<f64>>) {
    let omega = &state.angular_velocity;
    let r_zero = initial_orientation(&state.orientation);
    let r1 = first_integral(omega, delta_t);
    let r2 = second_integral(omega, delta_t);
    let accel_body = angular_accel_term(&state.acceleration, omega, &state.velocity);

    let position = r_zero.transpose() * (r1 * state.velocity + r2 * accel_body) + state.position;

    (position, None)
}

fn rotated_orientation(state: &KinematicState, delta_t: f64) -> Vector3<f64> {
    let dr = rotation_increment(&state.angular_velocity, delta_t);
    let r_zero = initial_orientation(&state.orientation);
    recover_euler_angles(&(dr * r_zero))
}

// ============================================================================
// SHARED BUILDING BLOCKS
// ============================================================================

/// World-to-body rotation from Euler angles (phi, theta, psi), 3-2-1 order.
pub fn initial_orientation(euler: &Vector3<f64>) -> Matrix3<f64> {
    let (sin_phi, cos_phi) = euler.x.sin_cos();
    let (sin_theta, cos_theta) = euler.y.sin_cos();
    let (sin_psi, cos_psi) = euler.z.sin_cos();

    Matrix3::new(
        cos_theta * cos_psi,
        cos_theta * sin_psi,
        -sin_theta,
        sin_phi * sin_theta * cos_psi - cos_phi * sin_psi,
        sin_phi * sin_theta * sin_psi + cos_phi * cos_psi,
        sin_phi * cos_theta,
        cos_phi * sin_theta * cos_psi + sin_phi * sin_psi,
        cos_phi * sin_theta * sin_psi - sin_phi * cos_psi,
        cos_phi * cos_theta,
    )
}

/// Inverse of `initial_orientation`.
///
/// At the ±90° pitch singularity (or whenever an acos argument leaves
/// [-1, 1]) phi and psi are both forced to 0; theta is kept.
pub fn recover_euler_angles(rotation: &Matrix3<f64>) -> Vector3<f64> {
    let theta = (-rotation[(0, 2)]).asin();
    let cos_theta = theta.cos();

    let mut psi = (rotation[(0, 0)] / cos_theta).acos() * sign(rotation[(0, 1)]);
    let mut phi = (rotation[(2, 2)] / cos_theta).acos() * sign(rotation[(1, 2)]);

    if phi.is_nan() || psi.is_nan() {
        phi = 0.0;
        psi = 0.0;
    }

    Vector3::new(phi, theta, psi)
}

/// The "DR matrix": rotation accumulated over Δt at body rate ω.
///
/// The skew term uses `sin(|ω|)·Δt`, not `sin(|ω|Δt)`.
pub fn rotation_increment(omega: &Vector3<f64>, delta_t: f64) -> Matrix3<f64> {
    let mag = magnitude(omega);
    let angle = mag * delta_t;

    let outer_scale = limit_scale(1.0 - angle.cos(), mag * mag);
    let identity_scale = angle.cos();
    let skew_scale = limit_scale(mag.sin() * delta_t, mag);

    outer_self(omega) * outer_scale + Matrix3::identity() * identity_scale - skew(omega) * skew_scale
}

/// First integral of the rotation ("R1").
pub fn first_integral(omega: &Vector3<f64>, delta_t: f64) -> Matrix3<f64> {
    let mag = magnitude(omega);
    let angle = mag * delta_t;

    let outer_scale = limit_scale(angle - angle.sin(), mag.powi(3));
    let identity_scale = limit_scale(angle.sin(), mag);
    let skew_scale = limit_scale(1.0 - angle.cos(), mag.powi(2));

    outer_self(omega) * outer_scale + Matrix3::identity() * identity_scale + skew(omega) * skew_scale
}

/// Second integral of the rotation ("R2").
pub fn second_integral(omega: &Vector3<f64>, delta_t: f64) -> Matrix3<f64> {
    let mag = magnitude(omega);
    let angle = mag * delta_t;

    let outer_scale = limit_scale(
        0.5 * mag.powi(2) * delta_t.powi(2) - angle.cos() - angle * angle.sin() + 1.0,
        mag.powi(4),
    );
    let identity_scale = limit_scale(angle.cos() + angle * angle.sin() - 1.0, mag.powi(2));
    let skew_scale = limit_scale(angle.sin() - angle * angle.cos(), mag.powi(3));

    outer_self(omega) * outer_scale + Matrix3::identity() * identity_scale + skew(omega) * skew_scale
}

/// Derivative of body velocity at time 0: `a − [ω]× v`.
pub fn angular_accel_term(
    acceleration: &Vector3<f64>,
    omega: &Vector3<f64>,
    velocity: &Vector3<f64>,
) -> Vector3<f64> {
    acceleration - skew(omega) * velocity
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use std::f64::consts::FRAC_PI_2;

    fn moving_state() -> KinematicState {
        KinematicState {
            position: Vector3::new(100.0, -50.0, 10.0),
            velocity: Vector3::new(10.0, 2.0, 0.0),
            acceleration: Vector3::new(1.0, 0.0, -0.5),
            orientation: Vector3::new(0.1, 0.2, 0.3),
            angular_velocity: Vector3::new(0.0, 0.0, 0.2),
        }
    }

    #[test]
    fn test_model_selection() {
        assert_eq!(DeadReckoningModel::from_discriminant(1), Err(ReckonError::StaticModel));
        assert_eq!(DeadReckoningModel::from_discriminant(0), Err(ReckonError::UnsupportedModel(0)));
        assert_eq!(DeadReckoningModel::from_discriminant(10), Err(ReckonError::UnsupportedModel(10)));

        for model in DeadReckoningModel::ALL {
            assert_eq!(DeadReckoningModel::from_discriminant(model.discriminant()), Ok(model));
        }
    }

    #[test]
    fn test_orientation_capability() {
        for model in DeadReckoningModel::ALL {
            let expected = !matches!(model.discriminant(), 2 | 9);
            assert_eq!(model.computes_orientation(), expected, "{}", model);
        }
    }

    #[test]
    fn test_models_without_orientation_report_zero() {
        let state = moving_state();
        for model in [DeadReckoningModel::Fpw, DeadReckoningModel::Fvb] {
            let result = model.extrapolate(&state, 1.5);
            assert!(result.orientation.is_none());
            assert_eq!(result.orientation_or_zero(), Vector3::zeros());
        }
    }

    #[test]
    fn test_constant_velocity_end_to_end() {
        let state = KinematicState {
            velocity: Vector3::new(10.0, 0.0, 0.0),
            ..KinematicState::default()
        };

        let result = DeadReckoningModel::Rvw.extrapolate(&state, 1.0);

        assert_relative_eq!(result.position, Vector3::new(10.0, 0.0, 0.0), epsilon = 1e-12);
        assert_relative_eq!(result.orientation.unwrap(), Vector3::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn test_world_models_share_position_formula() {
        let state = moving_state();
        let dt = 2.0;
        let expected = state.position + state.velocity * dt + state.acceleration * (0.5 * dt * dt);

        for model in [
            DeadReckoningModel::Rpw,
            DeadReckoningModel::Rvw,
            DeadReckoningModel::Fvw,
            DeadReckoningModel::Fpb,
        ] {
            let result = model.extrapolate(&state, dt);
            assert_relative_eq!(result.position, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fpw_ignores_acceleration_and_rotation() {
        let state = moving_state();
        let result = DeadReckoningModel::Fpw.extrapolate(&state, 2.0);
        assert_relative_eq!(result.position, state.position + state.velocity * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_shared_formula_groups_agree() {
        let state = moving_state();

        let rvw = DeadReckoningModel::Rvw.extrapolate(&state, 0.7);
        let fvw = DeadReckoningModel::Fvw.extrapolate(&state, 0.7);
        assert_eq!(rvw.position, fvw.position);
        assert_eq!(rvw.orientation, fvw.orientation);

        let rpb = DeadReckoningModel::Rpb.extrapolate(&state, 0.7);
        let rvb = DeadReckoningModel::Rvb.extrapolate(&state, 0.7);
        assert_eq!(rpb.position, rvb.position);
        assert_eq!(rpb.orientation, rvb.orientation);
    }

    #[test]
    fn test_zero_rate_rotation_increment_is_identity() {
        let dr = rotation_increment(&Vector3::zeros(), 3.0);
        assert_relative_eq!(dr, Matrix3::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_rate_integrals_collapse_to_zero() {
        // Every scale factor takes its 0/0 limit as 0, including R1's identity term.
        assert_eq!(first_integral(&Vector3::zeros(), 1.0), Matrix3::zeros());
        assert_eq!(second_integral(&Vector3::zeros(), 1.0), Matrix3::zeros());

        let state = KinematicState {
            position: Vector3::new(5.0, 5.0, 5.0),
            velocity: Vector3::new(10.0, 0.0, 0.0),
            ..KinematicState::default()
        };
        let result = DeadReckoningModel::Rpb.extrapolate(&state, 1.0);
        assert_relative_eq!(result.position, state.position, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_increment_uses_legacy_skew_term() {
        let omega = Vector3::new(0.0, 0.0, 0.5);
        let dt = 2.0;
        let dr = rotation_increment(&omega, dt);

        // [ω]× has (0,1) = -ωz; the increment subtracts sin(|ω|)·Δt/|ω| of it.
        let expected_01 = 0.5 * (0.5f64.sin() * dt / 0.5);
        assert_relative_eq!(dr[(0, 1)], expected_01, epsilon = 1e-12);
        assert_relative_eq!(dr[(0, 0)], (0.5 * dt).cos(), epsilon = 1e-12);
        assert_relative_eq!(dr[(2, 2)], (1.0 - (0.5 * dt).cos()) + (0.5 * dt).cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_first_integral_integrates_yaw_rotation() {
        // Pure yaw: R1·v must equal ∫ rotation(ωt)·v dt in closed form.
        let omega = Vector3::new(0.0, 0.0, 1.0);
        let dt = 0.5;
        let r1 = first_integral(&omega, dt);

        assert_relative_eq!(r1[(0, 0)], dt.sin(), epsilon = 1e-12);
        assert_relative_eq!(r1[(2, 2)], (dt - dt.sin()) + dt.sin(), epsilon = 1e-12);
        assert_relative_eq!(r1[(1, 0)], 1.0 - dt.cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_angular_accel_term() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let omega = Vector3::new(0.0, 0.0, 1.0);
        let v = Vector3::new(10.0, 0.0, 0.0);

        // ω × v = (0, 10, 0)
        let term = angular_accel_term(&a, &omega, &v);
        assert_relative_eq!(term, Vector3::new(1.0, -10.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_varying_body_zero_rate_is_stationary() {
        let state = KinematicState {
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(4.0, 0.0, 0.0),
            acceleration: Vector3::new(1.0, 1.0, 0.0),
            ..KinematicState::default()
        };
        let result = DeadReckoningModel::Fvb.extrapolate(&state, 2.0);
        assert_relative_eq!(result.position, state.position, epsilon = 1e-12);
    }

    #[test]
    fn test_body_frame_rotating_position() {
        let state = KinematicState {
            velocity: Vector3::new(10.0, 0.0, 0.0),
            angular_velocity: Vector3::new(0.0, 0.0, 0.1),
            ..KinematicState::default()
        };
        let dt = 1.0;
        let result = DeadReckoningModel::Rpb.extrapolate(&state, dt);

        let angle: f64 = 0.1 * dt;
        let expected = Vector3::new(10.0 * angle.sin() / 0.1, 10.0 * (1.0 - angle.cos()) / 0.1, 0.0);
        assert_relative_eq!(result.position, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_gimbal_lock_zeroes_roll_and_yaw() {
        // Pitch exactly +90 degrees
        let locked = Matrix3::new(
            0.0, 0.0, -1.0,
            0.0, 1.0, 0.0,
            1.0, 0.0, 0.0,
        );
        let euler = recover_euler_angles(&locked);
        assert_relative_eq!(euler.y, FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(euler.x, 0.0);
        assert_eq!(euler.z, 0.0);

        // Near-singular: acos arguments blow past 1 and come back NaN
        let perturbed = Matrix3::new(
            1e-9, 1e-9, -1.0,
            0.0, 1.0, 1e-9,
            1.0, 0.0, 1e-9,
        );
        let euler = recover_euler_angles(&perturbed);
        assert_relative_eq!(euler.y, FRAC_PI_2, epsilon = 1e-12);
        assert_eq!(euler.x, 0.0);
        assert_eq!(euler.z, 0.0);
    }

    #[test]
    fn test_malformed_slices_are_rejected() {
        let err = DeadReckoningModel::Rvw
            .extrapolate_slices(&[0.0; 3], &[0.0; 2], &[0.0; 3], &[0.0; 3], &[0.0; 3], 1.0)
            .unwrap_err();
        assert_eq!(err, ReckonError::MalformedVector { name: "velocity", len: 2 });

        let ok = DeadReckoningModel::Rvw
            .extrapolate_slices(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0], &[0.0; 3], &[0.0; 3], &[0.0; 3], 1.0)
            .unwrap();
        assert_relative_eq!(ok.position, Vector3::new(2.0, 0.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_roll_rounding_can_drop_heading() {
        // With phi = 0 the phi acos argument can round just past 1, so the
        // NaN rule zeroes psi as well
        let psi = 0.7;
        let mut dropped = 0;
        for i in 0..1000 {
            let theta = -1.4 + 2.8 * i as f64 / 999.0;
            let recovered = recover_euler_angles(&initial_orientation(&Vector3::new(0.0, theta, psi)));

            assert_relative_eq!(recovered.y, theta, epsilon = 1e-9);
            assert_eq!(recovered.x, 0.0);
            if recovered.z == 0.0 {
                dropped += 1;
            } else {
                assert_relative_eq!(recovered.z, psi, epsilon = 1e-9);
            }
        }
        assert!(dropped > 0);
        assert!(dropped < 1000);
    }

    fn away_from_zero_and_pi() -> impl Strategy<Value = f64> {
        prop_oneof![0.05f64..3.09, -3.09f64..-0.05]
    }

    proptest! {
        #[test]
        fn prop_euler_round_trip(
            phi in away_from_zero_and_pi(),
            theta in -1.4f64..1.4,
            psi in away_from_zero_and_pi(),
        ) {
            let euler = Vector3::new(phi, theta, psi);
            let recovered = recover_euler_angles(&initial_orientation(&euler));
            prop_assert!((recovered - euler).norm() < 1e-6, "{:?} -> {:?}", euler, recovered);
        }

        #[test]
        fn prop_initial_orientation_is_orthonormal(
            phi in -3.1f64..3.1,
            theta in -1.5f64..1.5,
            psi in -3.1f64..3.1,
        ) {
            let r = initial_orientation(&Vector3::new(phi, theta, psi));
            prop_assert!((r * r.transpose() - Matrix3::identity()).norm() < 1e-9);
        }
    }
}
