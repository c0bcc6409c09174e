//! Vector and matrix primitives for the dead-reckoning models.
//!
//! Thin helpers on top of `nalgebra`. Vectors are column vectors; a rotation
//! matrix built by `initial_orientation` maps world axes onto body axes.
//!
//! ```text
//! skew(v) = [  0  -vz   vy ]
//!           [  vz   0  -vx ]
//!           [ -vy  vx    0 ]
//! ```

use nalgebra::{Matrix3, Vector3};

/// Number of components in every state vector.
pub const VECTOR_LENGTH: usize = 3;

/// Euclidean magnitude `sqrt(v . v)`.
#[inline]
pub fn magnitude(v: &Vector3<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Cross-product operator for `v` as a skew-symmetric matrix.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Outer product `v vᵗ`.
pub fn outer_self(v: &Vector3<f64>) -> Matrix3<f64> {
    v * v.transpose()
}

/// Scale factor `numerator / denominator` with the 0/0 limit taken as 0.
///
/// Every closed-form scale factor in the rotating models is of the form
/// f(|ω|) / |ω|^n, whose limit at |ω| = 0 is 0 for the factors used here.
#[inline]
pub fn limit_scale(numerator: f64, denominator: f64) -> f64 {
    let scale = numerator / denominator;
    if scale.is_nan() {
        0.0
    } else {
        scale
    }
}

/// Sign function returning 0 for ±0 (and NaN for NaN).
///
/// `f64::signum` maps +0.0 to 1.0, which would flip recovered angles.
#[inline]
pub fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        x
    }
}

/// Builds a `Vector3` from a slice, rejecting anything that is not exactly
/// three components long.
pub fn vector_from_slice(values: &[f64]) -> Option<Vector3<f64>> {
    if values.len() == VECTOR_LENGTH {
        Some(Vector3::new(values[0], values[1], values[2]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_magnitude() {
        assert_relative_eq!(magnitude(&Vector3::new(3.0, 4.0, 12.0)), 13.0, epsilon = 1e-12);
        assert_eq!(magnitude(&Vector3::zeros()), 0.0);
    }

    #[test]
    fn test_skew_matches_cross_product() {
        let a = Vector3::new(1.0, -2.0, 0.5);
        let b = Vector3::new(0.3, 4.0, -1.0);

        let via_skew = skew(&a) * b;
        let via_cross = a.cross(&b);

        assert_relative_eq!(via_skew, via_cross, epsilon = 1e-12);
    }

    #[test]
    fn test_skew_layout() {
        let m = skew(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(m[(0, 1)], -3.0);
        assert_eq!(m[(0, 2)], 2.0);
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(m[(1, 2)], -1.0);
        assert_eq!(m[(2, 0)], -2.0);
        assert_eq!(m[(2, 1)], 1.0);
    }

    #[test]
    fn test_outer_self() {
        let m = outer_self(&Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(m[(0, 0)], 1.0);
        assert_eq!(m[(1, 2)], 6.0);
        assert_eq!(m[(2, 1)], 6.0);
        assert_eq!(m[(2, 2)], 9.0);
    }

    #[test]
    fn test_limit_scale_singularity() {
        assert_eq!(limit_scale(0.0, 0.0), 0.0);
        assert_eq!(limit_scale(1.0, 4.0), 0.25);
    }

    #[test]
    fn test_sign_of_zero() {
        assert_eq!(sign(0.0), 0.0);
        assert_eq!(sign(-0.0), 0.0);
        assert_eq!(sign(2.5), 1.0);
        assert_eq!(sign(-1e-300), -1.0);
    }

    #[test]
    fn test_vector_from_slice_rejects_wrong_length() {
        assert!(vector_from_slice(&[1.0, 2.0]).is_none());
        assert!(vector_from_slice(&[1.0, 2.0, 3.0, 4.0]).is_none());
        assert_eq!(vector_from_slice(&[1.0, 2.0, 3.0]), Some(Vector3::new(1.0, 2.0, 3.0)));
    }

    proptest! {
        #[test]
        fn prop_skew_is_skew_symmetric(x in -1e3f64..1e3, y in -1e3f64..1e3, z in -1e3f64..1e3) {
            let m = skew(&Vector3::new(x, y, z));
            prop_assert_eq!(m, -m.transpose());
        }
    }
}
