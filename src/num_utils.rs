//! Numeric helpers
//!
//! Small math utilities used when snapping or comparing layered values.

use num_traits::Float;
use serde::{Deserialize, Serialize};

/// Round `value` to the nearest multiple of `factor`.
///
/// The quotient is computed and rounded in `f64` whatever `F` is, so `f32`
/// inputs snap the same way as double-precision ones. Halfway cases round
/// away from zero. A zero `factor` yields NaN. Returns `None` only if a value
/// cannot be represented in `f64` or the rounded quotient cannot be cast
/// back to `F`.
pub fn nearest_multiple<F: Float>(value: F, factor: F) -> Option<F> {
    let quotient = value.to_f64()? / factor.to_f64()?;
    let steps = F::from(quotient.round())?;
    Some(steps * factor)
}

/// Simple 3-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }
}

/// Signed angle in degrees from `v1` to `v2`, using `normal` as the rotation axis.
///
/// The result lies in `[-180, 180]` and is positive for counter-clockwise
/// rotation when looking down `normal`.
pub fn angle_signed(v1: Vec3, v2: Vec3, normal: Vec3) -> f32 {
    normal.dot(v1.cross(v2)).atan2(v1.dot(v2)).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use test_case::test_case;

    #[test_case(7.0, 5.0, 5.0 ; "rounds down")]
    #[test_case(8.0, 5.0, 10.0 ; "rounds up")]
    #[test_case(2.5, 5.0, 5.0 ; "half rounds away from zero")]
    #[test_case(-2.5, 5.0, -5.0 ; "negative half rounds away from zero")]
    #[test_case(0.26, 0.25, 0.25 ; "fractional factor")]
    fn test_nearest_multiple(value: f64, factor: f64, expected: f64) {
        assert_relative_eq!(
            nearest_multiple(value, factor).unwrap(),
            expected,
            epsilon = 1e-9
        );
    }

    #[test_case(0.125, 0.05, 0.1 ; "quotient just below half")]
    #[test_case(7.0, 5.0, 5.0 ; "whole numbers")]
    #[test_case(-0.125, 0.05, -0.1 ; "negative quotient just below half")]
    fn test_nearest_multiple_f32(value: f32, factor: f32, expected: f32) {
        assert_relative_eq!(
            nearest_multiple(value, factor).unwrap(),
            expected,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_nearest_multiple_zero_factor() {
        assert!(nearest_multiple(3.0_f64, 0.0).is_some_and(f64::is_nan));
    }

    #[test]
    fn test_cross_product() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(x.dot(y), 0.0);
    }

    #[test]
    fn test_angle_signed() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        let up = Vec3::new(0.0, 0.0, 1.0);

        assert_relative_eq!(angle_signed(x, y, up), 90.0, epsilon = 1e-4);
        assert_relative_eq!(angle_signed(y, x, up), -90.0, epsilon = 1e-4);
        assert_relative_eq!(angle_signed(x, x, up), 0.0, epsilon = 1e-4);
    }
}
