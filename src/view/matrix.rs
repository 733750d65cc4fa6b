//! Homogeneous 4x4 projection matrices.
//!
//! Matrices are stored row-major and act on column vectors, so translation
//! lives in elements 3, 7 and 11. Composition is always `delta · old`: the
//! incoming change is applied after everything already in the matrix.

use std::fmt;

use crate::constants::ARRAY_DELIMITER;

/// A 4x4 homogeneous transform stored as 16 row-major values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix4(pub [f64; 16]);

impl Matrix4 {
    /// The identity transform.
    pub fn identity() -> Self {
        Self::scale_xyz(1.0, 1.0, 1.0)
    }

    /// Uniform scale.
    pub fn scale(s: f64) -> Self {
        Self::scale_xyz(s, s, s)
    }

    /// Per-axis scale.
    pub fn scale_xyz(x: f64, y: f64, z: f64) -> Self {
        let mut m = [0.0; 16];
        m[0] = x;
        m[5] = y;
        m[10] = z;
        m[15] = 1.0;
        Self(m)
    }

    /// Translation by `(x, y, z)`.
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        let mut m = Self::identity();
        m.0[3] = x;
        m.0[7] = y;
        m.0[11] = z;
        m
    }

    /// Rotation about the X, Y and Z axes, in degrees.
    ///
    /// The result is `Rx · Ry · Rz`, matching the rotation part of [`Matrix4::make`].
    pub fn rotation(rx: f64, ry: f64, rz: f64) -> Self {
        let (sx, cx) = rx.to_radians().sin_cos();
        let (sy, cy) = ry.to_radians().sin_cos();
        let (sz, cz) = rz.to_radians().sin_cos();

        let x = Self([
            1.0, 0.0, 0.0, 0.0, //
            0.0, cx, -sx, 0.0, //
            0.0, sx, cx, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let y = Self([
            cy, 0.0, sy, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            -sy, 0.0, cy, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        let z = Self([
            cz, -sz, 0.0, 0.0, //
            sz, cz, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ]);
        x.multiply(&y).multiply(&z)
    }

    /// Build a camera matrix from rotation (degrees), uniform scale and
    /// translation: `T · S · R`.
    pub fn make(rx: f64, ry: f64, rz: f64, scale: f64, tx: f64, ty: f64, tz: f64) -> Self {
        Self::translation(tx, ty, tz)
            .multiply(&Self::scale(scale))
            .multiply(&Self::rotation(rx, ry, rz))
    }

    /// Compose an incremental change onto an existing matrix: `delta · old`.
    pub fn compose(delta: &Matrix4, old: &Matrix4) -> Matrix4 {
        delta.multiply(old)
    }

    /// Inverse of an aspect scaling (reciprocal diagonal).
    pub fn aspect_undo(x: f64, y: f64, z: f64) -> Self {
        Self::scale_xyz(1.0 / x, 1.0 / y, 1.0 / z)
    }

    /// Matrix product `self · rhs`.
    pub fn multiply(&self, rhs: &Matrix4) -> Matrix4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [0.0; 16];
        for r in 0..4 {
            for c in 0..4 {
                out[r * 4 + c] = (0..4).map(|k| a[r * 4 + k] * b[k * 4 + c]).sum();
            }
        }
        Matrix4(out)
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, p: [f64; 3]) -> [f64; 3] {
        let m = &self.0;
        let v = [p[0], p[1], p[2], 1.0];
        let row = |r: usize| (0..4).map(|k| m[r * 4 + k] * v[k]).sum::<f64>();
        let w = row(3);
        [row(0) / w, row(1) / w, row(2) / w]
    }

    /// Element-wise comparison within `eps`.
    pub fn approx_eq(&self, other: &Matrix4, eps: f64) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| (a - b).abs() <= eps)
    }

    /// Parse the delimited form written by the `Display` impl.
    ///
    /// Returns `None` unless exactly 16 numbers are present.
    pub fn parse(s: &str) -> Option<Self> {
        let values = s
            .split(ARRAY_DELIMITER)
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .ok()?;
        let m: [f64; 16] = values.try_into().ok()?;
        Some(Self(m))
    }
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for Matrix4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", ARRAY_DELIMITER)?;
            }
            write!(f, "{}", v)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-12;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    #[test]
    fn test_identity_leaves_points() {
        let p = Matrix4::identity().transform_point([1.0, -2.0, 3.0]);
        assert_eq!(p, [1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let p = Matrix4::rotation(0.0, 0.0, 90.0).transform_point([1.0, 0.0, 0.0]);
        assert!(approx_eq(p[0], 0.0));
        assert!(approx_eq(p[1], 1.0));
        assert!(approx_eq(p[2], 0.0));
    }

    #[test]
    fn test_compose_order_is_delta_after_old() {
        // old moves first, delta scales the moved point
        let old = Matrix4::translation(1.0, 0.0, 0.0);
        let delta = Matrix4::scale(2.0);
        let p = Matrix4::compose(&delta, &old).transform_point([0.0, 0.0, 0.0]);
        assert!(approx_eq(p[0], 2.0));

        let q = Matrix4::compose(&old, &delta).transform_point([0.0, 0.0, 0.0]);
        assert!(approx_eq(q[0], 1.0));
    }

    #[test]
    fn test_make_translation_scale_rotation() {
        let m = Matrix4::make(0.0, 0.0, 90.0, 2.0, 0.5, 0.0, 0.0);
        let p = m.transform_point([1.0, 0.0, 0.0]);
        assert!(approx_eq(p[0], 0.5));
        assert!(approx_eq(p[1], 2.0));
    }

    #[test]
    fn test_aspect_undo_cancels_scale() {
        let m = Matrix4::scale_xyz(0.5, 1.0, 0.25).multiply(&Matrix4::aspect_undo(0.5, 1.0, 0.25));
        assert!(m.approx_eq(&Matrix4::identity(), EPSILON));
    }

    #[test]
    fn test_string_form_round_trips_exactly() {
        let m = Matrix4::make(-60.0, 12.5, -30.0, 0.5, 0.1, -0.2, 0.3);
        let text = m.to_string();
        assert_eq!(text.split(',').count(), 16);
        assert_eq!(Matrix4::parse(&text), Some(m));
    }

    #[test]
    fn test_parse_rejects_wrong_length_or_garbage() {
        assert!(Matrix4::parse("1,2,3").is_none());
        assert!(Matrix4::parse("").is_none());
        let bad = ["x"; 16].join(",");
        assert!(Matrix4::parse(&bad).is_none());
    }

    #[test]
    fn test_parse_tolerates_spaces() {
        let text = Matrix4::identity()
            .0
            .iter()
            .map(|v| format!(" {} ", v))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(Matrix4::parse(&text), Some(Matrix4::identity()));
    }
}
