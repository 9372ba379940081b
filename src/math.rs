//! Linear algebra helpers on top of glam.
//!
//! Internally everything is column-major with column vectors (`M * v`).
//! The only place a different convention appears is [`MatrixConvention`],
//! applied when matrices leave the crate.

pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use serde::{Deserialize, Serialize};

/// Small epsilon value for floating-point comparisons
pub const EPSILON: f32 = 1e-6;

/// Layout expected by the consumer of exported matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatrixConvention {
    /// glam's native layout: column-major, column vectors.
    #[default]
    ColumnMajor,
    /// Transposed on export, for shaders that multiply row vectors (`v * M`).
    RowMajor,
}

impl MatrixConvention {
    /// Flatten a matrix into 16 floats in this convention.
    #[inline]
    pub fn export(self, m: &Mat4) -> [f32; 16] {
        match self {
            MatrixConvention::ColumnMajor => m.to_cols_array(),
            MatrixConvention::RowMajor => m.transpose().to_cols_array(),
        }
    }
}

/// Cutting plane `a*x + b*y + c*z + d = 0`.
///
/// The normal `(a, b, c)` is not required to be unit length; the signed
/// distance is then scaled by its length, which does not change the sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            normal: Vec3::new(a, b, c),
            d,
        }
    }

    /// Plane through `point` facing `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            d: -normal.dot(point),
        }
    }

    pub fn from_vec4(v: Vec4) -> Self {
        Self::new(v.x, v.y, v.z, v.w)
    }

    pub fn to_vec4(self) -> Vec4 {
        self.normal.extend(self.d)
    }

    /// `dot(p, n) + d`. Positive on the side the normal points to.
    #[inline]
    pub fn signed_distance(&self, p: Vec3) -> f32 {
        self.normal.dot(p) + self.d
    }

    /// Unit normal, or `None` for a degenerate plane.
    pub fn unit_normal(&self) -> Option<Vec3> {
        self.normal.try_normalize()
    }

    pub fn is_valid(&self) -> bool {
        self.normal.is_finite() && self.d.is_finite() && self.normal.length_squared() > EPSILON
    }

    /// Transform the plane by an affine matrix.
    ///
    /// Planes transform by the inverse transpose of the point transform.
    pub fn transformed(&self, m: &Mat4) -> Plane {
        let v = m.inverse().transpose() * self.to_vec4();
        Plane::from_vec4(v)
    }
}

/// Normalize or fall back to `fallback` for near-zero vectors.
#[inline]
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}

/// Horizontal (XZ) part of a vector.
#[inline]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Horizontal speed of a velocity vector.
#[inline]
pub fn horizontal_length(v: Vec3) -> f32 {
    (v.x * v.x + v.z * v.z).sqrt()
}

/// Compose a local transform as scale, then rotate, then translate.
///
/// In column-vector form this is `T * R * S`.
#[inline]
pub fn compose_srt(scale: Vec3, rotation: Quat, translation: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(scale, rotation, translation)
}

/// Interpolation factor of `t` between `t0` and `t1`, clamped to [0, 1].
///
/// Returns 0 when the interval is empty so coincident keys resolve to the
/// earlier one.
#[inline]
pub fn unit_factor(t: f32, t0: f32, t1: f32) -> f32 {
    let span = t1 - t0;
    if span <= EPSILON {
        return 0.0;
    }
    ((t - t0) / span).clamp(0.0, 1.0)
}
