//! Common types used across escn-exporter
//!
//! Host scenes are Z-up, the engine is Y-up. Every transform and position that
//! crosses from the host model into exported data goes through the helpers in
//! this module.

use glam::{Mat4, Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Tolerance used when comparing sampled values
pub const EPSILON: f32 = 1.0e-5;

/// Host (Z-up) to engine (Y-up) basis change: `(x, y, z) -> (x, z, -y)`
pub const AXIS_CONVERSION: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, -1.0, 0.0),
    Vec4::new(0.0, 1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Inverse of [`AXIS_CONVERSION`]
pub const AXIS_CONVERSION_INV: Mat4 = Mat4::from_cols(
    Vec4::new(1.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 1.0, 0.0),
    Vec4::new(0.0, -1.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 1.0),
);

/// Convert a host-space point or direction into engine space
pub fn convert_vector(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.z, -v.y)
}

/// Convert a host-space transform into engine space by conjugation.
///
/// The object's local axes are converted along with the world axes, which is
/// what meshes, empties and bones expect.
pub fn convert_matrix(m: Mat4) -> Mat4 {
    AXIS_CONVERSION * m * AXIS_CONVERSION_INV
}

/// Convert a host-space transform but keep the object's own local frame.
///
/// Cameras and lights look down local -Z in both host and engine, so only the
/// world side of the transform changes.
pub fn convert_frame(m: Mat4) -> Mat4 {
    AXIS_CONVERSION * m
}

/// Translation, rotation and scale of an affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformParts {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl TransformParts {
    /// Identity transform
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Split a matrix into its parts
    pub fn from_matrix(m: &Mat4) -> Self {
        let (scale, rotation, location) = m.to_scale_rotation_translation();
        Self {
            location,
            rotation: canonical_quat(rotation),
            scale,
        }
    }

    /// Rebuild the matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.location)
    }

    /// Component-wise comparison with [`EPSILON`] tolerance.
    ///
    /// `q` and `-q` describe the same rotation and compare equal.
    pub fn approx_eq(&self, other: &Self) -> bool {
        self.location.abs_diff_eq(other.location, EPSILON)
            && self.scale.abs_diff_eq(other.scale, EPSILON)
            && self.rotation.dot(other.rotation).abs() >= 1.0 - EPSILON
    }
}

impl Default for TransformParts {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalize a quaternion and pick the hemisphere with non-negative `w`
pub fn canonical_quat(q: Quat) -> Quat {
    let q = q.normalize();
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}

/// Compare two floats with [`EPSILON`] tolerance
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= EPSILON
}

/// Compare two matrices element-wise with [`EPSILON`] tolerance
pub fn matrix_approx_eq(a: &Mat4, b: &Mat4) -> bool {
    a.abs_diff_eq(*b, EPSILON)
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    /// An inverted box that any expansion overwrites
    pub const EMPTY: Self = Self {
        min: Vec3::splat(f32::MAX),
        max: Vec3::splat(f32::MIN),
    };

    /// Create a new bounding box
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or a zero box at the origin
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut bounds = Self::EMPTY;
        for point in points {
            bounds.expand(*point);
        }
        if bounds.is_empty() {
            Self::new(Vec3::ZERO, Vec3::ZERO)
        } else {
            bounds
        }
    }

    /// Get the center point
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the size (extents)
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Expand to include a point
    pub fn expand(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// True while no point has been added
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// Linear RGBA color with float components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorRepr", into = "[f32; 4]")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Create a new color
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Components as an array
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Scale the color channels, leaving alpha untouched
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor, self.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::rgb(c[0], c[1], c[2])
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}

/// Colors may be written with or without alpha
#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Rgba([f32; 4]),
    Rgb([f32; 3]),
}

impl From<ColorRepr> for Color {
    fn from(repr: ColorRepr) -> Self {
        match repr {
            ColorRepr::Rgba(c) => c.into(),
            ColorRepr::Rgb(c) => c.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_conversion_is_rotation() {
        assert!(matrix_approx_eq(&(AXIS_CONVERSION * AXIS_CONVERSION_INV), &Mat4::IDENTITY));
        assert!(approx_eq(AXIS_CONVERSION.determinant(), 1.0));
    }

    #[test]
    fn test_convert_vector_up_axis() {
        assert_eq!(convert_vector(Vec3::Z), Vec3::Y);
        assert_eq!(convert_vector(Vec3::Y), Vec3::NEG_Z);
        assert_eq!(convert_vector(Vec3::X), Vec3::X);
    }

    #[test]
    fn test_convert_matrix_translation() {
        let m = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let converted = convert_matrix(m);
        assert!(converted.w_axis.truncate().abs_diff_eq(Vec3::new(1.0, 3.0, -2.0), EPSILON));
    }

    #[test]
    fn test_convert_frame_keeps_view_direction() {
        // A host camera with identity transform looks down world -Z (straight down)
        let engine = convert_frame(Mat4::IDENTITY);
        let forward = engine.transform_vector3(Vec3::NEG_Z);
        assert!(forward.abs_diff_eq(Vec3::NEG_Y, EPSILON));
    }

    #[test]
    fn test_transform_parts_roundtrip() {
        let parts = TransformParts {
            location: Vec3::new(1.0, -2.0, 0.5),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };
        let back = TransformParts::from_matrix(&parts.to_matrix());
        assert!(parts.approx_eq(&back));
    }

    #[test]
    fn test_bounding_box() {
        let points = [Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 1.0, -2.0)];
        let bounds = BoundingBox::from_points(points.iter());
        assert_eq!(bounds.min, Vec3::new(-1.0, 0.0, -2.0));
        assert_eq!(bounds.size(), Vec3::new(4.0, 1.0, 4.0));
        assert_eq!(BoundingBox::from_points(std::iter::empty()), BoundingBox::default());
    }

    #[test]
    fn test_color_from_rgb_array() {
        let color: Color = [0.5, 0.25, 1.0].into();
        assert_eq!(color.a, 1.0);
        assert_eq!(color.scaled(2.0).r, 1.0);
    }
}
