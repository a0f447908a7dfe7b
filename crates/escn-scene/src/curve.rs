//! Curve data blocks

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Curve data block made of bezier splines
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurveData {
    pub name: String,
    #[serde(default)]
    pub splines: Vec<Spline>,
}

/// One bezier spline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spline {
    #[serde(default)]
    pub points: Vec<BezierPoint>,
    /// Closed loop
    #[serde(default)]
    pub cyclic: bool,
}

/// Control point with absolute handle positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierPoint {
    pub co: Vec3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_left: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle_right: Option<Vec3>,
    #[serde(default)]
    pub tilt: f32,
}

impl BezierPoint {
    /// Point whose handles sit on the point itself
    pub fn at(co: Vec3) -> Self {
        Self {
            co,
            handle_left: None,
            handle_right: None,
            tilt: 0.0,
        }
    }

    /// Incoming handle relative to the point
    pub fn in_offset(&self) -> Vec3 {
        self.handle_left.map_or(Vec3::ZERO, |h| h - self.co)
    }

    /// Outgoing handle relative to the point
    pub fn out_offset(&self) -> Vec3 {
        self.handle_right.map_or(Vec3::ZERO, |h| h - self.co)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_offsets() {
        let point = BezierPoint {
            co: Vec3::new(1.0, 0.0, 0.0),
            handle_left: Some(Vec3::new(0.0, 0.0, 0.0)),
            handle_right: None,
            tilt: 0.0,
        };
        assert_eq!(point.in_offset(), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(point.out_offset(), Vec3::ZERO);
    }
}
