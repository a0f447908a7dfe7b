//! Bezier curves to `Curve3D`

use escn_core::convert_vector;
use escn_scene::CurveData;
use tracing::warn;

use super::{CurvePoint, CurveResource};

/// Build a `Curve3D` from the first spline of a curve.
///
/// Returns `None` when the curve has no control points.
pub fn build_curve(curve: &CurveData) -> Option<CurveResource> {
    let spline = curve.splines.iter().find(|s| !s.points.is_empty())?;
    if curve.splines.len() > 1 {
        warn!(
            "Curve '{}' has {} splines, only the first is exported",
            curve.name,
            curve.splines.len()
        );
    }

    let mut points: Vec<CurvePoint> = spline
        .points
        .iter()
        .map(|p| CurvePoint {
            position: convert_vector(p.co),
            in_offset: convert_vector(p.in_offset()),
            out_offset: convert_vector(p.out_offset()),
            tilt: p.tilt,
        })
        .collect();

    if spline.cyclic {
        if let Some(&first) = points.first() {
            points.push(first);
        }
    }

    Some(CurveResource {
        name: curve.name.clone(),
        points,
    })
}
