use tracing::{debug, warn};

use crate::error::AxisError;
use crate::structs_and_impls::Point;

/// Oriented axis segment through a compression site
///
/// The direction runs from `lower` to `upper` and is normalized once. Distances are
/// measured from `center`, so `d_upper` is normally positive and `d_lower` negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub center: Point,
    pub upper: Point,
    pub lower: Point,
    pub direction: Point,           // Unit vector, lower -> upper
    pub d_upper: f64,               // Signed distance center -> upper
    pub d_lower: f64,               // Signed distance center -> lower
}

impl Axis {
    pub fn new(center: Point, upper: Point, lower: Point) -> Result<Axis, AxisError> {
        for (which, point) in [("center", &center), ("upper", &upper), ("lower", &lower)] {
            if !point.iter().all(|c| c.is_finite()) {
                return Err(AxisError::NonFinite { which });
            }
        }

        let span = upper - lower;
        let magnitude = span.norm();
        if magnitude == 0.0 {
            return Err(AxisError::InvalidAxis {
                upper: [upper.x, upper.y, upper.z],
                lower: [lower.x, lower.y, lower.z],
            });
        }
        let direction = span / magnitude;

        let d_upper = project_onto(&upper, &direction, &center);
        let d_lower = project_onto(&lower, &direction, &center);

        debug!(
            "axis vector ({:.3}, {:.3}, {:.3}), d_upper {:.3}, d_lower {:.3}",
            direction.x, direction.y, direction.z, d_upper, d_lower
        );
        if d_upper < 0.0 || d_lower > 0.0 {
            warn!(
                "center does not lie between the axis limits (d_upper {:.3}, d_lower {:.3})",
                d_upper, d_lower
            );
        }

        Ok(Axis { center, upper, lower, direction, d_upper, d_lower })
    }

    /// Signed displacement of `point` along the axis, relative to the center
    pub fn project(&self, point: &Point) -> f64 {
        project_onto(point, &self.direction, &self.center)
    }

    pub fn length(&self) -> f64 {
        (self.upper - self.lower).norm()
    }
}

/// (P - O) . a for a unit direction a
pub fn project_onto(point: &Point, direction: &Point, origin: &Point) -> f64 {
    (point - origin).dot(direction)
}
