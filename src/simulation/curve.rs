//! Quadratic curve geometry used for turning maneuvers

use super::types::Position;

/// Number of chords used to approximate the arc length
const LENGTH_SAMPLES: usize = 24;

/// A quadratic Bezier curve through `start` and `end`, bent towards `control`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadCurve {
    pub start: Position,
    pub control: Position,
    pub end: Position,
}

impl QuadCurve {
    pub fn new(start: Position, control: Position, end: Position) -> Self {
        Self {
            start,
            control,
            end,
        }
    }

    /// Point at parameter `t`, clamped to 0..1
    pub fn point_at(&self, t: f32) -> Position {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        self.start * (u * u) + self.control * (2.0 * u * t) + self.end * (t * t)
    }

    /// Derivative at parameter `t`; points along the direction of travel
    pub fn tangent_at(&self, t: f32) -> Position {
        let t = t.clamp(0.0, 1.0);
        (self.control - self.start) * (2.0 * (1.0 - t)) + (self.end - self.control) * (2.0 * t)
    }

    /// Arc length, approximated by a polyline
    pub fn length(&self) -> f32 {
        let mut length = 0.0;
        let mut previous = self.start;
        for i in 1..=LENGTH_SAMPLES {
            let point = self.point_at(i as f32 / LENGTH_SAMPLES as f32);
            length += previous.distance(&point);
            previous = point;
        }
        length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn endpoints_are_interpolated() {
        let curve = QuadCurve::new(
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 10.0),
        );
        assert_eq!(curve.point_at(0.0), curve.start);
        assert_eq!(curve.point_at(1.0), curve.end);
        assert_eq!(curve.point_at(2.0), curve.end);
    }

    #[test]
    fn straight_curve_length_matches_chord() {
        let curve = QuadCurve::new(
            Position::new(0.0, 0.0),
            Position::new(5.0, 0.0),
            Position::new(10.0, 0.0),
        );
        assert!(close(curve.length(), 10.0, 1e-3));
        let mid = curve.point_at(0.5);
        assert!(close(mid.x, 5.0, 1e-4) && close(mid.y, 0.0, 1e-4));
    }

    #[test]
    fn corner_curve_length_is_between_chord_and_control_polygon() {
        let curve = QuadCurve::new(
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 10.0),
        );
        let chord = curve.start.distance(&curve.end);
        let polygon = curve.start.distance(&curve.control) + curve.control.distance(&curve.end);
        let length = curve.length();
        assert!(length > chord && length < polygon, "length {}", length);

        // The midpoint of a symmetric corner lies on the diagonal
        let mid = curve.point_at(0.5);
        assert!(close(mid.x, 7.5, 1e-4) && close(mid.y, 2.5, 1e-4));
    }

    #[test]
    fn tangent_follows_control_legs() {
        let curve = QuadCurve::new(
            Position::new(0.0, 0.0),
            Position::new(10.0, 0.0),
            Position::new(10.0, 10.0),
        );
        let start = curve.tangent_at(0.0).normalized();
        let end = curve.tangent_at(1.0).normalized();
        assert!(close(start.x, 1.0, 1e-4) && close(start.y, 0.0, 1e-4));
        assert!(close(end.x, 0.0, 1e-4) && close(end.y, 1.0, 1e-4));
    }
}
