//! Freehand pen and eraser strokes.

use super::{Drawable, Rgba, point_to_polyline_dist};
use kurbo::{BezPath, Point, Rect};
use serde::{Deserialize, Serialize};

/// Curve tension applied when a stroke is turned into a path.
pub const CURVE_TENSION: f64 = 0.5;

/// How a stroke combines with what is already painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeMode {
    /// Paint over existing pixels (source-over).
    #[default]
    Normal,
    /// Clear existing pixels under the stroke (destination-out).
    Erase,
}

/// A freehand path. Points are only ever appended while drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<Point>,
    pub color: Rgba,
    pub width: f64,
    #[serde(default)]
    pub mode: CompositeMode,
}

impl Stroke {
    pub fn new(color: Rgba, width: f64, mode: CompositeMode) -> Self {
        Self {
            points: Vec::new(),
            color,
            width,
            mode,
        }
    }

    /// Start a stroke at a single point.
    pub fn starting_at(point: Point, color: Rgba, width: f64, mode: CompositeMode) -> Self {
        let mut stroke = Self::new(color, width, mode);
        stroke.points.push(point);
        stroke
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_eraser(&self) -> bool {
        self.mode == CompositeMode::Erase
    }

    /// Centerline as a cardinal spline through the recorded points.
    pub fn smoothed_path(&self, tension: f64) -> BezPath {
        let mut path = BezPath::new();
        let pts = &self.points;
        let Some(&first) = pts.first() else {
            return path;
        };
        path.move_to(first);
        if pts.len() == 1 {
            // Round caps turn a zero-length segment into a dot.
            path.line_to(first);
            return path;
        }
        let k = tension / 3.0;
        for i in 0..pts.len() - 1 {
            let p0 = pts[i.saturating_sub(1)];
            let p1 = pts[i];
            let p2 = pts[i + 1];
            let p3 = pts[(i + 2).min(pts.len() - 1)];
            let c1 = p1 + (p2 - p0) * k;
            let c2 = p2 - (p3 - p1) * k;
            path.curve_to(c1, c2, p2);
        }
        path
    }
}

impl Drawable for Stroke {
    fn bounds(&self) -> Rect {
        let Some(&first) = self.points.first() else {
            return Rect::ZERO;
        };
        let rect = self
            .points
            .iter()
            .fold(Rect::from_points(first, first), |r, p| r.union_pt(*p));
        let half = self.width / 2.0;
        rect.inflate(half, half)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= self.width / 2.0 + tolerance
    }

    fn to_path(&self) -> BezPath {
        self.smoothed_path(CURVE_TENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::PathEl;

    #[test]
    fn test_append_points() {
        let mut stroke = Stroke::starting_at(Point::ZERO, Rgba::BLACK, 2.0, CompositeMode::Normal);
        stroke.add_point(Point::new(5.0, 5.0));
        stroke.add_point(Point::new(10.0, 10.0));
        assert_eq!(stroke.len(), 3);
        assert!(!stroke.is_eraser());
    }

    #[test]
    fn test_bounds_include_width() {
        let mut stroke = Stroke::starting_at(Point::ZERO, Rgba::BLACK, 4.0, CompositeMode::Normal);
        stroke.add_point(Point::new(10.0, 20.0));
        let b = stroke.bounds();
        assert!((b.x0 + 2.0).abs() < 1e-9);
        assert!((b.y1 - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_hit_test() {
        let mut stroke = Stroke::starting_at(Point::ZERO, Rgba::BLACK, 2.0, CompositeMode::Normal);
        stroke.add_point(Point::new(100.0, 0.0));
        assert!(stroke.hit_test(Point::new(50.0, 1.0), 0.0));
        assert!(!stroke.hit_test(Point::new(50.0, 5.0), 1.0));
    }

    #[test]
    fn test_smoothed_path_passes_through_points() {
        let mut stroke = Stroke::starting_at(Point::ZERO, Rgba::BLACK, 2.0, CompositeMode::Normal);
        stroke.add_point(Point::new(5.0, 5.0));
        stroke.add_point(Point::new(10.0, 0.0));
        let ends: Vec<Point> = stroke
            .to_path()
            .elements()
            .iter()
            .filter_map(|el| match el {
                PathEl::MoveTo(p) | PathEl::CurveTo(_, _, p) => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(ends, stroke.points);
    }

    #[test]
    fn test_single_point_path_is_a_dot() {
        let stroke = Stroke::starting_at(Point::new(3.0, 3.0), Rgba::BLACK, 2.0, CompositeMode::Erase);
        assert_eq!(stroke.to_path().elements().len(), 2);
    }
}
