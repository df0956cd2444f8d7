//! Rectangle entity.

use super::{Drawable, EntityId, EntityPatch, Rgba, new_entity_id};
use kurbo::{BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// An axis-aligned filled rectangle with a border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub(crate) id: EntityId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub fill: Rgba,
    pub border_color: Rgba,
    pub border_width: f64,
}

impl Rectangle {
    /// Create a rectangle with the default toolbar colors.
    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: new_entity_id(),
            position,
            width,
            height,
            fill: Rgba::SKY_BLUE,
            border_color: Rgba::NAVY,
            border_width: 2.0,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn apply(&mut self, patch: &EntityPatch) {
        if let Some(p) = patch.position {
            self.position = p;
        }
        if let Some(w) = patch.width {
            self.width = w;
        }
        if let Some(h) = patch.height {
            self.height = h;
        }
        if let Some(c) = patch.fill {
            self.fill = c;
        }
        if let Some(c) = patch.border_color {
            self.border_color = c;
        }
        if let Some(w) = patch.border_width {
            self.border_width = w;
        }
    }

    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }
}

impl Drawable for Rectangle {
    fn bounds(&self) -> Rect {
        let half = self.border_width / 2.0;
        self.as_rect().inflate(half, half)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.bounds().inflate(tolerance, tolerance).contains(point)
    }

    fn to_path(&self) -> BezPath {
        self.as_rect().to_path(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rectangle_creation() {
        let rect = Rectangle::new(Point::new(10.0, 20.0), 60.0, 40.0);
        assert_eq!(rect.position, Point::new(10.0, 20.0));
        assert_eq!(rect.as_rect(), Rect::new(10.0, 20.0, 70.0, 60.0));
    }

    #[test]
    fn test_hit_test() {
        let rect = Rectangle::new(Point::ZERO, 100.0, 50.0);
        assert!(rect.hit_test(Point::new(50.0, 25.0), 0.0));
        assert!(!rect.hit_test(Point::new(150.0, 25.0), 0.0));
        assert!(rect.hit_test(Point::new(103.0, 25.0), 3.0));
    }

    #[test]
    fn test_apply_patch_keeps_other_fields() {
        let mut rect = Rectangle::new(Point::ZERO, 100.0, 50.0);
        rect.apply(&EntityPatch {
            width: Some(12.0),
            ..EntityPatch::default()
        });
        assert!((rect.width - 12.0).abs() < f64::EPSILON);
        assert!((rect.height - 50.0).abs() < f64::EPSILON);
        assert_eq!(rect.position, Point::ZERO);
    }
}
