//! Circle entity.

use super::{Drawable, EntityId, EntityPatch, Rgba, new_entity_id};
use kurbo::{BezPath, Circle as KurboCircle, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// A filled circle with a border.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub(crate) id: EntityId,
    /// Center point.
    pub center: Point,
    pub radius: f64,
    pub fill: Rgba,
    pub border_color: Rgba,
    pub border_width: f64,
}

impl Circle {
    /// Create a circle with the default toolbar colors.
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            id: new_entity_id(),
            center,
            radius,
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
            self.center = p;
        }
        if let Some(r) = patch.radius {
            self.radius = r;
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

    pub fn as_kurbo(&self) -> KurboCircle {
        KurboCircle::new(self.center, self.radius)
    }
}

impl Drawable for Circle {
    fn bounds(&self) -> Rect {
        let r = self.radius + self.border_width / 2.0;
        Rect::new(
            self.center.x - r,
            self.center.y - r,
            self.center.x + r,
            self.center.y + r,
        )
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        // Filled, so the whole disc counts.
        point.distance(self.center) <= self.radius + self.border_width / 2.0 + tolerance
    }

    fn to_path(&self) -> BezPath {
        self.as_kurbo().to_path(0.1)
    }
}
