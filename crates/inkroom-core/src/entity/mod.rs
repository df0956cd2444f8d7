//! Drawable entities for the whiteboard.

mod circle;
mod image;
mod rectangle;
mod stroke;
mod text;

pub use circle::Circle;
pub use image::{Image, ImageFormat, ImageSource};
pub use rectangle::Rectangle;
pub use stroke::{CURVE_TENSION, CompositeMode, Stroke};
pub use text::{FontFamily, Text, TextAlign};

use kurbo::{Affine, BezPath, Point, Rect};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Smallest radius, width or height an entity may be transformed to.
pub const MIN_SIZE: f64 = 5.0;

/// Unique identifier for non-stroke entities.
pub type EntityId = Uuid;

/// Generate a fresh entity id.
///
/// UUIDv7 ids are ordered by creation time and carry enough random bits that
/// two clients creating entities in the same millisecond do not collide.
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}

/// Serializable RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const SKY_BLUE: Rgba = Rgba::rgb(135, 206, 235);
    pub const NAVY: Rgba = Rgba::rgb(0, 0, 128);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }
}

impl From<Color> for Rgba {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self::new(rgba.r, rgba.g, rgba.b, rgba.a)
    }
}

impl From<Rgba> for Color {
    fn from(color: Rgba) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Kind tag of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Stroke,
    Circle,
    Rectangle,
    Image,
    Text,
}

impl EntityKind {
    /// Kinds in the order the stage layers them (bottom to top).
    pub const LAYERS: [EntityKind; 5] = [
        EntityKind::Stroke,
        EntityKind::Circle,
        EntityKind::Rectangle,
        EntityKind::Image,
        EntityKind::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Stroke => "stroke",
            EntityKind::Circle => "circle",
            EntityKind::Rectangle => "rectangle",
            EntityKind::Image => "image",
            EntityKind::Text => "text",
        }
    }
}

/// Geometry shared by every drawable kind.
pub trait Drawable {
    /// Axis-aligned bounds in canvas coordinates.
    fn bounds(&self) -> Rect;

    /// Whether `point` lies on the drawable, with `tolerance` slack.
    fn hit_test(&self, point: Point, tolerance: f64) -> bool;

    /// Outline used for rendering and rasterization.
    fn to_path(&self) -> BezPath;
}

/// Partial update for an entity. Absent fields are left untouched; fields that
/// do not exist on the target kind are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<FontFamily>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl EntityPatch {
    /// Patch that only moves the entity.
    pub fn moved_to(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    /// Check if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Tagged union over all drawable kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    Stroke(Stroke),
    Circle(Circle),
    Rectangle(Rectangle),
    Image(Image),
    Text(Text),
}

impl Entity {
    /// Stable id. Strokes have none; they are addressed by position.
    pub fn id(&self) -> Option<EntityId> {
        match self {
            Entity::Stroke(_) => None,
            Entity::Circle(c) => Some(c.id),
            Entity::Rectangle(r) => Some(r.id),
            Entity::Image(i) => Some(i.id),
            Entity::Text(t) => Some(t.id),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Stroke(_) => EntityKind::Stroke,
            Entity::Circle(_) => EntityKind::Circle,
            Entity::Rectangle(_) => EntityKind::Rectangle,
            Entity::Image(_) => EntityKind::Image,
            Entity::Text(_) => EntityKind::Text,
        }
    }

    fn drawable(&self) -> &dyn Drawable {
        match self {
            Entity::Stroke(s) => s,
            Entity::Circle(c) => c,
            Entity::Rectangle(r) => r,
            Entity::Image(i) => i,
            Entity::Text(t) => t,
        }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.drawable().hit_test(point, tolerance)
    }

    pub fn to_path(&self) -> BezPath {
        self.drawable().to_path()
    }

    /// Anchor point: the center for circles, the top-left corner otherwise.
    pub fn position(&self) -> Point {
        match self {
            Entity::Stroke(s) => s.points.first().copied().unwrap_or(Point::ZERO),
            Entity::Circle(c) => c.center,
            Entity::Rectangle(r) => r.position,
            Entity::Image(i) => i.position,
            Entity::Text(t) => t.position,
        }
    }

    /// Rotation in degrees around the anchor (0 for kinds without rotation).
    pub fn rotation(&self) -> f64 {
        match self {
            Entity::Image(i) => i.rotation,
            Entity::Text(t) => t.rotation.unwrap_or(0.0),
            _ => 0.0,
        }
    }

    /// Local-to-canvas transform for rotated kinds.
    pub fn placement(&self) -> Affine {
        let origin = self.position().to_vec2();
        Affine::translate(origin) * Affine::rotate(self.rotation().to_radians())
    }

    /// Apply a partial update. Strokes are immutable once recorded.
    pub fn apply(&mut self, patch: &EntityPatch) {
        match self {
            Entity::Stroke(_) => {}
            Entity::Circle(c) => c.apply(patch),
            Entity::Rectangle(r) => r.apply(patch),
            Entity::Image(i) => i.apply(patch),
            Entity::Text(t) => t.apply(patch),
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Entity::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_stroke(&self) -> Option<&Stroke> {
        match self {
            Entity::Stroke(s) => Some(s),
            _ => None,
        }
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peniko_round_trip() {
        let color: Color = Rgba::NAVY.into();
        assert_eq!(Rgba::from(color), Rgba::NAVY);
    }

    #[test]
    fn test_entity_ids_are_unique_and_ordered() {
        let a = new_entity_id();
        let b = new_entity_id();
        assert_ne!(a, b);
        assert!(a.get_version_num() == 7);
    }

    #[test]
    fn test_stroke_has_no_id() {
        let stroke = Entity::Stroke(Stroke::new(Rgba::BLACK, 2.0, CompositeMode::Normal));
        assert_eq!(stroke.id(), None);
        assert_eq!(stroke.kind(), EntityKind::Stroke);
    }

    #[test]
    fn test_patch_ignores_foreign_fields() {
        let mut circle = Entity::Circle(Circle::new(Point::new(10.0, 10.0), 30.0));
        let before = circle.clone();
        circle.apply(&EntityPatch {
            content: Some("ignored".into()),
            width: Some(99.0),
            ..EntityPatch::default()
        });
        assert_eq!(circle, before);
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = EntityPatch::moved_to(Point::new(1.0, 2.0));
        let json = serde_json::to_string(&patch).unwrap();
        assert_eq!(json, r#"{"position":{"x":1.0,"y":2.0}}"#);
        assert!(EntityPatch::default().is_empty());
    }

    #[test]
    fn test_polyline_distance() {
        let pts = [Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        assert!((point_to_polyline_dist(Point::new(5.0, 3.0), &pts) - 3.0).abs() < 1e-9);
        assert!((point_to_polyline_dist(Point::new(3.0, 4.0), &pts[..1]) - 5.0).abs() < 1e-9);
        assert!(point_to_polyline_dist(Point::ZERO, &[]).is_infinite());
    }
}
