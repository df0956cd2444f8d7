//! Text entity.

use super::{Drawable, EntityId, EntityPatch, Rgba, new_entity_id};
use kurbo::{Affine, BezPath, Point, Rect, Shape as KurboShape};
use serde::{Deserialize, Serialize};

/// Font families offered by the format controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FontFamily {
    #[default]
    Arial,
    Helvetica,
    #[serde(rename = "Times New Roman")]
    TimesNewRoman,
    #[serde(rename = "Courier New")]
    CourierNew,
    Georgia,
    Verdana,
    Impact,
}

impl FontFamily {
    /// Family name as understood by text renderers.
    pub fn name(&self) -> &'static str {
        match self {
            FontFamily::Arial => "Arial",
            FontFamily::Helvetica => "Helvetica",
            FontFamily::TimesNewRoman => "Times New Roman",
            FontFamily::CourierNew => "Courier New",
            FontFamily::Georgia => "Georgia",
            FontFamily::Verdana => "Verdana",
            FontFamily::Impact => "Impact",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// A block of text anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    pub(crate) id: EntityId,
    pub position: Point,
    pub content: String,
    pub font_family: FontFamily,
    pub font_size: f64,
    pub color: Rgba,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    /// Explicit box width (set by transforms); measured otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    /// Degrees around the top-left corner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<TextAlign>,
}

impl Text {
    /// Approximate advance of one character, relative to the font size.
    const CHAR_WIDTH_FACTOR: f64 = 0.6;

    pub fn new(position: Point, content: impl Into<String>) -> Self {
        Self {
            id: new_entity_id(),
            position,
            content: content.into(),
            font_family: FontFamily::default(),
            font_size: 24.0,
            color: Rgba::BLACK,
            bold: false,
            italic: false,
            underline: false,
            width: None,
            height: None,
            rotation: None,
            align: Some(TextAlign::Left),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub(crate) fn apply(&mut self, patch: &EntityPatch) {
        if let Some(p) = patch.position {
            self.position = p;
        }
        if let Some(c) = &patch.content {
            self.content.clone_from(c);
        }
        if let Some(f) = patch.font_family {
            self.font_family = f;
        }
        if let Some(s) = patch.font_size {
            self.font_size = s;
        }
        if let Some(c) = patch.color {
            self.color = c;
        }
        if let Some(b) = patch.bold {
            self.bold = b;
        }
        if let Some(i) = patch.italic {
            self.italic = i;
        }
        if let Some(u) = patch.underline {
            self.underline = u;
        }
        if let Some(w) = patch.width {
            self.width = Some(w);
        }
        if let Some(h) = patch.height {
            self.height = Some(h);
        }
        if let Some(r) = patch.rotation {
            self.rotation = Some(r);
        }
        if let Some(a) = patch.align {
            self.align = Some(a);
        }
    }

    /// Size estimated from content when no explicit box was set.
    pub fn measured_size(&self) -> (f64, f64) {
        let lines = self.content.split('\n');
        let (count, longest) = lines.fold((0usize, 0usize), |(n, max), line| {
            (n + 1, max.max(line.chars().count()))
        });
        let width = longest as f64 * self.font_size * Self::CHAR_WIDTH_FACTOR;
        let height = count.max(1) as f64 * self.font_size;
        (self.width.unwrap_or(width), self.height.unwrap_or(height))
    }

    fn local_rect(&self) -> Rect {
        let (w, h) = self.measured_size();
        Rect::new(0.0, 0.0, w, h)
    }

    fn placement(&self) -> Affine {
        Affine::translate(self.position.to_vec2())
            * Affine::rotate(self.rotation.unwrap_or(0.0).to_radians())
    }
}

impl Drawable for Text {
    fn bounds(&self) -> Rect {
        (self.placement() * self.local_rect().to_path(0.1)).bounding_box()
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let local = self.placement().inverse() * point;
        self.local_rect().inflate(tolerance, tolerance).contains(local)
    }

    fn to_path(&self) -> BezPath {
        self.placement() * self.local_rect().to_path(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_family_names() {
        assert_eq!(FontFamily::TimesNewRoman.name(), "Times New Roman");
        let json = serde_json::to_string(&FontFamily::CourierNew).unwrap();
        assert_eq!(json, "\"Courier New\"");
    }

    #[test]
    fn test_measured_size() {
        let text = Text::new(Point::ZERO, "abcd\nxy");
        let (w, h) = text.measured_size();
        assert!((w - 4.0 * 24.0 * 0.6).abs() < 1e-9);
        assert!((h - 48.0).abs() < 1e-9);
    }

    #[test]
    fn test_explicit_size_wins() {
        let mut text = Text::new(Point::ZERO, "abcd");
        text.width = Some(300.0);
        assert!((text.measured_size().0 - 300.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_hit_test() {
        let text = Text::new(Point::new(10.0, 10.0), "hello");
        assert!(text.hit_test(Point::new(20.0, 20.0), 0.0));
        assert!(!text.hit_test(Point::new(5.0, 5.0), 0.0));
    }

    #[test]
    fn test_apply_patch_content_only() {
        let mut text = Text::new(Point::ZERO, "before");
        text.apply(&EntityPatch {
            content: Some("after".into()),
            ..EntityPatch::default()
        });
        assert_eq!(text.content, "after");
        assert!((text.font_size - 24.0).abs() < f64::EPSILON);
        assert_eq!(text.width, None);
    }
}
