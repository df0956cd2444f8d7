//! Tools and the style settings applied to new entities.

use crate::entity::{FontFamily, Rgba, Text};
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Select,
    #[default]
    Pen,
    Eraser,
    Circle,
    Rectangle,
    Image,
    Text,
}

impl ToolKind {
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Select,
            ToolKind::Pen,
            ToolKind::Eraser,
            ToolKind::Circle,
            ToolKind::Rectangle,
            ToolKind::Image,
            ToolKind::Text,
        ]
    }

    /// Tools that record freehand strokes.
    pub fn draws_strokes(&self) -> bool {
        matches!(self, ToolKind::Pen | ToolKind::Eraser)
    }
}

/// Current style configuration, including the text format controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleSettings {
    /// Pen stroke color.
    pub line_color: Rgba,
    /// Pen width; also the border width of new shapes.
    pub line_size: f64,
    pub fill: Rgba,
    pub border_color: Rgba,
    /// Circle radius; half the width of new rectangles.
    pub shape_radius: f64,
    /// Half the height of new rectangles.
    pub shape_height: f64,
    pub text_color: Rgba,
    pub font_size: f64,
    pub font_family: FontFamily,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl Default for StyleSettings {
    fn default() -> Self {
        Self {
            line_color: Rgba::BLACK,
            line_size: 2.0,
            fill: Rgba::SKY_BLUE,
            border_color: Rgba::NAVY,
            shape_radius: 30.0,
            shape_height: 30.0,
            text_color: Rgba::BLACK,
            font_size: 24.0,
            font_family: FontFamily::Arial,
            bold: false,
            italic: false,
            underline: false,
        }
    }
}

impl StyleSettings {
    /// Merge a partial update.
    pub fn apply(&mut self, patch: &StylePatch) {
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(v) = patch.$field {
                    self.$field = v;
                })*
            };
        }
        merge!(
            line_color, line_size, fill, border_color, shape_radius, shape_height, text_color,
            font_size, font_family, bold, italic, underline
        );
    }

    /// Put line size and shape dimensions back to `defaults`. Runs on every
    /// tool change; colors and text controls are kept.
    pub fn reset_sizes(&mut self, defaults: &StyleSettings) {
        self.line_size = defaults.line_size;
        self.shape_radius = defaults.shape_radius;
        self.shape_height = defaults.shape_height;
    }

    /// Load the format controls from an existing text entity.
    pub fn hydrate_from_text(&mut self, text: &Text) {
        self.text_color = text.color;
        self.font_size = text.font_size;
        self.font_family = text.font_family;
        self.bold = text.bold;
        self.italic = text.italic;
        self.underline = text.underline;
    }
}

/// Partial style update from the toolbar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StylePatch {
    pub line_color: Option<Rgba>,
    pub line_size: Option<f64>,
    pub fill: Option<Rgba>,
    pub border_color: Option<Rgba>,
    pub shape_radius: Option<f64>,
    pub shape_height: Option<f64>,
    pub text_color: Option<Rgba>,
    pub font_size: Option<f64>,
    pub font_family: Option<FontFamily>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_tool_classification() {
        assert!(ToolKind::Eraser.draws_strokes());
        assert!(!ToolKind::Select.draws_strokes());
        assert_eq!(ToolKind::all().len(), 7);
        assert_eq!(ToolKind::default(), ToolKind::Pen);
    }

    #[test]
    fn test_style_patch_merges_present_fields() {
        let mut style = StyleSettings::default();
        style.apply(&StylePatch {
            line_size: Some(8.0),
            bold: Some(true),
            ..StylePatch::default()
        });
        assert!((style.line_size - 8.0).abs() < f64::EPSILON);
        assert!(style.bold);
        assert_eq!(style.fill, Rgba::SKY_BLUE);
    }

    #[test]
    fn test_hydrate_from_text() {
        let mut text = Text::new(Point::ZERO, "x");
        text.font_size = 48.0;
        text.font_family = FontFamily::Georgia;
        text.italic = true;
        text.underline = true;
        text.color = Rgba::NAVY;
        let mut style = StyleSettings::default();
        style.hydrate_from_text(&text);
        assert!((style.font_size - 48.0).abs() < f64::EPSILON);
        assert_eq!(style.font_family, FontFamily::Georgia);
        assert!(style.italic && style.underline && !style.bold);
        assert_eq!(style.text_color, Rgba::NAVY);
    }

    #[test]
    fn test_reset_sizes_keeps_colors() {
        let mut style = StyleSettings::default();
        style.apply(&StylePatch {
            line_size: Some(10.0),
            shape_radius: Some(50.0),
            shape_height: Some(12.0),
            fill: Some(Rgba::WHITE),
            bold: Some(true),
            ..StylePatch::default()
        });
        style.reset_sizes(&StyleSettings::default());
        assert!((style.line_size - 2.0).abs() < f64::EPSILON);
        assert!((style.shape_radius - 30.0).abs() < f64::EPSILON);
        assert!((style.shape_height - 30.0).abs() < f64::EPSILON);
        assert_eq!(style.fill, Rgba::WHITE);
        assert!(style.bold);
    }
}
