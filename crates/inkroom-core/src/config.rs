//! Engine configuration.

use crate::entity::{CURVE_TENSION, MIN_SIZE, Rgba};
use crate::tools::StyleSettings;
use serde::{Deserialize, Serialize};

/// Tunables of the board engine. Every field has a default, so a partial
/// JSON document is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Usable canvas width; 0 until the host reports a surface.
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Color the eraser paints with and the export background.
    pub background: Rgba,
    /// Added to the configured line size while erasing.
    pub eraser_boost: f64,
    /// Floor for radius, width and height after transforms.
    pub min_size: f64,
    pub text_placeholder: String,
    /// Minimum size of the inline text edit overlay.
    pub edit_overlay_min_width: f64,
    pub edit_overlay_min_height: f64,
    /// Fraction of the shorter canvas side an imported image may occupy.
    pub image_max_ratio: f64,
    pub export_pixel_ratio: f64,
    pub export_file_name: String,
    pub curve_tension: f64,
    /// Hit-test slack in canvas units.
    pub hit_tolerance: f64,
    /// Style settings a fresh board starts with.
    pub style: StyleSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 0.0,
            canvas_height: 0.0,
            background: Rgba::WHITE,
            eraser_boost: 5.0,
            min_size: MIN_SIZE,
            text_placeholder: "Double-click to edit".to_string(),
            edit_overlay_min_width: 100.0,
            edit_overlay_min_height: 50.0,
            image_max_ratio: 0.5,
            export_pixel_ratio: 2.0,
            export_file_name: "whiteboard.png".to_string(),
            curve_tension: CURVE_TENSION,
            hit_tolerance: 0.0,
            style: StyleSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration, falling back to defaults for absent keys.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_canvas_size(mut self, width: f64, height: f64) -> Self {
        self.canvas_width = width;
        self.canvas_height = height;
        self
    }

    /// Whether a drawing surface has been reported.
    pub fn has_surface(&self) -> bool {
        self.canvas_width > 0.0 && self.canvas_height > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.eraser_boost - 5.0).abs() < f64::EPSILON);
        assert!((config.min_size - 5.0).abs() < f64::EPSILON);
        assert!(!config.has_surface());
        assert!(config.with_canvas_size(800.0, 600.0).has_surface());
    }

    #[test]
    fn test_partial_json() {
        let config = EngineConfig::from_json(r#"{"eraser_boost": 8, "style": {"line_size": 4}}"#).unwrap();
        assert!((config.eraser_boost - 8.0).abs() < f64::EPSILON);
        assert!((config.style.line_size - 4.0).abs() < f64::EPSILON);
        assert_eq!(config.text_placeholder, "Double-click to edit");
    }
}
