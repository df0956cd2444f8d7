//! Inline text editing.

use crate::config::EngineConfig;
use crate::entity::{EntityId, EntityPatch, FontFamily, Rgba, Text};
use crate::tools::StyleSettings;
use kurbo::Point;

/// Keys forwarded by the host. Typing itself arrives through `edit_text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    /// Any key the engine does not act on.
    Other,
}

/// Where and how the host should draw the edit box over a text entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EditOverlay {
    pub position: Point,
    pub width: f64,
    pub height: f64,
    /// Degrees.
    pub rotation: f64,
    pub font_family: FontFamily,
    pub font_size: f64,
    pub color: Rgba,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

/// An open inline edit of one text entity.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditSession {
    pub id: EntityId,
    pub content: String,
    pub overlay: EditOverlay,
}

impl TextEditSession {
    /// Open an editor over `text`, seeded with its content.
    pub fn begin(text: &Text, config: &EngineConfig) -> Self {
        let (width, height) = text.measured_size();
        Self {
            id: text.id(),
            content: text.content.clone(),
            overlay: EditOverlay {
                position: text.position,
                width: width.max(config.edit_overlay_min_width),
                height: height.max(config.edit_overlay_min_height),
                rotation: text.rotation.unwrap_or(0.0),
                font_family: text.font_family,
                font_size: text.font_size,
                color: text.color,
                bold: text.bold,
                italic: text.italic,
                underline: text.underline,
            },
        }
    }

    /// Follow format-control changes made while the editor is open.
    pub fn restyle(&mut self, style: &StyleSettings) {
        self.overlay.font_family = style.font_family;
        self.overlay.font_size = style.font_size;
        self.overlay.color = style.text_color;
        self.overlay.bold = style.bold;
        self.overlay.italic = style.italic;
        self.overlay.underline = style.underline;
    }

    /// The update that commits this edit: content plus the format controls.
    pub fn commit_patch(&self, style: &StyleSettings) -> EntityPatch {
        EntityPatch {
            content: Some(self.content.clone()),
            font_family: Some(style.font_family),
            font_size: Some(style.font_size),
            color: Some(style.text_color),
            bold: Some(style.bold),
            italic: Some(style.italic),
            underline: Some(style.underline),
            ..EntityPatch::default()
        }
    }
}
