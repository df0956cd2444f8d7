//! Interaction state owned by the board controller.

use crate::delta::StrokeKey;
use crate::selection::Selection;
use crate::text_edit::TextEditSession;
use crate::tools::{StyleSettings, ToolKind};

/// Tool, style, selection and in-progress interactions of one client.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub tool: ToolKind,
    pub style: StyleSettings,
    pub selection: Option<Selection>,
    pub text_edit: Option<TextEditSession>,
    /// Stroke currently being drawn with the pen or eraser.
    pub drawing: Option<StrokeKey>,
}

impl EngineState {
    pub fn new(style: StyleSettings) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing.is_some()
    }
}
