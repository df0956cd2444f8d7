//! The board controller.
//!
//! `Board` owns the document and the interaction state of one client. Host
//! input comes in through the `on_*` handlers; every local change is turned
//! into a [`Delta`], applied to the document and queued for the relay.
//! Remote deltas go through the same document path without being queued.

use crate::config::EngineConfig;
use crate::delta::{Delta, StrokeKey};
use crate::document::{Document, StoreError, StoreResult};
use crate::entity::{
    Circle, CompositeMode, Entity, EntityId, EntityKind, EntityPatch, Image, Rectangle, Stroke,
    Text,
};
use crate::export::{self, ExportError, ExportedImage};
use crate::import::{self, DecodedImage, ImportError, SelectedFile};
use crate::selection::{
    Handle, NodeRef, Selection, TransformAttrs, TransformController, bake_transform,
    constrain_bound_box, handles_for,
};
use crate::state::EngineState;
use crate::text_edit::{Key, TextEditSession};
use crate::tools::{StylePatch, StyleSettings, ToolKind};
use ab_glyph::FontArc;
use kurbo::{Point, Rect, Size};

/// Something the engine needs the host to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRequest {
    /// Show the image file picker.
    OpenFilePicker,
}

/// Everything the host needs to draw the board.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub tool: ToolKind,
    pub strokes: Vec<&'a Stroke>,
    pub circles: Vec<&'a Circle>,
    pub rectangles: Vec<&'a Rectangle>,
    pub images: Vec<&'a Image>,
    pub texts: Vec<&'a Text>,
    pub selection: Option<Selection>,
    pub text_edit: Option<&'a TextEditSession>,
    /// Handle positions for the selected entity.
    pub handles: Vec<Handle>,
    /// Rendered node the handle overlay is attached to.
    pub attached_node: Option<NodeRef>,
}

/// Whiteboard engine for one client.
#[derive(Debug, Clone)]
pub struct Board {
    document: Document,
    state: EngineState,
    transform: TransformController,
    config: EngineConfig,
    /// Local deltas waiting to be published.
    outgoing: Vec<Delta>,
    requests: Vec<EngineRequest>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Board {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            document: Document::new(),
            state: EngineState::new(config.style.clone()),
            transform: TransformController::new(),
            config,
            outgoing: Vec::new(),
            requests: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tool(&self) -> ToolKind {
        self.state.tool
    }

    pub fn style(&self) -> &StyleSettings {
        &self.state.style
    }

    pub fn selection(&self) -> Option<Selection> {
        self.state.selection
    }

    pub fn text_edit(&self) -> Option<&TextEditSession> {
        self.state.text_edit.as_ref()
    }

    // --- Outbound ---

    /// Local deltas produced since the last call.
    pub fn take_outgoing(&mut self) -> Vec<Delta> {
        std::mem::take(&mut self.outgoing)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.outgoing.is_empty()
    }

    /// Host requests produced since the last call.
    pub fn take_requests(&mut self) -> Vec<EngineRequest> {
        std::mem::take(&mut self.requests)
    }

    pub fn frame(&self) -> Frame<'_> {
        let mut frame = Frame {
            tool: self.state.tool,
            strokes: Vec::new(),
            circles: Vec::new(),
            rectangles: Vec::new(),
            images: Vec::new(),
            texts: Vec::new(),
            selection: self.state.selection,
            text_edit: self.state.text_edit.as_ref(),
            handles: Vec::new(),
            attached_node: self.transform.attached(),
        };
        for entity in self.document.iter() {
            match entity {
                Entity::Stroke(s) => frame.strokes.push(s),
                Entity::Circle(c) => frame.circles.push(c),
                Entity::Rectangle(r) => frame.rectangles.push(r),
                Entity::Image(i) => frame.images.push(i),
                Entity::Text(t) => frame.texts.push(t),
            }
        }
        if let Some(entity) = self.state.selection.and_then(|s| self.document.get(s.id)) {
            frame.handles = handles_for(entity);
        }
        frame
    }

    // --- Mutation path ---

    /// Apply a local delta and queue it for publishing.
    fn apply_local(&mut self, delta: Delta) -> StoreResult<()> {
        self.document.apply(&delta)?;
        self.outgoing.push(delta);
        Ok(())
    }

    /// Like `apply_local`, tolerating misses.
    fn commit(&mut self, delta: Delta) -> bool {
        match self.apply_local(delta) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Ignoring local change: {}", e);
                false
            }
        }
    }

    /// Apply a delta received from another client.
    pub fn apply_remote(&mut self, delta: &Delta) {
        if let Err(e) = self.document.apply(delta) {
            log::debug!("Ignoring remote delta: {}", e);
        }
        self.reconcile();
    }

    /// Drop state that refers to entities or strokes that no longer exist.
    fn reconcile(&mut self) {
        if let Some(selection) = self.state.selection {
            if !self.document.contains(selection.id) {
                log::debug!("Selected {} {} is gone", selection.kind.name(), selection.id);
                self.set_selection(None);
            }
        }
        let edit_gone = self
            .state
            .text_edit
            .as_ref()
            .is_some_and(|edit| !self.document.contains(edit.id));
        if edit_gone {
            self.state.text_edit = None;
        }
        if let Some(key) = self.state.drawing {
            if self.document.open_stroke(key).is_none() {
                self.state.drawing = None;
            }
        }
    }

    fn set_selection(&mut self, selection: Option<Selection>) {
        self.state.selection = selection;
        self.transform.sync(selection);
    }

    fn select_entity(&mut self, id: EntityId, kind: EntityKind) {
        self.set_selection(Some(Selection { id, kind }));
    }

    /// Add a freshly built entity, select it and hand control to `Select`.
    fn create_and_select(&mut self, entity: Entity) {
        let kind = entity.kind();
        let Some(id) = entity.id() else {
            return;
        };
        if self.commit(Delta::Create { entity }) {
            self.select_entity(id, kind);
            self.switch_tool(ToolKind::Select);
        }
    }

    /// Change the active tool. Line size and shape dimensions go back to
    /// their configured values whenever the tool actually changes.
    fn switch_tool(&mut self, tool: ToolKind) {
        if self.state.tool != tool {
            self.state.style.reset_sizes(&self.config.style);
        }
        self.state.tool = tool;
    }

    /// Remove everything from the board.
    pub fn clear(&mut self) {
        self.state.text_edit = None;
        self.state.drawing = None;
        self.set_selection(None);
        self.commit(Delta::Clear);
    }

    // --- Tools and style ---

    pub fn select_tool(&mut self, tool: ToolKind) {
        self.finish_stroke();
        self.commit_text_edit();
        if tool != ToolKind::Select {
            self.set_selection(None);
        }
        if tool == ToolKind::Image {
            self.requests.push(EngineRequest::OpenFilePicker);
        }
        self.switch_tool(tool);
    }

    pub fn set_style(&mut self, patch: &StylePatch) {
        self.state.style.apply(patch);
        if let Some(edit) = &mut self.state.text_edit {
            edit.restyle(&self.state.style);
        }
    }

    pub fn set_canvas_size(&mut self, width: f64, height: f64) {
        self.config.canvas_width = width.max(0.0);
        self.config.canvas_height = height.max(0.0);
    }

    // --- Pointer ---

    pub fn on_pointer_down(&mut self, point: Point) {
        self.commit_text_edit();
        match self.state.tool {
            ToolKind::Select => {
                // Clicks on an entity are handled by `on_shape_click`.
                if self.document.entity_at(point, self.config.hit_tolerance).is_none() {
                    self.set_selection(None);
                }
            }
            ToolKind::Pen | ToolKind::Eraser => self.begin_stroke(point),
            ToolKind::Circle => {
                let style = &self.state.style;
                let mut circle = Circle::new(point, style.shape_radius);
                circle.fill = style.fill;
                circle.border_color = style.border_color;
                circle.border_width = style.line_size;
                self.create_and_select(Entity::Circle(circle));
            }
            ToolKind::Rectangle => {
                let style = &self.state.style;
                let mut rect = Rectangle::new(point, style.shape_radius * 2.0, style.shape_height * 2.0);
                rect.fill = style.fill;
                rect.border_color = style.border_color;
                rect.border_width = style.line_size;
                self.create_and_select(Entity::Rectangle(rect));
            }
            ToolKind::Image => self.requests.push(EngineRequest::OpenFilePicker),
            ToolKind::Text => {
                let style = &self.state.style;
                let mut text = Text::new(point, self.config.text_placeholder.clone());
                text.font_family = style.font_family;
                text.font_size = style.font_size;
                text.color = style.text_color;
                text.bold = style.bold;
                text.italic = style.italic;
                text.underline = style.underline;
                self.create_and_select(Entity::Text(text));
            }
        }
    }

    fn begin_stroke(&mut self, point: Point) {
        self.finish_stroke();
        let style = &self.state.style;
        let stroke = if self.state.tool == ToolKind::Eraser {
            Stroke::starting_at(
                point,
                self.config.background,
                style.line_size + self.config.eraser_boost,
                CompositeMode::Erase,
            )
        } else {
            Stroke::starting_at(point, style.line_color, style.line_size, CompositeMode::Normal)
        };
        let key = StrokeKey::random();
        if self.commit(Delta::StrokeBegin { key, stroke }) {
            self.state.drawing = Some(key);
        }
    }

    pub fn on_pointer_move(&mut self, point: Point) {
        if !self.state.tool.draws_strokes() {
            return;
        }
        let Some(key) = self.state.drawing else {
            return;
        };
        if !self.commit(Delta::StrokeExtend { key, point }) {
            self.state.drawing = None;
        }
    }

    pub fn on_pointer_up(&mut self) {
        self.finish_stroke();
    }

    fn finish_stroke(&mut self) {
        if let Some(key) = self.state.drawing.take() {
            self.commit(Delta::StrokeEnd { key });
        }
    }

    // --- Shapes ---

    /// A click that landed on an entity's node.
    pub fn on_shape_click(&mut self, id: EntityId) {
        self.commit_text_edit();
        let Some(kind) = self.document.get(id).map(Entity::kind) else {
            log::debug!("Click on missing entity {}", id);
            return;
        };
        if self.state.tool == ToolKind::Eraser {
            self.commit(Delta::Delete { id });
            self.reconcile();
            return;
        }
        self.select_entity(id, kind);
        if let Some(text) = self.document.get(id).and_then(Entity::as_text) {
            self.state.style.hydrate_from_text(text);
        }
    }

    /// Double-click on a text entity opens the inline editor.
    pub fn on_shape_double_click(&mut self, id: EntityId) {
        self.commit_text_edit();
        let Some(text) = self.document.get(id).and_then(Entity::as_text) else {
            return;
        };
        let session = TextEditSession::begin(text, &self.config);
        self.state.style.hydrate_from_text(text);
        self.state.text_edit = Some(session);
        self.select_entity(id, EntityKind::Text);
    }

    pub fn on_drag_end(&mut self, id: EntityId, position: Point) -> StoreResult<()> {
        self.apply_local(Delta::Update {
            id,
            patch: EntityPatch::moved_to(position),
        })
    }

    pub fn on_transform_end(&mut self, id: EntityId, attrs: &TransformAttrs) -> StoreResult<()> {
        let entity = self.document.get(id).ok_or(StoreError::NotFound(id))?;
        let Some(patch) = bake_transform(entity, attrs, self.config.min_size) else {
            return Ok(());
        };
        self.apply_local(Delta::Update { id, patch })
    }

    /// Bound-box check for an in-progress transform.
    pub fn bound_box(&self, old: Rect, proposed: Rect) -> Rect {
        constrain_bound_box(old, proposed, self.config.min_size)
    }

    pub fn register_node(&mut self, id: EntityId, node: NodeRef) {
        self.transform.register_node(id, node);
    }

    pub fn unregister_node(&mut self, id: EntityId) {
        self.transform.unregister_node(id);
    }

    // --- Text editing ---

    pub fn edit_text(&mut self, content: impl Into<String>) {
        if let Some(edit) = &mut self.state.text_edit {
            edit.content = content.into();
        }
    }

    /// Close the editor, writing its content and the format controls back.
    pub fn commit_text_edit(&mut self) {
        let Some(edit) = self.state.text_edit.take() else {
            return;
        };
        let patch = edit.commit_patch(&self.state.style);
        self.commit(Delta::Update { id: edit.id, patch });
    }

    pub fn on_key(&mut self, key: Key) {
        match key {
            Key::Escape => self.commit_text_edit(),
            Key::Other => {}
        }
    }

    /// A click outside the canvas, e.g. on the page around it.
    pub fn on_outside_click(&mut self) {
        self.commit_text_edit();
    }

    // --- Images ---

    /// Validate and decode a picked file, then place it.
    pub fn on_file_selected(&mut self, file: &SelectedFile) -> Result<(), ImportError> {
        let decoded = import::decode_file(file)?;
        self.on_image_decoded(decoded);
        Ok(())
    }

    /// Place an image whose decode has completed.
    pub fn on_image_decoded(&mut self, decoded: DecodedImage) {
        let intrinsic = decoded.size();
        let rect = if self.config.has_surface() {
            let canvas = Size::new(self.config.canvas_width, self.config.canvas_height);
            import::fit_placement(canvas, intrinsic, self.config.image_max_ratio)
        } else {
            log::debug!("No canvas size yet; placing image at its intrinsic size");
            Rect::from_origin_size(Point::ZERO, intrinsic)
        };
        let image = Image::new(rect.origin(), rect.width(), rect.height(), decoded.source);
        self.create_and_select(Entity::Image(image));
    }

    // --- Export ---

    /// Rasterize the board to PNG under the configured download name.
    /// `None` (logged) when there is no surface or encoding fails. Text needs
    /// a host-supplied font.
    pub fn export_png(&self, font: Option<&FontArc>) -> Option<ExportedImage> {
        match export::export_png(&self.document, &self.config, font) {
            Ok(bytes) => Some(ExportedImage {
                file_name: self.config.export_file_name.clone(),
                bytes,
            }),
            Err(ExportError::NoSurface) => {
                log::warn!("Export requested before the canvas has a size");
                None
            }
            Err(e) => {
                log::error!("Export failed: {}", e);
                None
            }
        }
    }
}
