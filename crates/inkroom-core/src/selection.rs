//! Selection and the shared transform-handle overlay.

use crate::entity::{Drawable, Entity, EntityId, EntityKind, EntityPatch};
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// Distance of the rotation handle above the top edge, in canvas units.
pub const ROTATE_HANDLE_OFFSET: f64 = 50.0;

/// The single selected entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub id: EntityId,
    pub kind: EntityKind,
}

/// Opaque reference to a node in the host's render tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u64);

/// Node attributes reported when an interactive transform ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformAttrs {
    /// New anchor (center for circles, top-left otherwise).
    pub position: Point,
    pub scale_x: f64,
    pub scale_y: f64,
    /// Degrees. Ignored for kinds without rotation.
    pub rotation: f64,
}

impl TransformAttrs {
    /// A pure translation.
    pub fn moved(position: Point) -> Self {
        Self {
            position,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
        }
    }
}

/// Anchors of the handle overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleRight,
    MiddleLeft,
    BottomLeft,
    BottomCenter,
    BottomRight,
    Rotate,
}

/// A handle and where it sits on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub kind: HandleKind,
    pub position: Point,
}

/// Whether the kind keeps the rotation a transform reports.
pub fn supports_rotation(kind: EntityKind) -> bool {
    matches!(kind, EntityKind::Image | EntityKind::Text)
}

/// Handles for an entity: eight resize anchors, plus a rotation handle for
/// kinds that store rotation.
pub fn handles_for(entity: &Entity) -> Vec<Handle> {
    let (local, placement) = match entity {
        Entity::Stroke(_) => return Vec::new(),
        Entity::Circle(c) => (c.bounds(), kurbo::Affine::IDENTITY),
        Entity::Rectangle(r) => (r.bounds(), kurbo::Affine::IDENTITY),
        Entity::Image(i) => (Rect::new(0.0, 0.0, i.width, i.height), entity.placement()),
        Entity::Text(t) => {
            let (w, h) = t.measured_size();
            (Rect::new(0.0, 0.0, w, h), entity.placement())
        }
    };
    let (cx, cy) = (local.center().x, local.center().y);
    let mut anchors = vec![
        (HandleKind::TopLeft, Point::new(local.x0, local.y0)),
        (HandleKind::TopCenter, Point::new(cx, local.y0)),
        (HandleKind::TopRight, Point::new(local.x1, local.y0)),
        (HandleKind::MiddleRight, Point::new(local.x1, cy)),
        (HandleKind::MiddleLeft, Point::new(local.x0, cy)),
        (HandleKind::BottomLeft, Point::new(local.x0, local.y1)),
        (HandleKind::BottomCenter, Point::new(cx, local.y1)),
        (HandleKind::BottomRight, Point::new(local.x1, local.y1)),
    ];
    if supports_rotation(entity.kind()) {
        anchors.push((HandleKind::Rotate, Point::new(cx, local.y0 - ROTATE_HANDLE_OFFSET)));
    }
    anchors
        .into_iter()
        .map(|(kind, p)| Handle {
            kind,
            position: placement * p,
        })
        .collect()
}

/// Bound-box check run while a transform is in progress: proposals narrower
/// or shorter than `min_size` are rejected and the previous box is kept.
pub fn constrain_bound_box(old: Rect, proposed: Rect, min_size: f64) -> Rect {
    if proposed.width() < min_size || proposed.height() < min_size {
        old
    } else {
        proposed
    }
}

/// Bake a finished transform into stored geometry.
///
/// Scale is multiplied into width/height/radius (clamped to `min_size`) so
/// the node can go back to a scale of 1. Returns `None` for strokes.
pub fn bake_transform(entity: &Entity, attrs: &TransformAttrs, min_size: f64) -> Option<EntityPatch> {
    let floor = |v: f64| v.max(min_size);
    let mut patch = EntityPatch::moved_to(attrs.position);
    match entity {
        Entity::Stroke(_) => return None,
        Entity::Circle(c) => {
            patch.radius = Some(floor(c.radius * attrs.scale_x));
        }
        Entity::Rectangle(r) => {
            patch.width = Some(floor(r.width * attrs.scale_x));
            patch.height = Some(floor(r.height * attrs.scale_y));
        }
        Entity::Image(i) => {
            patch.width = Some(floor(i.width * attrs.scale_x));
            patch.height = Some(floor(i.height * attrs.scale_y));
        }
        Entity::Text(t) => {
            let (w, h) = t.measured_size();
            patch.width = Some(floor(w * attrs.scale_x));
            patch.height = Some(floor(h * attrs.scale_y));
        }
    }
    if supports_rotation(entity.kind()) {
        patch.rotation = Some(attrs.rotation);
    }
    Some(patch)
}

/// Keeps the one shared handle overlay attached to the selected entity's
/// rendered node.
///
/// The host registers nodes as it renders them; the controller never looks
/// nodes up in the render tree itself.
#[derive(Debug, Clone, Default)]
pub struct TransformController {
    nodes: HashMap<EntityId, NodeRef>,
    /// Entity the overlay should be on, even if its node is not rendered yet.
    target: Option<EntityId>,
    attached: Option<NodeRef>,
}

impl TransformController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_node(&mut self, id: EntityId, node: NodeRef) {
        self.nodes.insert(id, node);
        if self.target == Some(id) {
            self.attached = Some(node);
        }
    }

    pub fn unregister_node(&mut self, id: EntityId) {
        if let Some(node) = self.nodes.remove(&id) {
            if self.attached == Some(node) {
                self.attached = None;
            }
        }
    }

    /// Follow a selection change: attach to the new node, or detach.
    pub fn sync(&mut self, selection: Option<Selection>) {
        self.target = selection.map(|s| s.id);
        self.attached = self.target.and_then(|id| self.nodes.get(&id).copied());
    }

    /// Node currently carrying the overlay.
    pub fn attached(&self) -> Option<NodeRef> {
        self.attached
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Circle, Image, ImageSource, Rectangle, Text};

    fn image() -> Entity {
        Entity::Image(Image::new(
            Point::new(10.0, 10.0),
            100.0,
            50.0,
            ImageSource::new(&[0u8; 4], 200, 100),
        ))
    }

    #[test]
    fn test_bake_circle_scale() {
        let circle = Entity::Circle(Circle::new(Point::ZERO, 30.0));
        let attrs = TransformAttrs {
            position: Point::new(5.0, 6.0),
            scale_x: 2.0,
            scale_y: 2.0,
            rotation: 45.0,
        };
        let patch = bake_transform(&circle, &attrs, 5.0).unwrap();
        assert_eq!(patch.radius, Some(60.0));
        assert_eq!(patch.position, Some(Point::new(5.0, 6.0)));
        // Circles do not keep rotation.
        assert_eq!(patch.rotation, None);
    }

    #[test]
    fn test_bake_clamps_to_floor() {
        let rect = Entity::Rectangle(Rectangle::new(Point::ZERO, 60.0, 60.0));
        let attrs = TransformAttrs {
            position: Point::ZERO,
            scale_x: 0.01,
            scale_y: 0.5,
            rotation: 0.0,
        };
        let patch = bake_transform(&rect, &attrs, 5.0).unwrap();
        assert_eq!(patch.width, Some(5.0));
        assert_eq!(patch.height, Some(30.0));
    }

    #[test]
    fn test_bake_keeps_rotation_for_images_and_text() {
        let attrs = TransformAttrs {
            position: Point::ZERO,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 30.0,
        };
        assert_eq!(bake_transform(&image(), &attrs, 5.0).unwrap().rotation, Some(30.0));
        let text = Entity::Text(Text::new(Point::ZERO, "abc"));
        let patch = bake_transform(&text, &attrs, 5.0).unwrap();
        assert_eq!(patch.rotation, Some(30.0));
        assert!((patch.width.unwrap() - 3.0 * 24.0 * 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_constrain_bound_box() {
        let old = Rect::new(0.0, 0.0, 50.0, 50.0);
        assert_eq!(constrain_bound_box(old, Rect::new(0.0, 0.0, 4.0, 50.0), 5.0), old);
        let ok = Rect::new(0.0, 0.0, 5.0, 6.0);
        assert_eq!(constrain_bound_box(old, ok, 5.0), ok);
    }

    #[test]
    fn test_handles() {
        let rect = Entity::Rectangle(Rectangle::new(Point::ZERO, 60.0, 40.0));
        let handles = handles_for(&rect);
        assert_eq!(handles.len(), 8);
        assert!(handles.iter().all(|h| h.kind != HandleKind::Rotate));
        let img = handles_for(&image());
        assert_eq!(img.len(), 9);
        let rotate = img.iter().find(|h| h.kind == HandleKind::Rotate).unwrap();
        assert_eq!(rotate.position, Point::new(60.0, 10.0 - ROTATE_HANDLE_OFFSET));
    }

    #[test]
    fn test_controller_attaches_when_node_registers_late() {
        let mut ctl = TransformController::new();
        let id = crate::entity::new_entity_id();
        ctl.sync(Some(Selection { id, kind: EntityKind::Circle }));
        assert_eq!(ctl.attached(), None);
        ctl.register_node(id, NodeRef(7));
        assert_eq!(ctl.attached(), Some(NodeRef(7)));
        ctl.sync(None);
        assert_eq!(ctl.attached(), None);
        assert_eq!(ctl.target(), None);
    }

    #[test]
    fn test_unregister_detaches() {
        let mut ctl = TransformController::new();
        let id = crate::entity::new_entity_id();
        ctl.register_node(id, NodeRef(1));
        ctl.sync(Some(Selection { id, kind: EntityKind::Text }));
        assert_eq!(ctl.attached(), Some(NodeRef(1)));
        ctl.unregister_node(id);
        assert_eq!(ctl.attached(), None);
    }
}
