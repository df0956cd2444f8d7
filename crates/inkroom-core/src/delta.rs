//! Drawing deltas: the unit of change shared by local input and the relay.

use crate::entity::{Entity, EntityId, EntityPatch, Stroke};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Correlates the begin/extend/end deltas of one in-progress stroke.
///
/// Only meaningful while the stroke is open; strokes have no identity once
/// finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeKey(pub u64);

impl StrokeKey {
    pub fn random() -> Self {
        Self(Uuid::new_v4().as_u64_pair().0)
    }
}

impl fmt::Display for StrokeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One change to the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Delta {
    /// A pen or eraser stroke started.
    StrokeBegin { key: StrokeKey, stroke: Stroke },
    /// A point was appended to an open stroke.
    StrokeExtend { key: StrokeKey, point: Point },
    /// The stroke was finished.
    StrokeEnd { key: StrokeKey },
    /// An entity was created (replaces any entity with the same id).
    Create { entity: Entity },
    Update { id: EntityId, patch: EntityPatch },
    Delete { id: EntityId },
    Clear,
}
