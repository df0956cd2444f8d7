//! Document store: every entity on the board, in paint order.

use crate::delta::{Delta, StrokeKey};
use crate::entity::{Entity, EntityId, EntityKind, EntityPatch, Stroke};
use kurbo::Point;
use std::collections::HashMap;
use thiserror::Error;

/// Store errors. Callers are expected to tolerate them: a remote delta may
/// well target something that was deleted locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Entity not found: {0}")]
    NotFound(EntityId),
    #[error("No open stroke with key {0}")]
    StrokeNotOpen(StrokeKey),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// All entities of a board.
///
/// Entities are kept in insertion order; `index` maps ids to positions and
/// `open_strokes` maps in-progress stroke keys to positions.
#[derive(Debug, Clone, Default)]
pub struct Document {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    open_strokes: HashMap<StrokeKey, usize>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity at the end of the paint order.
    ///
    /// An entity whose id already exists replaces the stored one in place.
    /// Returns the id (strokes have none).
    pub fn create(&mut self, entity: Entity) -> Option<EntityId> {
        let id = entity.id();
        match id.and_then(|id| self.index.get(&id).copied()) {
            Some(pos) => self.entities[pos] = entity,
            None => {
                if let Some(id) = id {
                    self.index.insert(id, self.entities.len());
                }
                self.entities.push(entity);
            }
        }
        id
    }

    /// Patch an entity in place.
    pub fn update(&mut self, id: EntityId, patch: &EntityPatch) -> StoreResult<()> {
        let pos = *self.index.get(&id).ok_or(StoreError::NotFound(id))?;
        self.entities[pos].apply(patch);
        Ok(())
    }

    /// Remove an entity, returning it.
    pub fn delete(&mut self, id: EntityId) -> StoreResult<Entity> {
        let pos = self.index.remove(&id).ok_or(StoreError::NotFound(id))?;
        let entity = self.entities.remove(pos);
        for p in self.index.values_mut().chain(self.open_strokes.values_mut()) {
            if *p > pos {
                *p -= 1;
            }
        }
        Ok(entity)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.index.get(&id).map(|&pos| &self.entities[pos])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Entities of one kind, in insertion order.
    pub fn list(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind() == kind)
    }

    pub fn strokes(&self) -> impl Iterator<Item = &Stroke> {
        self.entities.iter().filter_map(Entity::as_stroke)
    }

    /// All entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Entities in stage paint order: kind layers bottom to top, each in
    /// insertion order.
    pub fn paint_order(&self) -> impl Iterator<Item = &Entity> {
        EntityKind::LAYERS.into_iter().flat_map(|kind| self.list(kind))
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
        self.open_strokes.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Start a stroke addressed by `key` until it is ended.
    pub fn begin_stroke(&mut self, key: StrokeKey, stroke: Stroke) {
        self.open_strokes.insert(key, self.entities.len());
        self.entities.push(Entity::Stroke(stroke));
    }

    pub fn extend_stroke(&mut self, key: StrokeKey, point: Point) -> StoreResult<()> {
        let pos = *self.open_strokes.get(&key).ok_or(StoreError::StrokeNotOpen(key))?;
        if let Entity::Stroke(stroke) = &mut self.entities[pos] {
            stroke.add_point(point);
        }
        Ok(())
    }

    pub fn end_stroke(&mut self, key: StrokeKey) -> StoreResult<()> {
        self.open_strokes
            .remove(&key)
            .map(|_| ())
            .ok_or(StoreError::StrokeNotOpen(key))
    }

    pub fn open_stroke(&self, key: StrokeKey) -> Option<&Stroke> {
        self.open_strokes
            .get(&key)
            .and_then(|&pos| self.entities[pos].as_stroke())
    }

    /// Apply one delta. Local input and remote deltas both come through here.
    pub fn apply(&mut self, delta: &Delta) -> StoreResult<()> {
        match delta {
            Delta::StrokeBegin { key, stroke } => {
                self.begin_stroke(*key, stroke.clone());
                Ok(())
            }
            Delta::StrokeExtend { key, point } => self.extend_stroke(*key, *point),
            Delta::StrokeEnd { key } => self.end_stroke(*key),
            Delta::Create { entity } => {
                self.create(entity.clone());
                Ok(())
            }
            Delta::Update { id, patch } => self.update(*id, patch),
            Delta::Delete { id } => self.delete(*id).map(|_| ()),
            Delta::Clear => {
                self.clear();
                Ok(())
            }
        }
    }

    /// Topmost selectable entity under `point`. Strokes are never hit.
    pub fn entity_at(&self, point: Point, tolerance: f64) -> Option<&Entity> {
        self.paint_order()
            .filter(|e| e.kind() != EntityKind::Stroke)
            .filter(|e| e.hit_test(point, tolerance))
            .last()
    }
}
