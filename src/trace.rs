use std::ops::Index;

use crate::entity_manager::ScriptedEntityManager;
use crate::geometry::BoundingBox;
use crate::scripts::ObjectId;
use crate::types::{DamageType, Vector};

/// Entities found by a stepped point-to-point scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityTrace {
    hits: Vec<ObjectId>,
    stopped_at: Vector,
}

impl EntityTrace {
    /// Walks from `start` to `end`, moving each axis one unit toward its
    /// target per step, and stops at the first position (end included) where
    /// any damageable entity other than `ignore` contains the point.
    pub fn run(entities: &ScriptedEntityManager, start: Vector, end: Vector, ignore: Option<ObjectId>) -> Self {
        Self::through(&EntitySnapshot::capture(entities), start, end, ignore)
    }

    /// Same walk as [`EntityTrace::run`] over already captured entity state.
    pub fn through(snapshot: &EntitySnapshot, start: Vector, end: Vector, ignore: Option<ObjectId>) -> Self {
        let targets: Vec<&EntityView> = snapshot
            .iter()
            .filter(|view| Some(view.object) != ignore && view.damage_type.is_damageable() && view.bbox.is_some())
            .collect();
        let mut cursor = start;
        loop {
            let hits: Vec<ObjectId> =
                targets.iter().filter(|view| view.contains(cursor)).map(|view| view.object).collect();
            if !hits.is_empty() || cursor == end {
                return Self { hits, stopped_at: cursor };
            }
            cursor.x += end.x.cmp(&cursor.x) as i32;
            cursor.y += end.y.cmp(&cursor.y) as i32;
        }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.hits.get(index).copied()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = ObjectId> + '_ {
        self.hits.iter().copied()
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.hits
    }

    /// Last position tested by the scan.
    pub fn stopped_at(&self) -> Vector {
        self.stopped_at
    }
}

impl Index<usize> for EntityTrace {
    type Output = ObjectId;

    fn index(&self, index: usize) -> &Self::Output {
        &self.hits[index]
    }
}

/// State of one live entity as answered by its script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityView {
    pub object: ObjectId,
    pub position: Vector,
    pub damage_type: DamageType,
    /// Collision box of the entity's model, if it has one.
    pub bbox: Option<BoundingBox>,
}

impl EntityView {
    fn contains(&self, point: Vector) -> bool {
        self.bbox.as_ref().is_some_and(|bbox| bbox.is_inside(self.position, point))
    }
}

/// Live entities in spawn order, queried once so script code can inspect
/// them without calling back into the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySnapshot {
    views: Vec<EntityView>,
}

impl EntitySnapshot {
    pub fn capture(entities: &ScriptedEntityManager) -> Self {
        let views = entities
            .iter()
            .map(|entity| EntityView {
                object: entity.id(),
                position: entity.position(),
                damage_type: entity.damage_type(),
                bbox: entity.model().map(|model| model.bbox().clone()),
            })
            .collect();
        Self { views }
    }

    pub fn from_views(views: Vec<EntityView>) -> Self {
        Self { views }
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EntityView> {
        self.views.get(index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &EntityView> {
        self.views.iter()
    }

    /// Spawn-order index of `object`.
    pub fn index_of(&self, object: ObjectId) -> Option<usize> {
        self.views.iter().position(|view| view.object == object)
    }

    pub fn find(&self, object: ObjectId) -> Option<&EntityView> {
        self.views.iter().find(|view| view.object == object)
    }

    pub fn trace(&self, start: Vector, end: Vector, ignore: Option<ObjectId>) -> EntityTrace {
        EntityTrace::through(self, start, end, ignore)
    }
}
