use crate::entity_manager::ScriptedEntityManager;
use crate::scripts::ObjectId;
use crate::types::Vector;

/// Modifier-driven entity pick and drag state layered over tool input.
#[derive(Debug, Default, Clone)]
pub struct EntitySelection {
    selected: Vec<ObjectId>,
    draw_pointer: bool,
    suppress_trigger: bool,
}

impl EntitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn as_slice(&self) -> &[ObjectId] {
        &self.selected
    }

    pub fn get(&self, index: usize) -> Option<ObjectId> {
        self.selected.get(index).copied()
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.selected.contains(&object)
    }

    pub fn add(&mut self, object: ObjectId) {
        if !self.contains(object) {
            self.selected.push(object);
        }
    }

    pub fn take(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.selected)
    }

    /// Drops entries the entity manager no longer holds.
    pub fn prune(&mut self, entities: &ScriptedEntityManager) {
        self.selected.retain(|object| entities.is_valid_entity(*object));
    }

    pub fn draw_pointer(&self) -> bool {
        self.draw_pointer
    }

    pub fn set_draw_pointer(&mut self, draw: bool) {
        self.draw_pointer = draw;
    }

    pub fn suppress_next_trigger(&mut self) {
        self.suppress_trigger = true;
    }

    pub fn is_trigger_suppressed(&self) -> bool {
        self.suppress_trigger
    }

    /// Returns true once for each suppressed trigger.
    pub fn consume_suppressed_trigger(&mut self) -> bool {
        std::mem::take(&mut self.suppress_trigger)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
        self.draw_pointer = false;
        self.suppress_trigger = false;
    }
}

/// First movable entity whose selection rectangle contains `point`.
pub fn pick_movable(entities: &ScriptedEntityManager, point: Vector) -> Option<ObjectId> {
    entities
        .iter()
        .filter(|entity| entity.is_movable())
        .find(|entity| entity.selection_contains(point))
        .map(|entity| entity.id())
}
