use std::ops::Index;

use crate::entity::ScriptedEntity;
use crate::scripts::{ObjectId, ScriptObject};
use crate::trace::EntityTrace;
use crate::types::{DamageType, Vector};

/// Live scripted entities in spawn order.
#[derive(Debug, Default)]
pub struct ScriptedEntityManager {
    entities: Vec<ScriptedEntity>,
}

impl ScriptedEntityManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `object` and adds it after `OnSpawn`. Nothing is added and no
    /// callback runs when the object is not alive.
    pub fn spawn(&mut self, object: ScriptObject, at: Vector) -> bool {
        let entity = ScriptedEntity::new(object);
        if !entity.is_ready() {
            log::warn!("[entities] refusing to spawn {}: object is not ready", entity.id());
            return false;
        }
        entity.on_spawn(at);
        self.entities.push(entity);
        true
    }

    /// One frame of entity logic: process, pairwise damage, removal.
    ///
    /// A colliding pair is visited once from each side, so both entities can
    /// be damaged twice in the same frame.
    pub fn process(&mut self) {
        let mut i = 0;
        while i < self.entities.len() {
            let entity = &self.entities[i];
            entity.on_process();

            let damage_type = entity.damage_type();
            if damage_type.is_damageable() {
                if let Some(model) = entity.model() {
                    let name = (damage_type == DamageType::ExcludeSameName).then(|| entity.name());
                    for (j, other) in self.entities.iter().enumerate() {
                        if j == i || !other.damage_type().is_damageable() {
                            continue;
                        }
                        if let Some(name) = &name {
                            if *name == other.name() {
                                continue;
                            }
                        }
                        let Some(other_model) = other.model() else {
                            continue;
                        };
                        if model.is_collided(entity.position(), other.position(), &other_model) {
                            entity.on_damage(other.damage_value());
                            other.on_damage(entity.damage_value());
                        }
                    }
                }
            }

            if entity.needs_removal() {
                entity.on_release();
                self.entities.remove(i);
                continue;
            }
            i += 1;
        }
    }

    pub fn draw(&self) {
        for entity in &self.entities {
            entity.on_draw();
        }
    }

    pub fn draw_on_top(&self) {
        for entity in &self.entities {
            entity.on_draw_on_top();
        }
    }

    /// Removes every entity that allows user-initiated cleanup.
    pub fn on_user_clean(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|entity| {
            if entity.do_user_cleaning() {
                entity.on_release();
                false
            } else {
                true
            }
        });
        before - self.entities.len()
    }

    /// Releases every entity, `OnRelease` first.
    pub fn clear(&mut self) {
        for entity in self.entities.drain(..) {
            entity.on_release();
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScriptedEntity> {
        self.entities.get(index)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ScriptedEntity> {
        self.entities.iter()
    }

    pub fn object_at(&self, index: usize) -> Option<ObjectId> {
        self.entities.get(index).map(ScriptedEntity::id)
    }

    pub fn is_valid_entity(&self, object: ObjectId) -> bool {
        self.entity_id(object).is_some()
    }

    pub fn entity_id(&self, object: ObjectId) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id() == object)
    }

    pub fn find(&self, object: ObjectId) -> Option<&ScriptedEntity> {
        self.entities.iter().find(|entity| entity.id() == object)
    }

    pub fn trace(&self, start: Vector, end: Vector, ignore: Option<ObjectId>) -> EntityTrace {
        EntityTrace::run(self, start, end, ignore)
    }
}

impl Index<usize> for ScriptedEntityManager {
    type Output = ScriptedEntity;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entities[index]
    }
}

impl Drop for ScriptedEntityManager {
    fn drop(&mut self) {
        self.clear();
    }
}
