use crate::geometry::SharedModel;
use crate::scripts::{entity_api, ObjectId, ScriptFn, ScriptObject, ScriptValue};
use crate::types::{self, DamageType, DamageValue, Vector};

/// Native facade over one script object spawned by a tool.
///
/// Each method forwards to the script method of the same role. A failed call
/// is logged and answered with the neutral value for that query.
#[derive(Debug)]
pub struct ScriptedEntity {
    object: ScriptObject,
}

impl ScriptedEntity {
    pub fn new(object: ScriptObject) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &ScriptObject {
        &self.object
    }

    pub fn id(&self) -> ObjectId {
        self.object.id()
    }

    pub fn is_ready(&self) -> bool {
        self.object.is_alive()
    }

    fn invoke(&self, method: &ScriptFn, args: &[ScriptValue]) -> Option<ScriptValue> {
        match self.object.call(method, args) {
            Ok(value) => Some(value),
            Err(err) if err.is_missing_function() => {
                log::debug!("[entities] {} has no {}", self.object.id(), method.name);
                None
            }
            Err(err) => {
                log::warn!("[entities] {} {}: {err}", self.object.id(), method.decl);
                None
            }
        }
    }

    fn notify(&self, method: &ScriptFn, args: &[ScriptValue]) {
        let _ = self.invoke(method, args);
    }

    fn query_bool(&self, method: &ScriptFn) -> bool {
        self.invoke(method, &[]).and_then(|value| value.as_bool()).unwrap_or(false)
    }

    fn query_vector(&self, method: &ScriptFn) -> Vector {
        self.invoke(method, &[]).and_then(|value| value.as_vector()).unwrap_or(Vector::ZERO)
    }

    pub fn on_spawn(&self, at: Vector) {
        self.notify(&entity_api::ON_SPAWN, &[at.into()]);
    }

    pub fn on_release(&self) {
        self.notify(&entity_api::ON_RELEASE, &[]);
    }

    pub fn on_process(&self) {
        self.notify(&entity_api::ON_PROCESS, &[]);
    }

    pub fn on_draw(&self) {
        self.notify(&entity_api::ON_DRAW, &[]);
    }

    pub fn on_draw_on_top(&self) {
        self.notify(&entity_api::ON_DRAW_ON_TOP, &[]);
    }

    pub fn do_user_cleaning(&self) -> bool {
        self.query_bool(&entity_api::DO_USER_CLEANING)
    }

    pub fn damage_type(&self) -> DamageType {
        let raw = match self.invoke(&entity_api::IS_DAMAGEABLE, &[]).and_then(|value| value.as_int()) {
            Some(raw) => raw,
            None => return DamageType::None,
        };
        if DamageType::from_raw(raw).is_none() {
            log::debug!("[entities] {} reported damage type {raw}, treating it as damageable", self.object.id());
        }
        DamageType::from_script(raw)
    }

    pub fn on_damage(&self, value: DamageValue) {
        self.notify(&entity_api::ON_DAMAGE, &[ScriptValue::Int(i64::from(value))]);
    }

    pub fn model(&self) -> Option<SharedModel> {
        self.invoke(&entity_api::GET_MODEL, &[]).and_then(ScriptValue::into_model)
    }

    pub fn position(&self) -> Vector {
        self.query_vector(&entity_api::GET_POSITION)
    }

    pub fn rotation(&self) -> f32 {
        self.invoke(&entity_api::GET_ROTATION, &[]).and_then(|value| value.as_float()).unwrap_or(0.0) as f32
    }

    pub fn is_movable(&self) -> bool {
        self.query_bool(&entity_api::IS_MOVABLE)
    }

    pub fn selection_size(&self) -> Vector {
        self.query_vector(&entity_api::GET_SELECTION_SIZE)
    }

    pub fn damage_value(&self) -> DamageValue {
        self.invoke(&entity_api::GET_DAMAGE_VALUE, &[])
            .and_then(|value| value.as_int())
            .map(|raw| raw.clamp(0, i64::from(DamageValue::MAX)) as DamageValue)
            .unwrap_or(0)
    }

    pub fn needs_removal(&self) -> bool {
        self.query_bool(&entity_api::NEEDS_REMOVAL)
    }

    pub fn name(&self) -> String {
        self.invoke(&entity_api::GET_NAME, &[]).and_then(ScriptValue::into_string).unwrap_or_default()
    }

    pub fn move_to(&self, target: Vector) {
        self.notify(&entity_api::MOVE_TO, &[target.into()]);
    }

    /// Strict hit test against the selection rectangle centred on the entity.
    pub fn selection_contains(&self, point: Vector) -> bool {
        let size = self.selection_size();
        let min = types::sub_clamped(self.position(), size / 2);
        let max = types::add_clamped(min, size);
        point.x > min.x && point.x < max.x && point.y > min.y && point.y < max.y
    }
}
