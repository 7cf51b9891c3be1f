use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::geometry::SharedModel;
use crate::trace::EntitySnapshot;
use crate::types::Vector;

pub mod rhai_bridge;
pub mod signatures;

pub use rhai_bridge::RhaiBridge;
pub use signatures::{entity_api, tool_api, ScriptFn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object#{}", self.0)
    }
}

/// Result shape a script entry point is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Unit,
    Bool,
    Int,
    Float,
    Str,
    Vector,
    /// A model, or unit when the object has none.
    Model,
    /// A structured record, or unit when the script declined.
    Record,
}

/// Typed value crossing the native/script boundary.
#[derive(Debug, Clone, Default)]
pub enum ScriptValue {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Vector(Vector),
    Model(SharedModel),
    Record(serde_json::Value),
}

impl ScriptValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ScriptValue::Float(value) => Some(*value),
            ScriptValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<Vector> {
        match self {
            ScriptValue::Vector(value) => Some(*value),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ScriptValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_model(self) -> Option<SharedModel> {
        match self {
            ScriptValue::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<serde_json::Value> {
        match self {
            ScriptValue::Record(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, ScriptValue::Unit)
    }
}

impl From<bool> for ScriptValue {
    fn from(value: bool) -> Self {
        ScriptValue::Bool(value)
    }
}

impl From<i64> for ScriptValue {
    fn from(value: i64) -> Self {
        ScriptValue::Int(value)
    }
}

impl From<Vector> for ScriptValue {
    fn from(value: Vector) -> Self {
        ScriptValue::Vector(value)
    }
}

impl From<&str> for ScriptValue {
    fn from(value: &str) -> Self {
        ScriptValue::Str(value.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("loading script '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("{0} is not loaded")]
    UnknownModule(ModuleId),
    #[error("{0} is not alive")]
    UnknownObject(ObjectId),
    #[error("class '{class}' is not defined in {module}")]
    UnknownClass { module: ModuleId, class: String },
    #[error("function '{0}' is not defined")]
    MissingFunction(String),
    #[error("'{function}' failed: {message}")]
    Runtime { function: String, message: String },
    #[error("'{function}' returned a value that is not {expected:?}")]
    TypeMismatch { function: String, expected: ReturnKind },
}

impl ScriptError {
    pub fn is_missing_function(&self) -> bool {
        matches!(self, ScriptError::MissingFunction(_))
    }
}

/// Requests queued by script code for the host to apply between callbacks.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    /// `object` carries one reference that the receiver adopts.
    SpawnEntity { module: ModuleId, object: ObjectId, position: Vector },
    SetCursorOffset(Vector),
    SetCursorRotation(f32),
}

/// Boundary to the embedded script VM.
///
/// Every call blocks until the VM returns. Failures come back as
/// [`ScriptError`] and callers treat them as ordinary negative results.
pub trait ScriptBridge {
    fn load_module(&self, path: &Path) -> Result<ModuleId, ScriptError>;
    fn unload_module(&self, module: ModuleId) -> bool;
    fn is_module_loaded(&self, module: ModuleId) -> bool;

    fn alloc_object(&self, module: ModuleId, class: &str) -> Result<ObjectId, ScriptError>;
    fn retain_object(&self, object: ObjectId) -> bool;
    fn release_object(&self, object: ObjectId) -> bool;
    fn is_object_alive(&self, object: ObjectId) -> bool;

    fn call_function(
        &self,
        module: ModuleId,
        function: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;

    fn call_method(
        &self,
        module: ModuleId,
        object: ObjectId,
        method: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;

    fn take_commands(&self) -> Vec<ScriptCommand>;

    /// Replaces the entity state that script queries and traces answer from.
    /// The host publishes it before each batch of callbacks.
    fn publish_entities(&self, snapshot: EntitySnapshot);
}

/// Loaded module that is unloaded exactly once when dropped.
pub struct ScriptModule {
    id: ModuleId,
    bridge: Rc<dyn ScriptBridge>,
}

impl ScriptModule {
    pub fn load(bridge: &Rc<dyn ScriptBridge>, path: &Path) -> Result<Self, ScriptError> {
        let id = bridge.load_module(path)?;
        Ok(Self { id, bridge: Rc::clone(bridge) })
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn bridge(&self) -> &Rc<dyn ScriptBridge> {
        &self.bridge
    }

    pub fn call(&self, function: &ScriptFn, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        self.bridge.call_function(self.id, function, args)
    }
}

impl fmt::Debug for ScriptModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScriptModule").field(&self.id).finish()
    }
}

impl Drop for ScriptModule {
    fn drop(&mut self) {
        if !self.bridge.unload_module(self.id) {
            log::warn!("[script] {} was already unloaded", self.id);
        }
    }
}

/// Owning reference to a script object instance.
///
/// Dropping releases exactly one reference; copies go through [`ScriptObject::retain`].
pub struct ScriptObject {
    id: ObjectId,
    module: ModuleId,
    bridge: Rc<dyn ScriptBridge>,
}

impl ScriptObject {
    /// Takes over a reference the bridge already counted for the caller.
    pub fn adopt(bridge: Rc<dyn ScriptBridge>, module: ModuleId, id: ObjectId) -> Self {
        Self { id, module, bridge }
    }

    pub fn alloc(bridge: &Rc<dyn ScriptBridge>, module: ModuleId, class: &str) -> Result<Self, ScriptError> {
        let id = bridge.alloc_object(module, class)?;
        Ok(Self::adopt(Rc::clone(bridge), module, id))
    }

    pub fn retain(&self) -> Option<Self> {
        if self.bridge.retain_object(self.id) {
            Some(Self::adopt(Rc::clone(&self.bridge), self.module, self.id))
        } else {
            None
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn is_alive(&self) -> bool {
        self.bridge.is_object_alive(self.id)
    }

    pub fn call(&self, method: &ScriptFn, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        self.bridge.call_method(self.module, self.id, method, args)
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject").field("id", &self.id).field("module", &self.module).finish()
    }
}

impl Drop for ScriptObject {
    fn drop(&mut self) {
        self.bridge.release_object(self.id);
    }
}
