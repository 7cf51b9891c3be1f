#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use deskgame_engine::config::RuntimeConfig;
use deskgame_engine::geometry::{BoundingBox, Model, SharedModel};
use deskgame_engine::render::{OwnedSprite, RenderService, SpriteDraw, SpriteId, SpriteRequest};
use deskgame_engine::scripts::{
    ModuleId, ObjectId, ScriptBridge, ScriptCommand, ScriptError, ScriptFn, ScriptObject, ScriptValue,
};
use deskgame_engine::time::ManualClock;
use deskgame_engine::trace::EntitySnapshot;
use deskgame_engine::tools::ToolManager;
use deskgame_engine::types::{Color, DamageType, Vector};
use serde_json::json;

/// Scripted behaviour of one fake tool module.
#[derive(Debug, Clone)]
pub struct FakeTool {
    pub info: Option<serde_json::Value>,
    pub initialize: bool,
    pub spawn_on_trigger: Option<FakeEntity>,
}

impl FakeTool {
    pub fn named(name: &str) -> Self {
        Self { info: Some(tool_info(name, 100)), initialize: true, spawn_on_trigger: None }
    }

    pub fn with_delay(name: &str, trigger_delay: u64) -> Self {
        Self { info: Some(tool_info(name, trigger_delay)), ..Self::named(name) }
    }
}

pub fn tool_info(name: &str, trigger_delay: u64) -> serde_json::Value {
    json!({
        "name": name,
        "version": "1.0",
        "author": "tests",
        "contact": "",
        "category": "Misc",
        "preview_image": "preview.png",
        "cursor": "cursor.png",
        "cursor_width": 32,
        "cursor_height": 32,
        "trigger_delay": trigger_delay,
    })
}

/// State answered by a fake entity object.
#[derive(Debug, Clone)]
pub struct FakeEntity {
    pub name: String,
    pub damage_type: i64,
    pub damage_value: i64,
    pub position: Vector,
    pub model: Option<SharedModel>,
    pub movable: bool,
    pub selection_size: Vector,
    pub needs_removal: bool,
    pub user_cleaning: bool,
    pub failing: bool,
}

impl FakeEntity {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            damage_type: DamageType::None.raw(),
            damage_value: 0,
            position: Vector::ZERO,
            model: None,
            movable: false,
            selection_size: Vector::ZERO,
            needs_removal: false,
            user_cleaning: false,
            failing: false,
        }
    }

    pub fn damageable(mut self, damage_type: DamageType, value: i64, model: SharedModel) -> Self {
        self.damage_type = damage_type.raw();
        self.damage_value = value;
        self.model = Some(model);
        self
    }

    pub fn movable(mut self, selection_size: Vector) -> Self {
        self.movable = true;
        self.selection_size = selection_size;
        self
    }
}

struct FakeObject {
    refs: u32,
    entity: FakeEntity,
}

#[derive(Default)]
struct FakeState {
    next_module: u32,
    next_object: u32,
    tools: HashMap<PathBuf, FakeTool>,
    modules: HashMap<ModuleId, PathBuf>,
    objects: HashMap<ObjectId, FakeObject>,
    commands: Vec<ScriptCommand>,
    calls: Vec<String>,
    published: Vec<EntitySnapshot>,
}

impl FakeState {
    fn module_name(&self, module: ModuleId) -> String {
        self.modules
            .get(&module)
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn insert_object(&mut self, entity: FakeEntity) -> ObjectId {
        self.next_object += 1;
        let id = ObjectId(self.next_object);
        self.objects.insert(id, FakeObject { refs: 1, entity });
        id
    }
}

/// Script bridge double that records every call in order.
#[derive(Default)]
pub struct FakeBridge {
    state: RefCell<FakeState>,
}

impl FakeBridge {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn register_tool(&self, path: impl Into<PathBuf>, tool: FakeTool) {
        self.state.borrow_mut().tools.insert(path.into(), tool);
    }

    /// Creates an object holding one reference for the caller to adopt.
    pub fn create_object(&self, entity: FakeEntity) -> ObjectId {
        self.state.borrow_mut().insert_object(entity)
    }

    pub fn live_modules(&self) -> usize {
        self.state.borrow().modules.len()
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls().into_iter().filter(|call| call.starts_with(prefix)).collect()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn update_entity(&self, object: ObjectId, update: impl FnOnce(&mut FakeEntity)) {
        if let Some(slot) = self.state.borrow_mut().objects.get_mut(&object) {
            update(&mut slot.entity);
        }
    }

    /// Every entity snapshot the host published, oldest first.
    pub fn published(&self) -> Vec<EntitySnapshot> {
        self.state.borrow().published.clone()
    }

    pub fn entity(&self, object: ObjectId) -> Option<FakeEntity> {
        self.state.borrow().objects.get(&object).map(|slot| slot.entity.clone())
    }
}

fn int_arg(args: &[ScriptValue], index: usize) -> i64 {
    args.get(index).and_then(ScriptValue::as_int).unwrap_or_default()
}

fn vector_arg(args: &[ScriptValue], index: usize) -> Vector {
    args.get(index).and_then(ScriptValue::as_vector).unwrap_or_default()
}

impl ScriptBridge for FakeBridge {
    fn load_module(&self, path: &Path) -> Result<ModuleId, ScriptError> {
        let mut state = self.state.borrow_mut();
        if !state.tools.contains_key(path) {
            return Err(ScriptError::Load { path: path.to_path_buf(), reason: "not registered".to_string() });
        }
        state.next_module += 1;
        let id = ModuleId(state.next_module);
        state.modules.insert(id, path.to_path_buf());
        Ok(id)
    }

    fn unload_module(&self, module: ModuleId) -> bool {
        self.state.borrow_mut().modules.remove(&module).is_some()
    }

    fn is_module_loaded(&self, module: ModuleId) -> bool {
        self.state.borrow().modules.contains_key(&module)
    }

    fn alloc_object(&self, module: ModuleId, class: &str) -> Result<ObjectId, ScriptError> {
        if !self.is_module_loaded(module) {
            return Err(ScriptError::UnknownModule(module));
        }
        Ok(self.create_object(FakeEntity::named(class)))
    }

    fn retain_object(&self, object: ObjectId) -> bool {
        match self.state.borrow_mut().objects.get_mut(&object) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    fn release_object(&self, object: ObjectId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(slot) = state.objects.get_mut(&object) else {
            return false;
        };
        slot.refs -= 1;
        if slot.refs == 0 {
            state.objects.remove(&object);
        }
        true
    }

    fn is_object_alive(&self, object: ObjectId) -> bool {
        self.state.borrow().objects.contains_key(&object)
    }

    fn call_function(
        &self,
        module: ModuleId,
        function: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        let mut state = self.state.borrow_mut();
        let path = state.modules.get(&module).cloned().ok_or(ScriptError::UnknownModule(module))?;
        let tool = state.tools.get(&path).cloned().ok_or(ScriptError::UnknownModule(module))?;
        let name = state.module_name(module);
        let call = match function.name {
            "KeyEvent" => format!("{name}:KeyEvent({},{})", int_arg(args, 0), args[1].as_bool().unwrap_or(false)),
            "MouseEvent" => {
                let at = vector_arg(args, 0);
                format!("{name}:MouseEvent({},{},{})", at.x, at.y, int_arg(args, 1))
            }
            "SelectionStatus" => format!("{name}:SelectionStatus({})", args[0].as_bool().unwrap_or(false)),
            "Trigger" => {
                let at = vector_arg(args, 0);
                format!("{name}:Trigger({},{})", at.x, at.y)
            }
            other => format!("{name}:{other}"),
        };
        state.calls.push(call);

        match function.name {
            "QueryToolInfo" => Ok(tool.info.map(ScriptValue::Record).unwrap_or_default()),
            "Initialize" => Ok(ScriptValue::Bool(tool.initialize)),
            "Trigger" => {
                if let Some(entity) = tool.spawn_on_trigger {
                    let object = state.insert_object(entity);
                    let position = vector_arg(args, 0);
                    state.commands.push(ScriptCommand::SpawnEntity { module, object, position });
                }
                Ok(ScriptValue::Unit)
            }
            _ => Ok(ScriptValue::Unit),
        }
    }

    fn call_method(
        &self,
        _module: ModuleId,
        object: ObjectId,
        method: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        let mut state = self.state.borrow_mut();
        let label = format!("{object}:");
        let Some(slot) = state.objects.get_mut(&object) else {
            return Err(ScriptError::UnknownObject(object));
        };
        if slot.entity.failing {
            return Err(ScriptError::Runtime { function: method.name.to_string(), message: "boom".to_string() });
        }
        let entity = &mut slot.entity;
        let (call, result) = match method.name {
            "OnSpawn" => {
                entity.position = vector_arg(args, 0);
                (Some(format!("OnSpawn({},{})", entity.position.x, entity.position.y)), ScriptValue::Unit)
            }
            "MoveTo" => {
                entity.position = vector_arg(args, 0);
                (Some(format!("MoveTo({},{})", entity.position.x, entity.position.y)), ScriptValue::Unit)
            }
            "OnDamage" => (Some(format!("OnDamage({})", int_arg(args, 0))), ScriptValue::Unit),
            "IsDamageable" => (None, ScriptValue::Int(entity.damage_type)),
            "GetDamageValue" => (None, ScriptValue::Int(entity.damage_value)),
            "GetName" => (None, ScriptValue::Str(entity.name.clone())),
            "GetModel" => (None, entity.model.clone().map(ScriptValue::Model).unwrap_or_default()),
            "GetPosition" => (None, ScriptValue::Vector(entity.position)),
            "GetRotation" => (None, ScriptValue::Float(0.0)),
            "IsMovable" => (None, ScriptValue::Bool(entity.movable)),
            "GetSelectionSize" => (None, ScriptValue::Vector(entity.selection_size)),
            "NeedsRemoval" => (None, ScriptValue::Bool(entity.needs_removal)),
            "DoUserCleaning" => (None, ScriptValue::Bool(entity.user_cleaning)),
            other => (Some(other.to_string()), ScriptValue::Unit),
        };
        if let Some(call) = call {
            state.calls.push(format!("{label}{call}"));
        }
        Ok(result)
    }

    fn take_commands(&self) -> Vec<ScriptCommand> {
        std::mem::take(&mut self.state.borrow_mut().commands)
    }

    fn publish_entities(&self, snapshot: EntitySnapshot) {
        self.state.borrow_mut().published.push(snapshot);
    }
}

/// Renderer double: every load succeeds unless the file name was marked failing.
#[derive(Default)]
pub struct FakeRenderer {
    next_id: RefCell<u32>,
    live: RefCell<HashMap<SpriteId, PathBuf>>,
    failing: RefCell<HashSet<String>>,
    draws: RefCell<Vec<(PathBuf, SpriteDraw)>>,
}

impl FakeRenderer {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn fail_on(&self, file_name: &str) {
        self.failing.borrow_mut().insert(file_name.to_string());
    }

    pub fn live_sprites(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn draws(&self) -> Vec<(PathBuf, SpriteDraw)> {
        self.draws.borrow().clone()
    }

    pub fn clear_draws(&self) {
        self.draws.borrow_mut().clear();
    }
}

impl RenderService for FakeRenderer {
    fn load_sprite(&self, request: &SpriteRequest) -> Option<SpriteId> {
        let file_name = request.path.file_name()?.to_string_lossy().into_owned();
        if self.failing.borrow().contains(&file_name) {
            return None;
        }
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        let id = SpriteId(*next);
        self.live.borrow_mut().insert(id, request.path.clone());
        Some(id)
    }

    fn free_sprite(&self, sprite: SpriteId) -> bool {
        self.live.borrow_mut().remove(&sprite).is_some()
    }

    fn draw_sprite(&self, sprite: SpriteId, draw: &SpriteDraw) {
        if let Some(path) = self.live.borrow().get(&sprite) {
            self.draws.borrow_mut().push((path.clone(), *draw));
        }
    }

    fn draw_box(&self, _position: Vector, _size: Vector, _thickness: i32, _color: Color) {}

    fn draw_filled_box(&self, _position: Vector, _size: Vector, _color: Color) {}

    fn draw_line(&self, _start: Vector, _end: Vector, _color: Color) {}

    fn draw_text(&self, _text: &str, _position: Vector, _color: Color) {}
}

/// Model with one rectangle at the local origin.
pub fn square_model(renderer: &Rc<FakeRenderer>, size: i32) -> SharedModel {
    let renderer: Rc<dyn RenderService> = renderer.clone();
    let sprite = OwnedSprite::load(&renderer, &SpriteRequest::single("model.png", size, size)).expect("model sprite");
    let mut bbox = BoundingBox::new();
    bbox.add_rect(Vector::ZERO, Vector::splat(size));
    Rc::new(Model::from_parts(sprite, bbox))
}

pub fn adopt(bridge: &Rc<FakeBridge>, object: ObjectId) -> ScriptObject {
    let bridge: Rc<dyn ScriptBridge> = bridge.clone();
    ScriptObject::adopt(bridge, ModuleId(0), object)
}

pub fn tool_path(name: &str) -> PathBuf {
    PathBuf::from("tools").join(name).join(format!("{name}.rhai"))
}

pub struct Rig {
    pub bridge: Rc<FakeBridge>,
    pub renderer: Rc<FakeRenderer>,
    pub clock: Rc<ManualClock>,
    pub manager: ToolManager,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let bridge = FakeBridge::new();
        let renderer = FakeRenderer::new();
        let clock = Rc::new(ManualClock::new(0));
        let manager = ToolManager::new(bridge.clone(), renderer.clone(), clock.clone(), config)
            .expect("tool manager with fake cursors");
        Self { bridge, renderer, clock, manager }
    }

    /// Registers and loads a tool at its conventional path.
    pub fn load(&mut self, tool: FakeTool) -> deskgame_engine::tools::ToolHandle {
        let name = tool.info.as_ref().and_then(|info| info["name"].as_str()).unwrap_or("Anonymous").to_string();
        let path = tool_path(&name);
        self.bridge.register_tool(&path, tool);
        self.manager.load_tool(&path).expect("fake tool loads")
    }

    pub fn spawn(&mut self, entity: FakeEntity, at: Vector) -> ObjectId {
        let id = self.bridge.create_object(entity);
        assert!(self.manager.spawn_entity(adopt(&self.bridge, id), at));
        id
    }
}
