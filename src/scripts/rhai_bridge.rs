//! [`ScriptBridge`] backed by the Rhai engine.
//!
//! A module is one compiled `.rhai` file. Tool entry points are plain
//! functions called with `this` bound to a per-module state map. An entity
//! class is a constructor function returning an object map; its methods are
//! module functions called with `this` bound to that map. A map property
//! holding a function pointer (`this.OnProcess = Fn("rock_process")`)
//! redirects the method, so several classes can share one module.
//!
//! Script code never calls back into native managers. `spawn_entity` and the
//! cursor setters queue [`ScriptCommand`]s that the host drains with
//! [`ScriptBridge::take_commands`]. Entity queries (`entity_count`,
//! `entity_handle`, `entity_trace`, ...) answer from the last
//! [`EntitySnapshot`] the host published, so they see the entities as they
//! were when the current callback batch began.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rand::Rng;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, FnPtr, Map, Module, Scope, AST, FLOAT, INT};

use super::{ModuleId, ObjectId, ReturnKind, ScriptBridge, ScriptCommand, ScriptError, ScriptFn, ScriptValue};
use crate::geometry::{BoundingBox, Model, SharedModel};
use crate::render::{OwnedSprite, RenderService, SpriteDraw, SpriteRequest};
use crate::time::{Clock, Timer};
use crate::trace::EntitySnapshot;
use crate::types::{self, Color, DamageType, Vector};

type HostResult<T> = Result<T, Box<EvalAltResult>>;

struct LoadedModule {
    ast: AST,
    dir: PathBuf,
    functions: HashSet<(String, usize)>,
    state: RefCell<Dynamic>,
}

impl LoadedModule {
    fn defines(&self, name: &str, arity: usize) -> bool {
        self.functions.contains(&(name.to_string(), arity))
    }
}

struct ObjectSlot {
    refs: u32,
    value: Dynamic,
}

struct Frame {
    module: ModuleId,
    /// Object bound to `this` when the frame is a method call.
    object: Option<ObjectId>,
    dir: PathBuf,
}

enum Pending {
    Spawn { module: ModuleId, object: Dynamic, position: Vector },
    Command(ScriptCommand),
}

/// State reachable from registered host functions while a script runs.
#[derive(Default)]
struct HostState {
    frames: Vec<Frame>,
    pending: Vec<Pending>,
    entities: EntitySnapshot,
}

impl HostState {
    fn current_module(&self) -> Option<ModuleId> {
        self.frames.last().map(|frame| frame.module)
    }

    fn current_object(&self) -> Option<ObjectId> {
        self.frames.last().and_then(|frame| frame.object)
    }

    fn handle(&self, index: usize) -> Dynamic {
        self.entities.get(index).map_or(Dynamic::UNIT, |view| Dynamic::from(EntityHandle(view.object)))
    }

    fn current_dir(&self) -> PathBuf {
        self.frames.last().map(|frame| frame.dir.clone()).unwrap_or_else(|| PathBuf::from("."))
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir().join(path)
        }
    }
}

/// Sprite handle shared with script code. A model built from it takes the
/// sprite over, leaving this handle empty.
#[derive(Clone)]
pub struct ScriptSprite(Rc<RefCell<Option<OwnedSprite>>>);

impl ScriptSprite {
    fn draw(&self, draw: &SpriteDraw) {
        if let Some(sprite) = self.0.borrow().as_ref() {
            sprite.draw(draw);
        }
    }
}

/// Script-side reference to a live entity. It does not keep the entity
/// alive; `entity_is_valid` tells whether it still exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityHandle(pub ObjectId);

/// Repeat timer for script code, read against the host clock.
#[derive(Clone)]
pub struct ScriptTimer {
    timer: Timer,
    clock: Rc<dyn Clock>,
}

impl ScriptTimer {
    fn new(clock: &Rc<dyn Clock>, delay: u64, active: bool) -> Self {
        let mut timer = Timer::new(delay, clock.now_millis());
        timer.set_active(active);
        Self { timer, clock: Rc::clone(clock) }
    }

    fn elapsed(&self) -> bool {
        self.timer.elapsed(self.clock.now_millis())
    }

    fn reset(&mut self) {
        self.timer.reset(self.clock.now_millis());
    }
}

pub struct RhaiBridge {
    engine: Engine,
    host: Rc<RefCell<HostState>>,
    modules: RefCell<HashMap<ModuleId, Rc<LoadedModule>>>,
    objects: RefCell<HashMap<ObjectId, ObjectSlot>>,
    next_module: Cell<u32>,
    next_object: Cell<u32>,
}

impl RhaiBridge {
    pub fn new(renderer: Rc<dyn RenderService>, clock: Rc<dyn Clock>) -> Self {
        let host = Rc::new(RefCell::new(HostState::default()));
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        engine.on_print(|text| log::info!("[script] {text}"));
        engine.on_debug(|text, source, pos| log::debug!("[script] {}{pos:?}: {text}", source.unwrap_or("")));
        register_value_types(&mut engine);
        register_render_api(&mut engine, &host, &renderer);
        register_host_api(&mut engine, &host);
        register_entity_api(&mut engine, &host);
        register_timer_api(&mut engine, &clock);
        register_constants(&mut engine);
        Self {
            engine,
            host,
            modules: RefCell::new(HashMap::new()),
            objects: RefCell::new(HashMap::new()),
            next_module: Cell::new(0),
            next_object: Cell::new(0),
        }
    }

    pub fn loaded_modules(&self) -> usize {
        self.modules.borrow().len()
    }

    pub fn live_objects(&self) -> usize {
        self.objects.borrow().len()
    }

    fn module(&self, module: ModuleId) -> Result<Rc<LoadedModule>, ScriptError> {
        self.modules.borrow().get(&module).cloned().ok_or(ScriptError::UnknownModule(module))
    }

    fn invoke(
        &self,
        id: ModuleId,
        module: &LoadedModule,
        object: Option<ObjectId>,
        name: &str,
        this: &mut Dynamic,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptError> {
        if !module.defines(name, args.len()) {
            return Err(ScriptError::MissingFunction(name.to_string()));
        }
        self.host.borrow_mut().frames.push(Frame { module: id, object, dir: module.dir.clone() });
        let mut scope = Scope::new();
        let options = CallFnOptions::new().eval_ast(false).rewind_scope(true).bind_this_ptr(this);
        let result = self.engine.call_fn_with_options::<Dynamic>(options, &mut scope, &module.ast, name, args);
        self.host.borrow_mut().frames.pop();
        result.map_err(|err| ScriptError::Runtime { function: name.to_string(), message: err.to_string() })
    }

    fn insert_object(&self, value: Dynamic) -> ObjectId {
        let id = ObjectId(self.next_object.get() + 1);
        self.next_object.set(id.0);
        self.objects.borrow_mut().insert(id, ObjectSlot { refs: 1, value });
        id
    }
}

impl ScriptBridge for RhaiBridge {
    fn load_module(&self, path: &Path) -> Result<ModuleId, ScriptError> {
        let load_error = |reason: String| ScriptError::Load { path: path.to_path_buf(), reason };
        let source = fs::read_to_string(path).map_err(|err| load_error(err.to_string()))?;
        let ast = self.engine.compile(source).map_err(|err| load_error(err.to_string()))?;
        let functions =
            ast.iter_functions().map(|function| (function.name.to_string(), function.params.len())).collect();
        let id = ModuleId(self.next_module.get() + 1);
        self.next_module.set(id.0);
        let module = LoadedModule {
            ast,
            dir: path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
            functions,
            state: RefCell::new(Dynamic::from_map(Map::new())),
        };
        self.modules.borrow_mut().insert(id, Rc::new(module));
        log::debug!("[script] compiled {} as {id}", path.display());
        Ok(id)
    }

    fn unload_module(&self, module: ModuleId) -> bool {
        self.modules.borrow_mut().remove(&module).is_some()
    }

    fn is_module_loaded(&self, module: ModuleId) -> bool {
        self.modules.borrow().contains_key(&module)
    }

    fn alloc_object(&self, module: ModuleId, class: &str) -> Result<ObjectId, ScriptError> {
        let loaded = self.module(module)?;
        if !loaded.defines(class, 0) {
            return Err(ScriptError::UnknownClass { module, class: class.to_string() });
        }
        let mut this = Dynamic::UNIT;
        let value = self.invoke(module, &loaded, None, class, &mut this, Vec::new())?;
        if !value.is_map() {
            return Err(ScriptError::Runtime {
                function: class.to_string(),
                message: "constructor did not return an object map".to_string(),
            });
        }
        Ok(self.insert_object(value))
    }

    fn retain_object(&self, object: ObjectId) -> bool {
        match self.objects.borrow_mut().get_mut(&object) {
            Some(slot) => {
                slot.refs += 1;
                true
            }
            None => false,
        }
    }

    fn release_object(&self, object: ObjectId) -> bool {
        let mut objects = self.objects.borrow_mut();
        let Some(slot) = objects.get_mut(&object) else {
            return false;
        };
        slot.refs -= 1;
        if slot.refs == 0 {
            objects.remove(&object);
        }
        true
    }

    fn is_object_alive(&self, object: ObjectId) -> bool {
        self.objects.borrow().contains_key(&object)
    }

    fn call_function(
        &self,
        module: ModuleId,
        function: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        let loaded = self.module(module)?;
        let mut state = mem::take(&mut *loaded.state.borrow_mut());
        let result = self.invoke(module, &loaded, None, function.name, &mut state, to_dynamic_args(args));
        *loaded.state.borrow_mut() = state;
        convert_result(function, result?)
    }

    fn call_method(
        &self,
        module: ModuleId,
        object: ObjectId,
        method: &ScriptFn,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        let loaded = self.module(module)?;
        let mut value = match self.objects.borrow_mut().get_mut(&object) {
            Some(slot) => mem::take(&mut slot.value),
            None => return Err(ScriptError::UnknownObject(object)),
        };
        let name = resolve_method(&value, method.name);
        let result = self.invoke(module, &loaded, Some(object), &name, &mut value, to_dynamic_args(args));
        if let Some(slot) = self.objects.borrow_mut().get_mut(&object) {
            slot.value = value;
        }
        convert_result(method, result?)
    }

    fn take_commands(&self) -> Vec<ScriptCommand> {
        let pending = mem::take(&mut self.host.borrow_mut().pending);
        pending
            .into_iter()
            .map(|request| match request {
                Pending::Spawn { module, object, position } => {
                    ScriptCommand::SpawnEntity { module, object: self.insert_object(object), position }
                }
                Pending::Command(command) => command,
            })
            .collect()
    }

    fn publish_entities(&self, snapshot: EntitySnapshot) {
        self.host.borrow_mut().entities = snapshot;
    }
}

fn resolve_method(object: &Dynamic, name: &str) -> String {
    object
        .read_lock::<Map>()
        .and_then(|map| map.get(name).and_then(|property| property.clone().try_cast::<FnPtr>()))
        .map(|pointer| pointer.fn_name().to_string())
        .unwrap_or_else(|| name.to_string())
}

fn to_dynamic_args(args: &[ScriptValue]) -> Vec<Dynamic> {
    args.iter().map(to_dynamic).collect()
}

fn to_dynamic(value: &ScriptValue) -> Dynamic {
    match value {
        ScriptValue::Unit => Dynamic::UNIT,
        ScriptValue::Bool(value) => Dynamic::from(*value),
        ScriptValue::Int(value) => Dynamic::from(*value as INT),
        ScriptValue::Float(value) => Dynamic::from(*value as FLOAT),
        ScriptValue::Str(value) => Dynamic::from(value.clone()),
        ScriptValue::Vector(value) => Dynamic::from(*value),
        ScriptValue::Model(model) => Dynamic::from(Rc::clone(model)),
        ScriptValue::Record(record) => rhai::serde::to_dynamic(record).unwrap_or_else(|err| {
            log::warn!("[script] record argument dropped: {err}");
            Dynamic::UNIT
        }),
    }
}

fn convert_result(function: &ScriptFn, value: Dynamic) -> Result<ScriptValue, ScriptError> {
    let mismatch = || ScriptError::TypeMismatch { function: function.name.to_string(), expected: function.returns };
    let converted = match function.returns {
        ReturnKind::Unit => ScriptValue::Unit,
        ReturnKind::Bool => ScriptValue::Bool(value.as_bool().map_err(|_| mismatch())?),
        ReturnKind::Int => ScriptValue::Int(value.as_int().map_err(|_| mismatch())?),
        ReturnKind::Float => match value.as_float() {
            Ok(float) => ScriptValue::Float(float),
            Err(_) => ScriptValue::Float(value.as_int().map_err(|_| mismatch())? as f64),
        },
        ReturnKind::Str => ScriptValue::Str(value.into_string().map_err(|_| mismatch())?),
        ReturnKind::Vector => ScriptValue::Vector(value.try_cast::<Vector>().ok_or_else(mismatch)?),
        ReturnKind::Model if value.is_unit() => ScriptValue::Unit,
        ReturnKind::Model => ScriptValue::Model(value.try_cast::<SharedModel>().ok_or_else(mismatch)?),
        ReturnKind::Record if value.is_unit() || value.as_bool() == Ok(false) => ScriptValue::Unit,
        ReturnKind::Record if value.is_map() => {
            let record = rhai::serde::from_dynamic::<serde_json::Value>(&value).map_err(|err| {
                ScriptError::Runtime { function: function.name.to_string(), message: err.to_string() }
            })?;
            ScriptValue::Record(record)
        }
        ReturnKind::Record => return Err(mismatch()),
    };
    Ok(converted)
}

fn to_i32(value: INT) -> i32 {
    value.clamp(INT::from(i32::MIN), INT::from(i32::MAX)) as i32
}

fn to_u8(value: INT) -> u8 {
    value.clamp(0, 255) as u8
}

fn register_value_types(engine: &mut Engine) {
    engine
        .register_type_with_name::<Vector>("Vector")
        .register_fn("Vector", |x: INT, y: INT| Vector::new(to_i32(x), to_i32(y)))
        .register_fn("Vector", || Vector::ZERO)
        .register_get_set("x", |v: &mut Vector| INT::from(v.x), |v: &mut Vector, x: INT| v.x = to_i32(x))
        .register_get_set("y", |v: &mut Vector| INT::from(v.y), |v: &mut Vector, y: INT| v.y = to_i32(y))
        .register_fn("+", |a: Vector, b: Vector| types::add_clamped(a, b))
        .register_fn("-", |a: Vector, b: Vector| types::sub_clamped(a, b))
        .register_fn("*", |a: Vector, factor: INT| types::scale_clamped(a, to_i32(factor)))
        .register_fn("==", |a: Vector, b: Vector| a == b)
        .register_fn("!=", |a: Vector, b: Vector| a != b)
        .register_fn("distance", |a: &mut Vector, b: Vector| INT::from(types::distance(*a, b)))
        .register_fn("to_string", |v: &mut Vector| format!("({}, {})", v.x, v.y))
        .register_fn("to_debug", |v: &mut Vector| format!("Vector({}, {})", v.x, v.y));

    engine
        .register_type_with_name::<Color>("Color")
        .register_fn("Color", |r: INT, g: INT, b: INT, a: INT| Color::new(to_u8(r), to_u8(g), to_u8(b), to_u8(a)))
        .register_fn("Color", |r: INT, g: INT, b: INT| Color::new(to_u8(r), to_u8(g), to_u8(b), 255))
        .register_get("r", |c: &mut Color| INT::from(c.r))
        .register_get("g", |c: &mut Color| INT::from(c.g))
        .register_get("b", |c: &mut Color| INT::from(c.b))
        .register_get("a", |c: &mut Color| INT::from(c.a));

    engine
        .register_type_with_name::<BoundingBox>("BoundingBox")
        .register_fn("BoundingBox", BoundingBox::new)
        .register_fn("add", |bbox: &mut BoundingBox, pos: Vector, size: Vector| bbox.add_rect(pos, size))
        .register_fn("add", |bbox: &mut BoundingBox, x: INT, y: INT, w: INT, h: INT| {
            bbox.add_rect(Vector::new(to_i32(x), to_i32(y)), Vector::new(to_i32(w), to_i32(h)))
        })
        .register_fn("len", |bbox: &mut BoundingBox| bbox.len() as INT)
        .register_fn("is_empty", |bbox: &mut BoundingBox| bbox.is_empty())
        .register_fn("is_inside", |bbox: &mut BoundingBox, owner: Vector, point: Vector| bbox.is_inside(owner, point));

    engine
        .register_type_with_name::<SharedModel>("Model")
        .register_fn("set_center", |model: &mut SharedModel, center: Vector| model.set_center(center))
        .register_get("center", |model: &mut SharedModel| model.center())
        .register_fn("is_inside", |model: &mut SharedModel, pos: Vector, point: Vector| model.is_inside(pos, point))
        .register_fn("is_collided", |model: &mut SharedModel, pos: Vector, other_pos: Vector, other: SharedModel| {
            model.is_collided(pos, other_pos, &other)
        })
        .register_fn("Model", |sprite: ScriptSprite, bbox: BoundingBox| -> HostResult<SharedModel> {
            let owned = sprite.0.borrow_mut().take().ok_or("sprite was already given to a model")?;
            Ok(Rc::new(Model::from_parts(owned, bbox)))
        });

    engine.register_type_with_name::<ScriptSprite>("Sprite");
}

fn register_render_api(engine: &mut Engine, host: &Rc<RefCell<HostState>>, renderer: &Rc<dyn RenderService>) {
    let (state, gfx) = (Rc::clone(host), Rc::clone(renderer));
    engine.register_fn("load_model", move |path: &str| -> HostResult<SharedModel> {
        let path = state.borrow().resolve(path);
        Model::load(&path, &gfx, false).map(Rc::new).map_err(|err| err.to_string().into())
    });

    let (state, gfx) = (Rc::clone(host), Rc::clone(renderer));
    engine.register_fn(
        "load_sprite",
        move |path: &str, frames: INT, width: INT, height: INT, per_row: INT, force: bool| -> HostResult<ScriptSprite> {
            let request = SpriteRequest {
                path: state.borrow().resolve(path),
                frame_count: to_i32(frames),
                frame_width: to_i32(width),
                frame_height: to_i32(height),
                frames_per_row: to_i32(per_row),
                force_custom_size: force,
            };
            let sprite = OwnedSprite::load(&gfx, &request)
                .ok_or_else(|| format!("sprite '{}' could not be loaded", request.path.display()))?;
            Ok(ScriptSprite(Rc::new(RefCell::new(Some(sprite)))))
        },
    );

    engine.register_fn("draw_sprite", |sprite: ScriptSprite, pos: Vector| sprite.draw(&SpriteDraw::at(pos)));
    engine.register_fn(
        "draw_sprite",
        |sprite: ScriptSprite, pos: Vector, frame: INT, rotation: FLOAT, sx: FLOAT, sy: FLOAT| {
            let draw = SpriteDraw {
                position: pos,
                frame: to_i32(frame),
                rotation: rotation as f32,
                scale: glam::Vec2::new(sx as f32, sy as f32),
            };
            sprite.draw(&draw);
        },
    );
    engine.register_fn("draw_model", |model: SharedModel, pos: Vector| model.draw(&SpriteDraw::at(pos)));
    engine.register_fn("draw_model", |model: SharedModel, pos: Vector, rotation: FLOAT| {
        let mut draw = SpriteDraw::at(pos);
        draw.rotation = rotation as f32;
        model.draw(&draw);
    });

    let gfx = Rc::clone(renderer);
    engine.register_fn("draw_box", move |pos: Vector, size: Vector, thickness: INT, color: Color| {
        gfx.draw_box(pos, size, to_i32(thickness), color)
    });
    let gfx = Rc::clone(renderer);
    engine.register_fn("draw_filled_box", move |pos: Vector, size: Vector, color: Color| {
        gfx.draw_filled_box(pos, size, color)
    });
    let gfx = Rc::clone(renderer);
    engine.register_fn("draw_line", move |start: Vector, end: Vector, color: Color| gfx.draw_line(start, end, color));
    let gfx = Rc::clone(renderer);
    engine.register_fn("draw_text", move |text: &str, pos: Vector, color: Color| gfx.draw_text(text, pos, color));
}

fn register_host_api(engine: &mut Engine, host: &Rc<RefCell<HostState>>) {
    let state = Rc::clone(host);
    engine.register_fn("spawn_entity", move |object: Dynamic, position: Vector| -> HostResult<bool> {
        if !object.is_map() {
            return Err("spawn_entity expects an object map".into());
        }
        let mut state = state.borrow_mut();
        let module = state.current_module().ok_or("spawn_entity called outside a script callback")?;
        state.pending.push(Pending::Spawn { module, object, position });
        Ok(true)
    });

    let state = Rc::clone(host);
    engine.register_fn("set_cursor_offset", move |offset: Vector| {
        state.borrow_mut().pending.push(Pending::Command(ScriptCommand::SetCursorOffset(offset)));
    });
    let state = Rc::clone(host);
    engine.register_fn("set_cursor_rotation", move |rotation: FLOAT| {
        state.borrow_mut().pending.push(Pending::Command(ScriptCommand::SetCursorRotation(rotation as f32)));
    });

    let state = Rc::clone(host);
    engine.register_fn("tool_path", move || state.borrow().current_dir().to_string_lossy().into_owned());

    engine.register_fn("random", |start: INT, end: INT| {
        let (low, high) = if start <= end { (start, end) } else { (end, start) };
        rand::thread_rng().gen_range(low..=high)
    });
}

fn register_entity_api(engine: &mut Engine, host: &Rc<RefCell<HostState>>) {
    engine
        .register_type_with_name::<EntityHandle>("Entity")
        .register_fn("==", |a: EntityHandle, b: EntityHandle| a == b)
        .register_fn("!=", |a: EntityHandle, b: EntityHandle| a != b)
        .register_fn("to_string", |entity: &mut EntityHandle| entity.0.to_string())
        .register_fn("to_debug", |entity: &mut EntityHandle| format!("Entity({})", entity.0 .0));

    let state = Rc::clone(host);
    engine.register_get("position", move |entity: &mut EntityHandle| -> Dynamic {
        state.borrow().entities.find(entity.0).map_or(Dynamic::UNIT, |view| Dynamic::from(view.position))
    });

    let state = Rc::clone(host);
    engine.register_fn("entity_count", move || state.borrow().entities.len() as INT);

    let state = Rc::clone(host);
    engine.register_fn("entity_handle", move |index: INT| -> Dynamic {
        usize::try_from(index).map_or(Dynamic::UNIT, |index| state.borrow().handle(index))
    });

    let state = Rc::clone(host);
    engine.register_fn("entity_is_valid", move |entity: EntityHandle| state.borrow().entities.find(entity.0).is_some());
    engine.register_fn("entity_is_valid", |_: ()| false);

    let state = Rc::clone(host);
    engine.register_fn("entity_id", move |entity: EntityHandle| {
        state.borrow().entities.index_of(entity.0).map_or(-1, |index| index as INT)
    });
    engine.register_fn("entity_id", |_: ()| -1 as INT);

    let state = Rc::clone(host);
    engine.register_fn("entity_trace", move |start: Vector, end: Vector| -> Dynamic {
        first_hit(&state.borrow().entities, start, end, None)
    });
    let state = Rc::clone(host);
    engine.register_fn("entity_trace", move |start: Vector, end: Vector, ignore: EntityHandle| -> Dynamic {
        first_hit(&state.borrow().entities, start, end, Some(ignore.0))
    });
    let state = Rc::clone(host);
    engine.register_fn("entity_trace", move |start: Vector, end: Vector, _: ()| -> Dynamic {
        first_hit(&state.borrow().entities, start, end, None)
    });

    let state = Rc::clone(host);
    engine.register_fn("this_entity", move || -> Dynamic {
        state.borrow().current_object().map_or(Dynamic::UNIT, |object| Dynamic::from(EntityHandle(object)))
    });
}

fn first_hit(entities: &EntitySnapshot, start: Vector, end: Vector, ignore: Option<ObjectId>) -> Dynamic {
    entities.trace(start, end, ignore).get(0).map_or(Dynamic::UNIT, |object| Dynamic::from(EntityHandle(object)))
}

fn register_timer_api(engine: &mut Engine, clock: &Rc<dyn Clock>) {
    engine
        .register_type_with_name::<ScriptTimer>("Timer")
        .register_get_set(
            "active",
            |timer: &mut ScriptTimer| timer.timer.active(),
            |timer: &mut ScriptTimer, active: bool| timer.timer.set_active(active),
        )
        .register_get_set(
            "delay",
            |timer: &mut ScriptTimer| timer.timer.delay().min(INT::MAX as u64) as INT,
            |timer: &mut ScriptTimer, delay: INT| timer.timer.set_delay(delay.max(0) as u64),
        )
        .register_fn("reset", ScriptTimer::reset)
        .register_fn("elapsed", |timer: &mut ScriptTimer| timer.elapsed());

    let time = Rc::clone(clock);
    engine.register_fn("Timer", move || ScriptTimer::new(&time, 0, false));
    let time = Rc::clone(clock);
    engine.register_fn("Timer", move |delay: INT| ScriptTimer::new(&time, delay.max(0) as u64, true));
}

/// `Damage::NONE`, `Damage::ALL` and `Damage::EXCLUDE_SAME_NAME` for `IsDamageable`.
fn register_constants(engine: &mut Engine) {
    let mut damage = Module::new();
    damage
        .set_var("NONE", DamageType::None.raw() as INT)
        .set_var("ALL", DamageType::All.raw() as INT)
        .set_var("EXCLUDE_SAME_NAME", DamageType::ExcludeSameName.raw() as INT);
    engine.register_static_module("Damage", damage.into());
}
