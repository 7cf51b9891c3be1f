use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::render::{OwnedSprite, RenderService, SpriteDraw, SpriteRequest};
use crate::scripts::{tool_api, ModuleId, ScriptBridge, ScriptError, ScriptFn, ScriptModule, ScriptValue};
use crate::time::Timer;
use crate::types::{self, Vector};

/// Dense index into the manager's tool list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolHandle(pub usize);

impl ToolHandle {
    /// Never refers to a loaded tool.
    pub const INVALID: ToolHandle = ToolHandle(usize::MAX);

    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

impl fmt::Display for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid() {
            write!(f, "tool#invalid")
        } else {
            write!(f, "tool#{}", self.0)
        }
    }
}

/// Metadata a tool reports from `QueryToolInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
    pub author: String,
    pub contact: String,
    pub category: String,
    pub preview_image: String,
    pub cursor: String,
    pub cursor_width: i32,
    pub cursor_height: i32,
    /// Milliseconds between repeated triggers while held.
    pub trigger_delay: u64,
}

#[derive(Debug, Error)]
pub enum ToolLoadError {
    #[error("'{}' does not name a tool script", .0.display())]
    InvalidPath(PathBuf),
    #[error("loading script module: {0}")]
    Module(#[source] ScriptError),
    #[error("QueryToolInfo failed: {0}")]
    QueryInfo(String),
    #[error("tool wrapper could not be bound to {0}")]
    Wrapper(ModuleId),
    #[error("preview image '{}' could not be loaded", .0.display())]
    PreviewImage(PathBuf),
    #[error("cursor image '{}' could not be loaded", .0.display())]
    CursorImage(PathBuf),
    #[error("tool '{0}' did not initialize")]
    Initialize(String),
}

impl ToolLoadError {
    /// Load step that failed, counting from path resolution.
    pub fn step(&self) -> u8 {
        match self {
            ToolLoadError::InvalidPath(_) => 1,
            ToolLoadError::Module(_) => 2,
            ToolLoadError::QueryInfo(_) => 3,
            ToolLoadError::Wrapper(_) => 4,
            ToolLoadError::PreviewImage(_) => 5,
            ToolLoadError::CursorImage(_) => 6,
            ToolLoadError::Initialize(_) => 7,
        }
    }
}

/// Native wrapper that forwards tool callbacks into its script module.
pub struct ToolScript {
    module: ModuleId,
    bridge: Rc<dyn ScriptBridge>,
}

impl ToolScript {
    pub fn bind(module: &ScriptModule) -> Option<Self> {
        let bridge = Rc::clone(module.bridge());
        if !bridge.is_module_loaded(module.id()) {
            return None;
        }
        Some(Self { module: module.id(), bridge })
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    fn invoke(&self, function: &ScriptFn, args: &[ScriptValue]) -> Option<ScriptValue> {
        match self.bridge.call_function(self.module, function, args) {
            Ok(value) => Some(value),
            Err(err) if err.is_missing_function() => None,
            Err(err) => {
                log::warn!("[tools] {} {}: {err}", self.module, function.decl);
                None
            }
        }
    }

    pub fn on_initialize(&self) -> bool {
        self.invoke(&tool_api::INITIALIZE, &[]).and_then(|value| value.as_bool()).unwrap_or(false)
    }

    pub fn on_process(&self) {
        self.invoke(&tool_api::PROCESS, &[]);
    }

    pub fn on_draw(&self) {
        self.invoke(&tool_api::DRAW, &[]);
    }

    pub fn on_draw_on_top(&self) {
        self.invoke(&tool_api::DRAW_ON_TOP, &[]);
    }

    pub fn on_key_event(&self, key: i32, down: bool) {
        self.invoke(&tool_api::KEY_EVENT, &[ScriptValue::Int(i64::from(key)), down.into()]);
    }

    pub fn on_mouse_event(&self, coords: Vector, key: i32, down: bool) {
        self.invoke(&tool_api::MOUSE_EVENT, &[coords.into(), ScriptValue::Int(i64::from(key)), down.into()]);
    }

    pub fn on_select(&self, selected: bool) {
        self.invoke(&tool_api::SELECTION_STATUS, &[selected.into()]);
    }

    pub fn on_trigger(&self, at: Vector) {
        self.invoke(&tool_api::TRIGGER, &[at.into()]);
    }

    pub fn on_release(&self) {
        self.invoke(&tool_api::RELEASE, &[]);
    }
}

/// One loaded tool. Fields drop in declaration order, so the module goes last.
pub struct Tool {
    info: ToolInfo,
    script: ToolScript,
    preview: OwnedSprite,
    cursor: OwnedSprite,
    module: ScriptModule,
    pub(crate) trigger_timer: Timer,
    pub(crate) cursor_offset: Vector,
    pub(crate) cursor_rotation: f32,
    script_path: PathBuf,
    tool_dir: PathBuf,
    script_name: String,
}

impl Tool {
    /// Acquires every resource of a tool in order. Any failure drops what was
    /// acquired so far, so a partial tool never escapes.
    pub fn load(
        bridge: &Rc<dyn ScriptBridge>,
        renderer: &Rc<dyn RenderService>,
        config: &RuntimeConfig,
        script_path: &Path,
        now: u64,
    ) -> Result<Self, ToolLoadError> {
        let script_name = script_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ToolLoadError::InvalidPath(script_path.to_path_buf()))?;
        let tool_dir = script_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));

        let module = ScriptModule::load(bridge, script_path).map_err(ToolLoadError::Module)?;

        let info = query_tool_info(&module, config, &tool_dir)?;

        let script = ToolScript::bind(&module).ok_or(ToolLoadError::Wrapper(module.id()))?;

        let preview_path = tool_dir.join(&info.preview_image);
        let preview_request = SpriteRequest::single(&preview_path, config.preview.width, config.preview.height);
        let preview =
            OwnedSprite::load(renderer, &preview_request).ok_or(ToolLoadError::PreviewImage(preview_path))?;

        let cursor_path = tool_dir.join(&info.cursor);
        let cursor_request = SpriteRequest::single(&cursor_path, info.cursor_width, info.cursor_height);
        let cursor = OwnedSprite::load(renderer, &cursor_request).ok_or(ToolLoadError::CursorImage(cursor_path))?;

        if !script.on_initialize() {
            return Err(ToolLoadError::Initialize(info.name.clone()));
        }

        let mut trigger_timer = Timer::new(info.trigger_delay, now);
        trigger_timer.set_active(false);

        Ok(Self {
            info,
            script,
            preview,
            cursor,
            module,
            trigger_timer,
            cursor_offset: Vector::ZERO,
            cursor_rotation: 0.0,
            script_path: script_path.to_path_buf(),
            tool_dir,
            script_name,
        })
    }

    pub fn info(&self) -> &ToolInfo {
        &self.info
    }

    pub fn script(&self) -> &ToolScript {
        &self.script
    }

    pub fn module(&self) -> ModuleId {
        self.module.id()
    }

    pub fn preview(&self) -> &OwnedSprite {
        &self.preview
    }

    pub fn cursor(&self) -> &OwnedSprite {
        &self.cursor
    }

    pub fn trigger_timer(&self) -> &Timer {
        &self.trigger_timer
    }

    pub fn cursor_offset(&self) -> Vector {
        self.cursor_offset
    }

    pub fn cursor_rotation(&self) -> f32 {
        self.cursor_rotation
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    /// File name of the entry script, e.g. `Rock.rhai`.
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub(crate) fn draw_cursor(&self, mouse: Vector) {
        let mut draw = SpriteDraw::at(types::add_clamped(mouse, self.cursor_offset));
        draw.rotation = self.cursor_rotation;
        self.cursor.draw(&draw);
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.info.name)
            .field("module", &self.module)
            .field("script", &self.script_path)
            .finish()
    }
}

fn query_tool_info(module: &ScriptModule, config: &RuntimeConfig, tool_dir: &Path) -> Result<ToolInfo, ToolLoadError> {
    let keys = serde_json::to_value(&config.game_keys).map_err(|err| ToolLoadError::QueryInfo(err.to_string()))?;
    let args = [
        ScriptValue::Int(i64::from(config.host_version)),
        ScriptValue::Record(keys),
        ScriptValue::Str(tool_dir.to_string_lossy().into_owned()),
    ];
    let value = module.call(&tool_api::QUERY_TOOL_INFO, &args).map_err(|err| ToolLoadError::QueryInfo(err.to_string()))?;
    let record = value.into_record().ok_or_else(|| ToolLoadError::QueryInfo("tool declined".to_string()))?;
    serde_json::from_value(record).map_err(|err| ToolLoadError::QueryInfo(format!("malformed tool info: {err}")))
}
