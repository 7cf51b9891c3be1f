//! Tool loading, selection, and per-frame dispatch.
//!
//! The [`ToolManager`] owns every loaded [`Tool`] and the
//! [`ScriptedEntityManager`] their scripts spawn into. Script code never
//! touches the manager directly; requests made from script callbacks are
//! queued by the bridge and applied after each batch of callbacks.

pub mod selection;
pub mod tool;

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::config::{CursorImage, RuntimeConfig};
use crate::entity::ScriptedEntity;
use crate::entity_manager::ScriptedEntityManager;
use crate::render::{OwnedSprite, RenderService, SpriteDraw, SpriteId, SpriteRequest};
use crate::scripts::{ObjectId, ScriptBridge, ScriptCommand, ScriptObject};
use crate::time::Clock;
use crate::trace::{EntitySnapshot, EntityTrace};
use crate::types::Vector;

pub use selection::EntitySelection;
pub use tool::{Tool, ToolHandle, ToolInfo, ToolLoadError, ToolScript};

/// Mouse "key" code reported for plain cursor movement.
pub const MOUSE_MOVE: i32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTool {
    pub name: String,
    pub step: u8,
    pub reason: String,
}

/// Outcome of [`ToolManager::load_all_tools`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolScan {
    pub loaded: Vec<ToolHandle>,
    pub failed: Vec<FailedTool>,
}

pub struct ToolManager {
    tools: Vec<Tool>,
    selected: Option<usize>,
    entities: ScriptedEntityManager,
    selection: EntitySelection,
    mouse: Vector,
    pointer: OwnedSprite,
    goto_cursor: OwnedSprite,
    bridge: Rc<dyn ScriptBridge>,
    renderer: Rc<dyn RenderService>,
    clock: Rc<dyn Clock>,
    config: RuntimeConfig,
}

impl ToolManager {
    pub fn new(
        bridge: Rc<dyn ScriptBridge>,
        renderer: Rc<dyn RenderService>,
        clock: Rc<dyn Clock>,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let pointer = load_cursor(&renderer, &config, &config.cursors.pointer).context("loading hover pointer")?;
        let goto_cursor = load_cursor(&renderer, &config, &config.cursors.goto).context("loading go-to cursor")?;
        Ok(Self {
            tools: Vec::new(),
            selected: None,
            entities: ScriptedEntityManager::new(),
            selection: EntitySelection::new(),
            mouse: Vector::ZERO,
            pointer,
            goto_cursor,
            bridge,
            renderer,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Rc<dyn ScriptBridge> {
        &self.bridge
    }

    pub fn load_tool(&mut self, script_path: &Path) -> Result<ToolHandle, ToolLoadError> {
        self.publish_entities();
        let now = self.clock.now_millis();
        let loaded = Tool::load(&self.bridge, &self.renderer, &self.config, script_path, now);
        // Callbacks made while loading may have queued requests.
        self.apply_script_commands();
        match loaded {
            Ok(tool) => {
                log::info!("[tools] loaded '{}' {} from {}", tool.info().name, tool.info().version, script_path.display());
                self.tools.push(tool);
                Ok(ToolHandle(self.tools.len() - 1))
            }
            Err(err) => {
                log::warn!("[tools] {} failed at step {}: {err}", script_path.display(), err.step());
                Err(err)
            }
        }
    }

    /// Loads `<tools root>/<name>/<name>.<ext>`.
    pub fn load_tool_from_name(&mut self, name: &str) -> Result<ToolHandle, ToolLoadError> {
        let path = self.config.tool_script_path(name);
        self.load_tool(&path)
    }

    pub fn load_tool_from_path(&mut self, path: impl AsRef<Path>) -> Result<ToolHandle, ToolLoadError> {
        self.load_tool(path.as_ref())
    }

    /// Loads every tool directory under the tools root that carries an entry
    /// script named after the directory. A tool that fails to load is
    /// recorded in the scan and skipped.
    pub fn load_all_tools(&mut self) -> Result<ToolScan> {
        let root = self.config.tools_root();
        let entries =
            fs::read_dir(&root).with_context(|| format!("Failed to read tools directory {}", root.display()))?;
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|kind| kind.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| self.config.tool_script_path(name).is_file())
            .collect();
        names.sort();

        let mut scan = ToolScan::default();
        for name in names {
            match self.load_tool_from_name(&name) {
                Ok(handle) => scan.loaded.push(handle),
                Err(err) => scan.failed.push(FailedTool { name, step: err.step(), reason: err.to_string() }),
            }
        }
        log::info!("[tools] loaded {} tools from {} ({} failed)", scan.loaded.len(), root.display(), scan.failed.len());
        Ok(scan)
    }

    /// Releases one tool. Handles above it shift down by one.
    pub fn unload_tool(&mut self, handle: ToolHandle) -> bool {
        if handle.index() >= self.tools.len() {
            return false;
        }
        self.publish_entities();
        match self.selected {
            Some(index) if index == handle.index() => {
                self.tools[index].script().on_select(false);
                self.selected = None;
                self.selection.clear();
            }
            Some(index) if index > handle.index() => self.selected = Some(index - 1),
            _ => {}
        }
        let tool = self.tools.remove(handle.index());
        tool.script().on_release();
        log::info!("[tools] unloaded '{}'", tool.info().name);
        drop(tool);
        self.apply_script_commands();
        true
    }

    pub fn process(&mut self) {
        self.publish_entities();
        for tool in &self.tools {
            tool.script().on_process();
        }
        self.entities.process();
        self.apply_script_commands();

        let Some(index) = self.selected else {
            return;
        };
        let now = self.clock.now_millis();
        let tool = &mut self.tools[index];
        if tool.trigger_timer.active() && tool.trigger_timer.elapsed(now) {
            if !self.selection.consume_suppressed_trigger() {
                self.bridge.publish_entities(EntitySnapshot::capture(&self.entities));
                tool.script().on_trigger(self.mouse);
            }
            tool.trigger_timer.reset(now);
            self.apply_script_commands();
        }
    }

    /// Runs the regular draw pass. The cursor is only drawn by
    /// [`ToolManager::draw_on_top`]; `_draw_cursor` mirrors its signature.
    pub fn draw(&mut self, _draw_cursor: bool) {
        self.publish_entities();
        for tool in &self.tools {
            tool.script().on_draw();
        }
        self.entities.draw();
        self.apply_script_commands();
    }

    pub fn draw_on_top(&mut self, draw_cursor: bool) {
        self.publish_entities();
        for tool in &self.tools {
            tool.script().on_draw_on_top();
        }
        self.entities.draw_on_top();
        self.apply_script_commands();

        if !draw_cursor {
            return;
        }
        let Some(tool) = self.selected.and_then(|index| self.tools.get(index)) else {
            return;
        };
        if self.selection.draw_pointer() {
            let mut draw = SpriteDraw::at(self.mouse);
            draw.scale = glam::Vec2::splat(0.5);
            self.pointer.draw(&draw);
        } else if !self.selection.is_empty() {
            let mut draw = SpriteDraw::at(self.mouse);
            draw.scale = glam::Vec2::splat(1.5);
            self.goto_cursor.draw(&draw);
        } else {
            tool.draw_cursor(self.mouse);
        }
    }

    pub fn set_cursor_offset(&mut self, offset: Vector) {
        if let Some(tool) = self.selected_tool_mut() {
            tool.cursor_offset = offset;
        }
    }

    pub fn set_cursor_rotation(&mut self, rotation: f32) {
        if let Some(tool) = self.selected_tool_mut() {
            tool.cursor_rotation = rotation;
        }
    }

    pub fn on_key_event(&mut self, key: i32, down: bool) {
        if self.selected.is_none() {
            return;
        }
        self.publish_entities();
        let Some(tool) = self.selected_tool() else {
            return;
        };
        tool.script().on_key_event(key, down);
        self.apply_script_commands();
    }

    /// Dispatches a mouse event, running the entity pick/drag mode first.
    /// `key` is [`MOUSE_MOVE`] for movement, otherwise the button code.
    pub fn on_mouse_event(&mut self, position: Vector, key: i32, down: bool, modifier_held: bool) {
        if key == MOUSE_MOVE {
            self.mouse = position;
            self.selection.set_draw_pointer(false);
            if modifier_held && selection::pick_movable(&self.entities, self.mouse).is_some() {
                self.selection.set_draw_pointer(true);
                return;
            }
        }

        self.selection.prune(&self.entities);

        if key == self.config.game_keys.trigger && down {
            if modifier_held {
                if let Some(object) = selection::pick_movable(&self.entities, self.mouse) {
                    self.selection.add(object);
                    self.selection.suppress_next_trigger();
                    return;
                }
            } else {
                let targets = self.selection.take();
                for object in &targets {
                    if let Some(entity) = self.entities.find(*object) {
                        entity.move_to(self.mouse);
                    }
                }
                if !targets.is_empty() {
                    self.selection.suppress_next_trigger();
                }
            }
        }

        if self.selected.is_some() {
            self.publish_entities();
        }
        if let Some(tool) = self.selected_tool() {
            tool.script().on_mouse_event(position, key, down);
        }
        self.apply_script_commands();
    }

    /// Makes `handle` the selected tool. Out-of-range handles leave the
    /// current selection untouched.
    pub fn select(&mut self, handle: ToolHandle) -> bool {
        if handle.index() >= self.tools.len() {
            return false;
        }
        self.publish_entities();
        if let Some(previous) = self.selected_tool() {
            previous.script().on_select(false);
        }
        self.tools[handle.index()].script().on_select(true);
        self.selected = Some(handle.index());
        self.apply_script_commands();
        true
    }

    /// Selects by entry script file name, e.g. `Rock.rhai`.
    pub fn select_by_name(&mut self, script_name: &str) -> bool {
        match self.tools.iter().position(|tool| tool.script_name() == script_name) {
            Some(index) => self.select(ToolHandle(index)),
            None => false,
        }
    }

    pub fn unselect(&mut self) {
        self.selected = None;
    }

    pub fn selection(&self) -> ToolHandle {
        self.selected.map(ToolHandle).unwrap_or(ToolHandle::INVALID)
    }

    /// Sets the held state of the selected tool's trigger.
    pub fn trigger(&mut self, held: bool) -> bool {
        match self.selected_tool_mut() {
            Some(tool) => {
                tool.trigger_timer.set_active(held);
                true
            }
            None => false,
        }
    }

    /// Removes entities that allow user cleanup; returns how many went.
    pub fn user_clean(&mut self) -> usize {
        self.publish_entities();
        let removed = self.entities.on_user_clean();
        self.apply_script_commands();
        log::debug!("[tools] user clean removed {removed} entities");
        removed
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    pub fn tool(&self, handle: ToolHandle) -> Option<&Tool> {
        self.tools.get(handle.index())
    }

    pub fn tools(&self) -> impl ExactSizeIterator<Item = &Tool> {
        self.tools.iter()
    }

    pub fn info(&self, handle: ToolHandle) -> Option<&ToolInfo> {
        self.tool(handle).map(Tool::info)
    }

    pub fn preview_image(&self, handle: ToolHandle) -> Option<SpriteId> {
        self.tool(handle).map(|tool| tool.preview().id())
    }

    /// Finds a loaded tool by the full script path it was loaded from.
    pub fn find_tool(&self, script_path: impl AsRef<Path>) -> ToolHandle {
        let script_path = script_path.as_ref();
        self.tools
            .iter()
            .position(|tool| tool.script_path() == script_path)
            .map(ToolHandle)
            .unwrap_or(ToolHandle::INVALID)
    }

    pub fn tool_version(&self, script_path: impl AsRef<Path>) -> Option<&str> {
        self.tool(self.find_tool(script_path)).map(|tool| tool.info().version.as_str())
    }

    pub fn selected_entities(&self) -> &[ObjectId] {
        self.selection.as_slice()
    }

    pub fn is_selection_entity_valid(&self, index: usize) -> bool {
        self.selection.get(index).is_some_and(|object| self.entities.is_valid_entity(object))
    }

    pub fn entity_selection(&self) -> &EntitySelection {
        &self.selection
    }

    pub fn entities(&self) -> &ScriptedEntityManager {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut ScriptedEntityManager {
        &mut self.entities
    }

    pub fn spawn_entity(&mut self, object: ScriptObject, at: Vector) -> bool {
        let spawned = self.entities.spawn(object, at);
        self.apply_script_commands();
        spawned
    }

    pub fn entity(&self, object: ObjectId) -> Option<&ScriptedEntity> {
        self.entities.find(object)
    }

    pub fn entity_trace(&self, start: Vector, end: Vector, ignore: Option<ObjectId>) -> EntityTrace {
        self.entities.trace(start, end, ignore)
    }

    pub fn mouse_position(&self) -> Vector {
        self.mouse
    }

    /// Applies requests queued by script code until none remain.
    pub fn apply_script_commands(&mut self) {
        loop {
            let commands = self.bridge.take_commands();
            if commands.is_empty() {
                return;
            }
            for command in commands {
                match command {
                    ScriptCommand::SpawnEntity { module, object, position } => {
                        let object = ScriptObject::adopt(Rc::clone(&self.bridge), module, object);
                        if !self.entities.spawn(object, position) {
                            log::warn!("[tools] spawn request from {module} dropped");
                        }
                    }
                    ScriptCommand::SetCursorOffset(offset) => self.set_cursor_offset(offset),
                    ScriptCommand::SetCursorRotation(rotation) => self.set_cursor_rotation(rotation),
                }
            }
        }
    }

    /// Hands script code the current entity state ahead of a callback batch.
    fn publish_entities(&self) {
        self.bridge.publish_entities(EntitySnapshot::capture(&self.entities));
    }

    fn selected_tool(&self) -> Option<&Tool> {
        self.selected.and_then(|index| self.tools.get(index))
    }

    fn selected_tool_mut(&mut self) -> Option<&mut Tool> {
        self.selected.and_then(|index| self.tools.get_mut(index))
    }

    /// Releases queued spawn references without spawning anything.
    fn discard_script_commands(&mut self) {
        for command in self.bridge.take_commands() {
            if let ScriptCommand::SpawnEntity { module, object, .. } = command {
                drop(ScriptObject::adopt(Rc::clone(&self.bridge), module, object));
            }
        }
    }
}

impl Drop for ToolManager {
    fn drop(&mut self) {
        self.entities.clear();
        self.publish_entities();
        self.selected = None;
        for tool in self.tools.drain(..) {
            tool.script().on_release();
        }
        self.discard_script_commands();
    }
}

fn load_cursor(renderer: &Rc<dyn RenderService>, config: &RuntimeConfig, image: &CursorImage) -> Result<OwnedSprite> {
    let path: PathBuf = config.resolve(&image.path);
    let mut request = SpriteRequest::single(&path, image.width, image.height);
    request.force_custom_size = false;
    OwnedSprite::load(renderer, &request).ok_or_else(|| anyhow!("cursor sprite {} could not be loaded", path.display()))
}
