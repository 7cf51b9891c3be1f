use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::config::RuntimeConfig;
use crate::render::{DrawStats, HeadlessRenderer, RenderService};
use crate::scripts::{RhaiBridge, ScriptBridge};
use crate::time::ManualClock;
use crate::tools::{FailedTool, ToolManager, MOUSE_MOVE};
use crate::types::Vector;

#[derive(Debug, Clone)]
pub struct HarnessOptions {
    pub config: RuntimeConfig,
    /// Tool directory name or entry script file name.
    pub select: Option<String>,
    pub frames: u32,
    pub frame_millis: u64,
    pub trigger: bool,
    pub mouse: Vector,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            config: RuntimeConfig::default(),
            select: None,
            frames: 60,
            frame_millis: 16,
            trigger: false,
            mouse: Vector::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadedTool {
    pub name: String,
    pub version: String,
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarnessReport {
    pub loaded: Vec<LoadedTool>,
    pub failed: Vec<FailedTool>,
    pub selected: Option<String>,
    pub frames: u32,
    pub entities_per_frame: Vec<usize>,
    pub draws: DrawStats,
}

/// Loads every tool under the configured root into a headless runtime and
/// steps it for `options.frames` frames on a manual clock.
pub fn run(options: &HarnessOptions) -> Result<HarnessReport> {
    let headless = Rc::new(HeadlessRenderer::new());
    let renderer: Rc<dyn RenderService> = headless.clone();
    let clock = Rc::new(ManualClock::new(0));
    let bridge: Rc<dyn ScriptBridge> = Rc::new(RhaiBridge::new(Rc::clone(&renderer), clock.clone()));
    let mut manager = ToolManager::new(bridge, renderer, clock.clone(), options.config.clone())
        .context("creating tool manager")?;

    let scan = manager.load_all_tools()?;
    let loaded = scan
        .loaded
        .iter()
        .filter_map(|handle| manager.tool(*handle))
        .map(|tool| LoadedTool {
            name: tool.info().name.clone(),
            version: tool.info().version.clone(),
            script: tool.script_name().to_string(),
        })
        .collect();

    let mut selected = None;
    if let Some(name) = &options.select {
        let script = script_file_name(name, &options.config.script_extension);
        if !manager.select_by_name(&script) {
            bail!("tool '{name}' is not loaded");
        }
        selected = manager.info(manager.selection()).map(|info| info.name.clone());
    }

    manager.on_mouse_event(options.mouse, MOUSE_MOVE, false, false);
    manager.trigger(options.trigger);

    let mut entities_per_frame = Vec::with_capacity(options.frames as usize);
    for _ in 0..options.frames {
        clock.advance(options.frame_millis);
        manager.process();
        manager.draw(true);
        manager.draw_on_top(true);
        entities_per_frame.push(manager.entities().len());
    }
    log::info!("[harness] ran {} frames with {} tools", options.frames, manager.count());

    Ok(HarnessReport {
        loaded,
        failed: scan.failed,
        selected,
        frames: options.frames,
        entities_per_frame,
        draws: headless.stats(),
    })
}

fn script_file_name(name: &str, extension: &str) -> String {
    if name.ends_with(&format!(".{extension}")) {
        name.to_string()
    } else {
        format!("{name}.{extension}")
    }
}
