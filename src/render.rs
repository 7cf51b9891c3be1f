use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::Vec2;
use serde::Serialize;

use crate::types::{Color, Vector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SpriteId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteRequest {
    pub path: PathBuf,
    pub frame_count: i32,
    pub frame_width: i32,
    pub frame_height: i32,
    pub frames_per_row: i32,
    pub force_custom_size: bool,
}

impl SpriteRequest {
    /// Single-frame image drawn at a fixed size.
    pub fn single(path: impl Into<PathBuf>, width: i32, height: i32) -> Self {
        Self {
            path: path.into(),
            frame_count: 1,
            frame_width: width,
            frame_height: height,
            frames_per_row: 1,
            force_custom_size: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub position: Vector,
    pub frame: i32,
    pub rotation: f32,
    pub scale: Vec2,
}

impl SpriteDraw {
    pub fn at(position: Vector) -> Self {
        Self { position, frame: 0, rotation: 0.0, scale: Vec2::ONE }
    }
}

/// Narrow view of the rendering backend. Methods take `&self`; backends keep
/// their own interior state so the service can be shared through `Rc`.
pub trait RenderService {
    fn load_sprite(&self, request: &SpriteRequest) -> Option<SpriteId>;
    fn free_sprite(&self, sprite: SpriteId) -> bool;
    fn draw_sprite(&self, sprite: SpriteId, draw: &SpriteDraw);
    fn draw_box(&self, position: Vector, size: Vector, thickness: i32, color: Color);
    fn draw_filled_box(&self, position: Vector, size: Vector, color: Color);
    fn draw_line(&self, start: Vector, end: Vector, color: Color);
    fn draw_text(&self, text: &str, position: Vector, color: Color);
}

/// Sprite handle that frees its sprite exactly once when dropped.
pub struct OwnedSprite {
    id: SpriteId,
    renderer: Rc<dyn RenderService>,
}

impl OwnedSprite {
    pub fn load(renderer: &Rc<dyn RenderService>, request: &SpriteRequest) -> Option<Self> {
        let id = renderer.load_sprite(request)?;
        Some(Self { id, renderer: Rc::clone(renderer) })
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub fn draw(&self, draw: &SpriteDraw) {
        self.renderer.draw_sprite(self.id, draw);
    }
}

impl fmt::Debug for OwnedSprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OwnedSprite").field(&self.id.0).finish()
    }
}

impl Drop for OwnedSprite {
    fn drop(&mut self) {
        if !self.renderer.free_sprite(self.id) {
            log::warn!("[render] sprite {} was already released", self.id.0);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrawStats {
    pub sprites: u64,
    pub boxes: u64,
    pub lines: u64,
    pub texts: u64,
}

/// GPU-less renderer: sprites load when their file exists, draws are counted.
#[derive(Default)]
pub struct HeadlessRenderer {
    next_id: Cell<u32>,
    live: RefCell<HashMap<SpriteId, PathBuf>>,
    stats: Cell<DrawStats>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_sprites(&self) -> usize {
        self.live.borrow().len()
    }

    pub fn sprite_path(&self, sprite: SpriteId) -> Option<PathBuf> {
        self.live.borrow().get(&sprite).cloned()
    }

    pub fn stats(&self) -> DrawStats {
        self.stats.get()
    }

    fn bump(&self, update: impl FnOnce(&mut DrawStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

impl RenderService for HeadlessRenderer {
    fn load_sprite(&self, request: &SpriteRequest) -> Option<SpriteId> {
        if !Path::new(&request.path).is_file() {
            log::warn!("[render] sprite '{}' not found", request.path.display());
            return None;
        }
        let id = SpriteId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.live.borrow_mut().insert(id, request.path.clone());
        Some(id)
    }

    fn free_sprite(&self, sprite: SpriteId) -> bool {
        self.live.borrow_mut().remove(&sprite).is_some()
    }

    fn draw_sprite(&self, sprite: SpriteId, _draw: &SpriteDraw) {
        if self.live.borrow().contains_key(&sprite) {
            self.bump(|stats| stats.sprites += 1);
        }
    }

    fn draw_box(&self, _position: Vector, _size: Vector, _thickness: i32, _color: Color) {
        self.bump(|stats| stats.boxes += 1);
    }

    fn draw_filled_box(&self, _position: Vector, _size: Vector, _color: Color) {
        self.bump(|stats| stats.boxes += 1);
    }

    fn draw_line(&self, _start: Vector, _end: Vector, _color: Color) {
        self.bump(|stats| stats.lines += 1);
    }

    fn draw_text(&self, _text: &str, _position: Vector, _color: Color) {
        self.bump(|stats| stats.texts += 1);
    }
}
