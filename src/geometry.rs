use std::cell::Cell;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

use crate::render::{OwnedSprite, RenderService, SpriteDraw, SpriteRequest};
use crate::types::{self, Vector};

/// Models are owned by script objects and handed to native code by reference.
pub type SharedModel = Rc<Model>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBoxItem {
    pub pos: Vector,
    pub size: Vector,
}

impl BBoxItem {
    /// Inclusive containment of `point` once the rectangle is moved by `origin`.
    fn contains(&self, origin: Vector, point: Vector) -> bool {
        let min = types::add_clamped(origin, self.pos);
        let max = types::add_clamped(min, self.size);
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundingBox {
    items: Vec<BBoxItem>,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rect(&mut self, pos: Vector, size: Vector) {
        self.items.push(BBoxItem { pos, size });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn rects(&self) -> &[BBoxItem] {
        &self.items
    }

    pub fn is_inside(&self, owner_abs_pos: Vector, point: Vector) -> bool {
        self.items.iter().any(|item| item.contains(owner_abs_pos, point))
    }

    /// Corner containment: true when the origin corner of any rectangle of
    /// `other` lies inside any rectangle of this box. Deliberately not an AABB
    /// overlap test, so `a.is_collided(pa, pb, b)` may differ from
    /// `b.is_collided(pb, pa, a)`.
    pub fn is_collided(&self, my_abs_pos: Vector, other_abs_pos: Vector, other: &BoundingBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        other.items.iter().any(|theirs| {
            let corner = types::add_clamped(other_abs_pos, theirs.pos);
            self.items.iter().any(|mine| mine.contains(my_abs_pos, corner))
        })
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("reading model description '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("model description line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("model sprite '{}' could not be loaded", .0.display())]
    Sprite(PathBuf),
}

/// Parsed form of a model description file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescription {
    pub sprite: SpriteRequest,
    pub bbox: BoundingBox,
}

impl ModelDescription {
    pub fn parse(source: &str, base_dir: &Path, force_custom_size: bool) -> Result<Self, ModelError> {
        let mut lines = source.lines().enumerate();
        let sprite_path = match lines.next() {
            Some((_, line)) if !line.trim().is_empty() => line.trim(),
            _ => return Err(malformed(1, "missing sprite path")),
        };
        let frame_info = match lines.next() {
            Some((idx, line)) => parse_four(line, idx + 1)?,
            None => return Err(malformed(2, "missing frame layout")),
        };

        let mut bbox = BoundingBox::new();
        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let [x, y, w, h] = parse_four(line, idx + 1)?;
            bbox.add_rect(Vector::new(x, y), Vector::new(w, h));
        }

        let sprite_path = Path::new(sprite_path);
        let path = if sprite_path.is_absolute() { sprite_path.to_path_buf() } else { base_dir.join(sprite_path) };
        let [frame_count, frame_width, frame_height, frames_per_row] = frame_info;
        Ok(Self {
            sprite: SpriteRequest { path, frame_count, frame_width, frame_height, frames_per_row, force_custom_size },
            bbox,
        })
    }
}

fn malformed(line: usize, reason: impl Into<String>) -> ModelError {
    ModelError::Malformed { line, reason: reason.into() }
}

fn parse_four(line: &str, line_no: usize) -> Result<[i32; 4], ModelError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() != 4 {
        return Err(malformed(line_no, format!("expected 4 integers, found {} tokens", tokens.len())));
    }
    let mut values = [0i32; 4];
    for (slot, token) in values.iter_mut().zip(tokens) {
        *slot = token.parse().map_err(|_| malformed(line_no, format!("'{token}' is not an integer")))?;
    }
    Ok(values)
}

pub struct Model {
    sprite: OwnedSprite,
    bbox: BoundingBox,
    center: Cell<Vector>,
}

impl Model {
    pub fn from_parts(sprite: OwnedSprite, bbox: BoundingBox) -> Self {
        Self { sprite, bbox, center: Cell::new(Vector::ZERO) }
    }

    /// Reads a model description; the sprite is only requested once the whole
    /// file parsed cleanly.
    pub fn load(path: &Path, renderer: &Rc<dyn RenderService>, force_custom_size: bool) -> Result<Self, ModelError> {
        let source =
            fs::read_to_string(path).map_err(|source| ModelError::Io { path: path.to_path_buf(), source })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        let description = ModelDescription::parse(&source, base_dir, force_custom_size)?;
        let sprite = OwnedSprite::load(renderer, &description.sprite)
            .ok_or_else(|| ModelError::Sprite(description.sprite.path.clone()))?;
        Ok(Self::from_parts(sprite, description.bbox))
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn sprite(&self) -> &OwnedSprite {
        &self.sprite
    }

    pub fn center(&self) -> Vector {
        self.center.get()
    }

    pub fn set_center(&self, center: Vector) {
        self.center.set(center);
    }

    pub fn is_collided(&self, my_abs_pos: Vector, other_abs_pos: Vector, other: &Model) -> bool {
        self.bbox.is_collided(my_abs_pos, other_abs_pos, &other.bbox)
    }

    pub fn is_inside(&self, my_abs_pos: Vector, point: Vector) -> bool {
        self.bbox.is_inside(my_abs_pos, point)
    }

    pub fn draw(&self, draw: &SpriteDraw) {
        self.sprite.draw(draw);
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("sprite", &self.sprite)
            .field("rects", &self.bbox.len())
            .field("center", &self.center.get())
            .finish()
    }
}
