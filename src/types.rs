use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Screen-space integer coordinate shared by tools, entities and models.
pub type Vector = IVec2;

/// Byte-sized damage amount an entity deals to whatever it collides with.
pub type DamageValue = u8;

/// Integer distance between two points, truncated like the script API expects.
pub fn distance(a: Vector, b: Vector) -> i32 {
    (b.as_vec2() - a.as_vec2()).length() as i32
}

/// `a + b` per axis, clamped to the `i32` range.
///
/// Positions and rectangles come from script code, so translation math
/// saturates instead of overflowing.
pub fn add_clamped(a: Vector, b: Vector) -> Vector {
    Vector::new(a.x.saturating_add(b.x), a.y.saturating_add(b.y))
}

/// `a - b` per axis, clamped to the `i32` range.
pub fn sub_clamped(a: Vector, b: Vector) -> Vector {
    Vector::new(a.x.saturating_sub(b.x), a.y.saturating_sub(b.y))
}

/// `a * factor` per axis, clamped to the `i32` range.
pub fn scale_clamped(a: Vector, factor: i32) -> Vector {
    Vector::new(a.x.saturating_mul(factor), a.y.saturating_mul(factor))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How an entity takes part in the pairwise damage pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    #[default]
    None,
    All,
    /// Never exchanges damage with entities reporting the same name.
    ExcludeSameName,
}

impl DamageType {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(DamageType::None),
            1 => Some(DamageType::All),
            2 => Some(DamageType::ExcludeSameName),
            _ => None,
        }
    }

    /// Reading of a script's `IsDamageable` answer: zero opts out, any
    /// other value unknown to [`DamageType::from_raw`] damages everything.
    pub fn from_script(raw: i64) -> Self {
        Self::from_raw(raw).unwrap_or(DamageType::All)
    }

    pub fn raw(self) -> i64 {
        match self {
            DamageType::None => 0,
            DamageType::All => 1,
            DamageType::ExcludeSameName => 2,
        }
    }

    pub fn is_damageable(self) -> bool {
        self != DamageType::None
    }
}
