pub mod cli;
pub mod config;
pub mod entity;
pub mod entity_manager;
pub mod geometry;
pub mod harness;
pub mod render;
pub mod scripts;
pub mod time;
pub mod tools;
pub mod trace;
pub mod types;

pub use config::RuntimeConfig;
pub use entity::ScriptedEntity;
pub use entity_manager::ScriptedEntityManager;
pub use geometry::{BoundingBox, Model, SharedModel};
pub use scripts::{RhaiBridge, ScriptBridge};
pub use tools::{ToolHandle, ToolManager};
pub use trace::{EntitySnapshot, EntityTrace};
pub use types::{Color, DamageType, DamageValue, Vector};
