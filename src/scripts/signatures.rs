//! Names and shapes of every script entry point the runtime calls.
//!
//! Bridges look functions up by `name` and use `returns` to convert the
//! script's result; `decl` is the human-readable form used in diagnostics.

use super::ReturnKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptFn {
    pub name: &'static str,
    pub decl: &'static str,
    pub returns: ReturnKind,
}

const fn entry(name: &'static str, decl: &'static str, returns: ReturnKind) -> ScriptFn {
    ScriptFn { name, decl, returns }
}

/// Module-level functions every tool script provides.
pub mod tool_api {
    use super::{entry, ReturnKind, ScriptFn};

    pub const QUERY_TOOL_INFO: ScriptFn = entry(
        "QueryToolInfo",
        "ToolInfo QueryToolInfo(int host_version, GameKeys keys, string tool_path)",
        ReturnKind::Record,
    );
    pub const INITIALIZE: ScriptFn = entry("Initialize", "bool Initialize()", ReturnKind::Bool);
    pub const PROCESS: ScriptFn = entry("Process", "void Process()", ReturnKind::Unit);
    pub const DRAW: ScriptFn = entry("Draw", "void Draw()", ReturnKind::Unit);
    pub const DRAW_ON_TOP: ScriptFn = entry("DrawOnTop", "void DrawOnTop()", ReturnKind::Unit);
    pub const KEY_EVENT: ScriptFn = entry("KeyEvent", "void KeyEvent(int key, bool down)", ReturnKind::Unit);
    pub const MOUSE_EVENT: ScriptFn =
        entry("MouseEvent", "void MouseEvent(Vector coords, int key, bool down)", ReturnKind::Unit);
    pub const SELECTION_STATUS: ScriptFn =
        entry("SelectionStatus", "void SelectionStatus(bool selected)", ReturnKind::Unit);
    pub const TRIGGER: ScriptFn = entry("Trigger", "void Trigger(Vector pos)", ReturnKind::Unit);
    pub const RELEASE: ScriptFn = entry("Release", "void Release()", ReturnKind::Unit);

    pub const ALL: &[ScriptFn] = &[
        QUERY_TOOL_INFO,
        INITIALIZE,
        PROCESS,
        DRAW,
        DRAW_ON_TOP,
        KEY_EVENT,
        MOUSE_EVENT,
        SELECTION_STATUS,
        TRIGGER,
        RELEASE,
    ];
}

/// Methods every spawned entity class provides.
pub mod entity_api {
    use super::{entry, ReturnKind, ScriptFn};

    pub const ON_SPAWN: ScriptFn = entry("OnSpawn", "void OnSpawn(Vector pos)", ReturnKind::Unit);
    pub const ON_RELEASE: ScriptFn = entry("OnRelease", "void OnRelease()", ReturnKind::Unit);
    pub const ON_PROCESS: ScriptFn = entry("OnProcess", "void OnProcess()", ReturnKind::Unit);
    pub const ON_DRAW: ScriptFn = entry("OnDraw", "void OnDraw()", ReturnKind::Unit);
    pub const ON_DRAW_ON_TOP: ScriptFn = entry("OnDrawOnTop", "void OnDrawOnTop()", ReturnKind::Unit);
    pub const DO_USER_CLEANING: ScriptFn = entry("DoUserCleaning", "bool DoUserCleaning()", ReturnKind::Bool);
    pub const IS_DAMAGEABLE: ScriptFn = entry("IsDamageable", "DamageType IsDamageable()", ReturnKind::Int);
    pub const ON_DAMAGE: ScriptFn = entry("OnDamage", "void OnDamage(DamageValue value)", ReturnKind::Unit);
    pub const GET_MODEL: ScriptFn = entry("GetModel", "Model GetModel()", ReturnKind::Model);
    pub const GET_POSITION: ScriptFn = entry("GetPosition", "Vector GetPosition()", ReturnKind::Vector);
    pub const GET_ROTATION: ScriptFn = entry("GetRotation", "float GetRotation()", ReturnKind::Float);
    pub const IS_MOVABLE: ScriptFn = entry("IsMovable", "bool IsMovable()", ReturnKind::Bool);
    pub const GET_SELECTION_SIZE: ScriptFn =
        entry("GetSelectionSize", "Vector GetSelectionSize()", ReturnKind::Vector);
    pub const GET_DAMAGE_VALUE: ScriptFn =
        entry("GetDamageValue", "DamageValue GetDamageValue()", ReturnKind::Int);
    pub const NEEDS_REMOVAL: ScriptFn = entry("NeedsRemoval", "bool NeedsRemoval()", ReturnKind::Bool);
    pub const GET_NAME: ScriptFn = entry("GetName", "string GetName()", ReturnKind::Str);
    pub const MOVE_TO: ScriptFn = entry("MoveTo", "void MoveTo(Vector pos)", ReturnKind::Unit);

    pub const ALL: &[ScriptFn] = &[
        ON_SPAWN,
        ON_RELEASE,
        ON_PROCESS,
        ON_DRAW,
        ON_DRAW_ON_TOP,
        DO_USER_CLEANING,
        IS_DAMAGEABLE,
        ON_DAMAGE,
        GET_MODEL,
        GET_POSITION,
        GET_ROTATION,
        IS_MOVABLE,
        GET_SELECTION_SIZE,
        GET_DAMAGE_VALUE,
        NEEDS_REMOVAL,
        GET_NAME,
        MOVE_TO,
    ];
}
