use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Version word passed to every tool's `QueryToolInfo`.
pub const HOST_VERSION: u16 = 0x0100;

/// Key codes the host binds to game actions; forwarded to tools on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameKeys {
    pub trigger: i32,
    pub clean: i32,
    pub menu: i32,
    pub scroll_up: i32,
    pub scroll_down: i32,
    pub team_select: i32,
    pub console: i32,
    pub take_screen: i32,
    pub key1: i32,
    pub key2: i32,
    pub key3: i32,
    pub key4: i32,
    pub key5: i32,
    pub key6: i32,
    pub key7: i32,
    pub key8: i32,
    pub key9: i32,
    pub key0: i32,
    pub exit: i32,
}

impl Default for GameKeys {
    fn default() -> Self {
        // Windows virtual-key codes.
        Self {
            trigger: 0x01,
            clean: 0x43,
            menu: 0x1B,
            scroll_up: 0x26,
            scroll_down: 0x28,
            team_select: 0x54,
            console: 0xDC,
            take_screen: 0x7B,
            key1: 0x31,
            key2: 0x32,
            key3: 0x33,
            key4: 0x34,
            key5: 0x35,
            key6: 0x36,
            key7: 0x37,
            key8: 0x38,
            key9: 0x39,
            key0: 0x30,
            exit: 0x7A,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "PreviewConfig::default_width")]
    pub width: i32,
    #[serde(default = "PreviewConfig::default_height")]
    pub height: i32,
}

impl PreviewConfig {
    const fn default_width() -> i32 {
        195
    }

    const fn default_height() -> i32 {
        90
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self { width: Self::default_width(), height: Self::default_height() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorImage {
    pub path: String,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorConfig {
    #[serde(default = "CursorConfig::default_pointer")]
    pub pointer: CursorImage,
    #[serde(default = "CursorConfig::default_goto")]
    pub goto: CursorImage,
}

impl CursorConfig {
    fn default_pointer() -> CursorImage {
        CursorImage { path: "res/pointer.png".to_string(), width: 72, height: 72 }
    }

    fn default_goto() -> CursorImage {
        CursorImage { path: "res/gotocursor.png".to_string(), width: 32, height: 32 }
    }
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self { pointer: Self::default_pointer(), goto: Self::default_goto() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "RuntimeConfig::default_base_path")]
    pub base_path: PathBuf,
    #[serde(default = "RuntimeConfig::default_tools_dir")]
    pub tools_dir: String,
    #[serde(default = "RuntimeConfig::default_script_extension")]
    pub script_extension: String,
    #[serde(default = "RuntimeConfig::default_host_version")]
    pub host_version: u16,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub cursors: CursorConfig,
    #[serde(default)]
    pub game_keys: GameKeys,
}

impl RuntimeConfig {
    fn default_base_path() -> PathBuf {
        PathBuf::from(".")
    }

    fn default_tools_dir() -> String {
        "tools".to_string()
    }

    fn default_script_extension() -> String {
        "rhai".to_string()
    }

    const fn default_host_version() -> u16 {
        HOST_VERSION
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("[config] load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn tools_root(&self) -> PathBuf {
        self.base_path.join(&self.tools_dir)
    }

    /// `<tools root>/<name>/<name>.<ext>`
    pub fn tool_script_path(&self, name: &str) -> PathBuf {
        self.tools_root().join(name).join(format!("{name}.{}", self.script_extension))
    }

    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_path.join(relative)
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            base_path: Self::default_base_path(),
            tools_dir: Self::default_tools_dir(),
            script_extension: Self::default_script_extension(),
            host_version: Self::default_host_version(),
            preview: PreviewConfig::default(),
            cursors: CursorConfig::default(),
            game_keys: GameKeys::default(),
        }
    }
}
