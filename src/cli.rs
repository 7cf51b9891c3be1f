use crate::config::RuntimeConfig;
use crate::harness::HarnessOptions;
use crate::types::Vector;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

/// Flags accepted by the `tool_harness` binary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarnessArgs {
    config: Option<PathBuf>,
    tools: Option<PathBuf>,
    select: Option<String>,
    frames: Option<u32>,
    trigger: Option<bool>,
    mouse: Option<(i32, i32)>,
}

impl HarnessArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = HarnessArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name <value>.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => parsed.config = Some(PathBuf::from(value)),
                "tools" => parsed.tools = Some(PathBuf::from(value)),
                "select" => parsed.select = Some(value),
                "frames" => {
                    parsed.frames =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?);
                }
                "trigger" => parsed.trigger = Some(parse_bool_flag("trigger", &value)?),
                "mouse" => parsed.mouse = Some(parse_point(&value)?),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --tools, --select, --frames, --trigger, --mouse."
                ),
            }
        }
        Ok(parsed)
    }

    /// Reads the config file (defaults when absent) and applies the flags on top.
    pub fn into_options(self) -> HarnessOptions {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::load_or_default(path),
            None => RuntimeConfig::default(),
        };
        if let Some(tools) = self.tools {
            config.base_path = tools.parent().map(PathBuf::from).unwrap_or_default();
            config.tools_dir = tools.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
        }
        let defaults = HarnessOptions::default();
        HarnessOptions {
            config,
            select: self.select,
            frames: self.frames.unwrap_or(defaults.frames),
            frame_millis: defaults.frame_millis,
            trigger: self.trigger.unwrap_or(false),
            mouse: self.mouse.map(|(x, y)| Vector::new(x, y)).unwrap_or(defaults.mouse),
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}

fn parse_point(value: &str) -> Result<(i32, i32)> {
    let (x, y) = value.split_once(',').ok_or_else(|| anyhow!("Invalid point '{value}'. Use x,y."))?;
    let x = x.trim().parse::<i32>().with_context(|| format!("Invalid x coordinate in '{value}'"))?;
    let y = y.trim().parse::<i32>().with_context(|| format!("Invalid y coordinate in '{value}'"))?;
    Ok((x, y))
}
