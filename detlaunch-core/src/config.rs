//! Configuration system for detlaunch.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/detlaunch/config.toml` and/or `.detlaunch/config.toml`
//! in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LaunchError, Result};
use crate::presets::Preset;
use crate::schedule::{EpochSchedule, ScheduleOverride};

const WORKSPACE_DIR: &str = ".detlaunch";
const CONFIG_FILE: &str = "config.toml";

/// Everything needed to build a training invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchConfig {
    /// Dataset name forwarded as `--dataset`.
    #[serde(deserialize_with = "scalar_string")]
    pub dataset: String,
    /// Dataset root directory forwarded as `--root`.
    #[serde(deserialize_with = "scalar_string")]
    pub data_root: String,
    /// Model identifier; also selects the epoch schedule.
    #[serde(deserialize_with = "scalar_string")]
    pub model: String,
    pub img_size: u32,
    pub batch_size: u32,
    /// Checkpoint to resume from. The training program treats the literal
    /// `None` as "start fresh".
    #[serde(deserialize_with = "scalar_string")]
    pub resume: String,
    /// Interpreter used to run the training script.
    #[serde(deserialize_with = "scalar_string")]
    pub program: String,
    /// Training script path, relative to the workspace.
    #[serde(deserialize_with = "scalar_string")]
    pub script: String,
    /// Rendezvous port for distributed runs.
    pub master_port: u16,
    pub cuda: bool,
    /// Keep an exponential moving average of the weights.
    pub ema: bool,
    /// Mixed-precision training.
    pub fp16: bool,
    pub multi_scale: bool,
    /// Arguments appended verbatim after the generated flags.
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Kill the run after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Epoch overrides; unset fields come from the model-family table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleOverride>,
    #[serde(default)]
    pub presets: PresetsConfig,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            dataset: "coco".into(),
            data_root: "/data/datasets/".into(),
            model: "yolox_s".into(),
            img_size: 640,
            batch_size: 16,
            resume: "None".into(),
            program: "python".into(),
            script: "train.py".into(),
            master_port: 1700,
            cuda: true,
            ema: true,
            fp16: true,
            multi_scale: true,
            extra_args: Vec::new(),
            timeout_secs: None,
            schedule: None,
            presets: PresetsConfig::default(),
        }
    }
}

impl LaunchConfig {
    /// Effective schedule: the family table with any configured fields applied.
    pub fn epoch_schedule(&self) -> EpochSchedule {
        let base = EpochSchedule::for_model(&self.model);
        match &self.schedule {
            Some(overrides) => overrides.apply(base),
            None => base,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// User-defined presets and the active preset selection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresetsConfig {
    /// Name of the active preset (built-in default when unset).
    #[serde(
        default,
        deserialize_with = "optional_scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub active: Option<String>,
    /// Additional presets; an entry replaces a built-in of the same name.
    #[serde(default)]
    pub entries: Vec<Preset>,
}

/// Any scalar a config source can produce, read back as text.
///
/// The environment provider parses values, so `DETLAUNCH_RESUME=123` arrives
/// as an integer and `DETLAUNCH_DATASET=true` as a boolean.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
}

impl From<Scalar> for String {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Uint(n) => n.to_string(),
            Scalar::Float(n) => n.to_string(),
            Scalar::Bool(b) => b.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

/// Partial overrides applied on top of every other layer (typically from CLI flags).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<Vec<String>>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.dataset.is_none()
            && self.data_root.is_none()
            && self.model.is_none()
            && self.img_size.is_none()
            && self.batch_size.is_none()
            && self.resume.is_none()
            && self.master_port.is_none()
            && self.extra_args.is_none()
    }
}

/// Path of the user-level config file, if a home directory is known.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "detlaunch", "detlaunch")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Path of the workspace-level config file.
pub fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(WORKSPACE_DIR).join(CONFIG_FILE)
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DETLAUNCH_`)
/// 3. Workspace-local config (`.detlaunch/config.toml`)
/// 4. User config (`~/.config/detlaunch/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<LaunchConfig> {
    let mut figment = Figment::from(Serialized::defaults(LaunchConfig::default()));

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // DETLAUNCH_MODEL, DETLAUNCH_BATCH_SIZE, DETLAUNCH_PRESETS__ACTIVE, ...
    figment = figment.merge(Env::prefixed("DETLAUNCH_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| LaunchError::Config(Box::new(e)))
}

/// Check whether any detlaunch configuration file exists (user-level or workspace-level).
pub fn config_exists(workspace: Option<&Path>) -> bool {
    if user_config_path().is_some_and(|p| p.exists()) {
        return true;
    }
    workspace.is_some_and(|ws| workspace_config_path(ws).exists())
}

/// Write the default configuration to `<workspace>/.detlaunch/config.toml`.
///
/// Refuses to overwrite an existing file.
pub fn write_default_config(workspace: &Path) -> Result<PathBuf> {
    let config_path = workspace_config_path(workspace);
    if config_path.exists() {
        return Err(LaunchError::ConfigExists { path: config_path });
    }
    if let Some(dir) = config_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let toml_str = toml::to_string_pretty(&LaunchConfig::default())?;
    std::fs::write(&config_path, toml_str)?;
    Ok(config_path)
}
