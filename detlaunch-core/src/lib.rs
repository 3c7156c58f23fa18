//! # detlaunch core
//!
//! Building blocks for launching an external detector training program:
//! model-family epoch schedules, worker-count dispatch into single or
//! `torch.distributed` command lines, named presets, layered configuration
//! and a subprocess runner.

pub mod config;
pub mod error;
pub mod launch;
pub mod presets;
pub mod runner;
pub mod schedule;

// Re-export commonly used types at the crate root.
pub use config::{ConfigOverrides, LaunchConfig, load_config};
pub use error::{LaunchError, MAX_WORLD_SIZE, Result};
pub use launch::{Dispatch, LaunchMode, LaunchPlan, dispatch};
pub use presets::{Preset, PresetBook};
pub use runner::{RunOutcome, TrainingRunner};
pub use schedule::{EpochSchedule, ModelFamily, ScheduleOverride};
