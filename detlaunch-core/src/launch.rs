//! Launch dispatch: worker count -> launch mode -> command line.
//!
//! A worker count of 1 runs the training script directly. Counts from 2 to
//! [`MAX_WORLD_SIZE`] wrap it in `torch.distributed.run` and enable
//! synchronized batch norm. Anything else is rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::config::LaunchConfig;
use crate::error::{LaunchError, MAX_WORLD_SIZE, Result};
use crate::schedule::EpochSchedule;

/// Python module used as the multi-process launcher.
pub const DISTRIBUTED_LAUNCHER: &str = "torch.distributed.run";

/// How the training program is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum LaunchMode {
    Single,
    Distributed { nproc_per_node: u8 },
}

impl LaunchMode {
    /// Map a requested worker count onto a launch mode.
    pub fn from_world_size(world_size: i64) -> Result<Self> {
        match world_size {
            1 => Ok(LaunchMode::Single),
            2..=MAX_WORLD_SIZE => Ok(LaunchMode::Distributed {
                // bounded by MAX_WORLD_SIZE above
                nproc_per_node: world_size as u8,
            }),
            n if n > MAX_WORLD_SIZE => Err(LaunchError::WorldSizeTooLarge { value: n }),
            n => Err(LaunchError::WorldSizeTooSmall { value: n }),
        }
    }

    pub fn world_size(&self) -> u8 {
        match self {
            LaunchMode::Single => 1,
            LaunchMode::Distributed { nproc_per_node } => *nproc_per_node,
        }
    }

    pub fn is_distributed(&self) -> bool {
        matches!(self, LaunchMode::Distributed { .. })
    }
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Single => f.write_str("single"),
            LaunchMode::Distributed { nproc_per_node } => {
                write!(f, "distributed (nproc_per_node={nproc_per_node})")
            }
        }
    }
}

/// A fully resolved command line for the external training program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchPlan {
    /// Build the invocation for `mode` from the configuration scalars and schedule.
    pub fn build(config: &LaunchConfig, mode: LaunchMode, schedule: EpochSchedule) -> Self {
        let mut args: Vec<String> = Vec::new();

        if let LaunchMode::Distributed { nproc_per_node } = mode {
            args.push("-m".into());
            args.push(DISTRIBUTED_LAUNCHER.into());
            args.push(format!("--nproc_per_node={nproc_per_node}"));
            args.push("--master_port".into());
            args.push(config.master_port.to_string());
        }

        args.push(config.script.clone());
        if config.cuda {
            args.push("--cuda".into());
        }
        if mode.is_distributed() {
            args.push("-dist".into());
        }

        let pairs = [
            ("--dataset", config.dataset.clone()),
            ("--root", config.data_root.clone()),
            ("--model", config.model.clone()),
            ("--batch_size", config.batch_size.to_string()),
            ("--img_size", config.img_size.to_string()),
            ("--wp_epoch", schedule.wp_epoch.to_string()),
            ("--max_epoch", schedule.max_epoch.to_string()),
            ("--eval_epoch", schedule.eval_epoch.to_string()),
            ("--no_aug_epoch", schedule.no_aug_epoch.to_string()),
            ("--resume", config.resume.clone()),
        ];
        for (flag, value) in pairs {
            args.push(flag.into());
            args.push(value);
        }

        for (enabled, flag) in [
            (config.ema, "--ema"),
            (config.fp16, "--fp16"),
            (config.multi_scale, "--multi_scale"),
            (mode.is_distributed(), "--sybn"),
        ] {
            if enabled {
                args.push(flag.into());
            }
        }

        args.extend(config.extra_args.iter().cloned());

        Self {
            program: config.program.clone(),
            args,
        }
    }

    /// Shell-quoted single-line form, for display and dry runs.
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value following `flag` in the argument list, if any.
    pub fn flag_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|a| a == flag)
    }
}

impl fmt::Display for LaunchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Outcome of dispatching a worker count against a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    pub mode: LaunchMode,
    pub schedule: EpochSchedule,
    pub plan: LaunchPlan,
}

/// Select schedule and launch mode, then build the command line.
pub fn dispatch(config: &LaunchConfig, world_size: i64) -> Result<Dispatch> {
    let mode = LaunchMode::from_world_size(world_size)?;
    let schedule = config.epoch_schedule();
    let plan = LaunchPlan::build(config, mode, schedule);
    debug!(
        model = %config.model,
        mode = %mode,
        schedule = %schedule,
        "Dispatched training launch"
    );
    Ok(Dispatch {
        mode,
        schedule,
        plan,
    })
}

fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
