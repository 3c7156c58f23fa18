//! Error types for the detlaunch core library.
//!
//! Uses `thiserror` for public API error types. Every launcher error maps to
//! exit status 1 at the CLI boundary; the external training program's own
//! exit status is reported separately through [`crate::runner::RunOutcome`].

use std::path::PathBuf;
use std::time::Duration;

/// Largest worker count served by a single-machine launch.
pub const MAX_WORLD_SIZE: i64 = 8;

/// Top-level error type for the detlaunch core library.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error(
        "The WORLD_SIZE is set to {value}, greater than {max}, which implies multi-machine \
         multi-card training; this mode is currently unsupported",
        max = MAX_WORLD_SIZE
    )]
    WorldSizeTooLarge { value: i64 },

    /// Zero or negative counts. Reported apart from `WorldSizeTooLarge`, whose
    /// multi-machine wording only fits counts above the limit.
    #[error("The WORLD_SIZE must be at least 1 (got {value})")]
    WorldSizeTooSmall { value: i64 },

    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Preset not found: {name}")]
    PresetNotFound { name: String },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Training run timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Configuration file already exists: {path}")]
    ConfigExists { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),
}

impl LaunchError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Whether the error comes from an out-of-range worker count.
    pub fn is_world_size(&self) -> bool {
        matches!(
            self,
            Self::WorldSizeTooLarge { .. } | Self::WorldSizeTooSmall { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LaunchError>;
