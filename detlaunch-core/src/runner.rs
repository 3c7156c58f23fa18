//! Training runner: subprocess orchestration for the external training program.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{LaunchError, Result};
use crate::launch::LaunchPlan;

/// Result of a finished training process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs a [`LaunchPlan`] in the workspace with inherited stdio.
pub struct TrainingRunner {
    workspace: PathBuf,
    /// Maximum duration before a training run is forcibly stopped.
    pub timeout: Option<Duration>,
}

impl TrainingRunner {
    pub fn new(workspace: PathBuf) -> Self {
        Self {
            workspace,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Spawn the plan and wait for it to exit.
    pub async fn run(&self, plan: &LaunchPlan) -> Result<RunOutcome> {
        debug!(
            command = %plan.render(),
            cwd = %self.workspace.display(),
            "Spawning training program"
        );

        let started = Instant::now();
        let mut child = Command::new(&plan.program)
            .args(&plan.args)
            .current_dir(&self.workspace)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: plan.program.clone(),
                source,
            })?;

        let status = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!(?timeout, "Training run timed out, killing");
                    child.kill().await?;
                    return Err(LaunchError::Timeout { after: timeout });
                }
            },
            None => child.wait().await?,
        };

        let outcome = RunOutcome {
            exit_code: status.code(),
            elapsed: started.elapsed(),
        };
        if outcome.success() {
            info!(elapsed_secs = outcome.elapsed.as_secs(), "Training program finished");
        } else {
            warn!(exit_code = ?outcome.exit_code, "Training program exited with non-zero status");
        }
        Ok(outcome)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn plan(program: &str, args: &[&str]) -> LaunchPlan {
        LaunchPlan {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_run_success() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TrainingRunner::new(dir.path().to_path_buf());
        let outcome = runner.run(&plan("true", &[])).await.unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_run_propagates_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TrainingRunner::new(dir.path().to_path_buf());
        let outcome = runner.run(&plan("sh", &["-c", "exit 3"])).await.unwrap();
        assert_eq!(outcome.exit_code, Some(3));
        assert!(!outcome.success());
    }

    #[tokio::test]
    async fn test_run_in_workspace_dir() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TrainingRunner::new(dir.path().to_path_buf());
        let outcome = runner
            .run(&plan("sh", &["-c", "touch launched.marker"]))
            .await
            .unwrap();
        assert!(outcome.success());
        assert!(dir.path().join("launched.marker").exists());
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TrainingRunner::new(dir.path().to_path_buf());
        let err = runner
            .run(&plan("detlaunch-no-such-interpreter", &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let runner = TrainingRunner::new(dir.path().to_path_buf())
            .with_timeout(Some(Duration::from_millis(100)));
        let err = runner.run(&plan("sleep", &["5"])).await.unwrap_err();
        assert!(matches!(
            err,
            LaunchError::Timeout { after } if after == Duration::from_millis(100)
        ));
        assert_eq!(err.to_string(), "Training run timed out after 100ms");
    }
}
