//! CLI subcommand handlers.

use crate::Commands;
use crate::ConfigAction;
use crate::PresetAction;
use crate::TrainArgs;
use detlaunch_core::config::{self, ConfigOverrides};
use detlaunch_core::{
    EpochSchedule, LaunchError, LaunchPlan, ModelFamily, PresetBook, RunOutcome, TrainingRunner,
};
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

/// Handle a CLI subcommand.
pub async fn handle_command(command: Commands, workspace: &Path) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Train(args) => handle_train(args, workspace).await,
        Commands::Schedule { model, json } => handle_schedule(&model, json),
        Commands::Preset { action } => handle_preset(action, workspace).await,
        Commands::Config { action } => handle_config(action, workspace),
    }
}

async fn handle_train(args: TrainArgs, workspace: &Path) -> anyhow::Result<ExitCode> {
    let overrides = ConfigOverrides {
        dataset: args.dataset,
        data_root: args.root,
        model: args.model,
        img_size: args.img_size,
        batch_size: args.batch_size,
        resume: args.resume,
        master_port: args.master_port,
        extra_args: (!args.extra.is_empty()).then_some(args.extra),
    };
    let config =
        config::load_config(Some(workspace), (!overrides.is_empty()).then_some(&overrides))?;

    let dispatch = detlaunch_core::dispatch(&config, args.world_size)?;
    info!(
        model = %config.model,
        mode = %dispatch.mode,
        schedule = %dispatch.schedule,
        "Training launch resolved"
    );

    if args.dry_run {
        println!("{}", dispatch.plan);
        return Ok(ExitCode::SUCCESS);
    }

    let runner = TrainingRunner::new(workspace.to_path_buf()).with_timeout(config.timeout());
    let outcome = runner.run(&dispatch.plan).await?;
    Ok(ExitCode::from(exit_status(&outcome)))
}

fn handle_schedule(model: &str, json: bool) -> anyhow::Result<ExitCode> {
    let family = ModelFamily::detect(model);
    let schedule = EpochSchedule::for_model(model);
    if json {
        let value = serde_json::json!({
            "model": model,
            "family": family,
            "schedule": schedule,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let family = family
            .map(|f| f.to_string())
            .unwrap_or_else(|| "default".to_string());
        println!("{model} ({family}): {schedule}");
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_preset(action: PresetAction, workspace: &Path) -> anyhow::Result<ExitCode> {
    let config = config::load_config(Some(workspace), None)?;
    let book = PresetBook::from_config(&config.presets)?;

    match action {
        PresetAction::List => {
            println!("Presets ({}):", book.names().len());
            for preset in book.iter() {
                let marker = if preset.name == book.active_name() {
                    "*"
                } else {
                    " "
                };
                println!("{marker} {:<20} {}", preset.name, preset.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        PresetAction::Show { name } => {
            let preset = book.resolve(name.as_deref())?;
            println!("{}: {}", preset.name, preset.description);
            println!("{}", preset.plan(&config.program));
            Ok(ExitCode::SUCCESS)
        }
        PresetAction::Run { name, dry_run } => {
            let preset = book.resolve(name.as_deref())?;
            let plan: LaunchPlan = preset.plan(&config.program);
            info!(preset = %preset.name, "Running preset");
            if dry_run {
                println!("{plan}");
                return Ok(ExitCode::SUCCESS);
            }
            let runner =
                TrainingRunner::new(workspace.to_path_buf()).with_timeout(config.timeout());
            let outcome = runner.run(&plan).await?;
            Ok(ExitCode::from(exit_status(&outcome)))
        }
    }
}

fn handle_config(action: ConfigAction, workspace: &Path) -> anyhow::Result<ExitCode> {
    match action {
        ConfigAction::Init => {
            match config::write_default_config(workspace) {
                Ok(path) => println!("Created default configuration at: {}", path.display()),
                Err(LaunchError::ConfigExists { path }) => {
                    println!("Configuration file already exists at: {}", path.display())
                }
                Err(e) => return Err(e.into()),
            }
            Ok(ExitCode::SUCCESS)
        }
        ConfigAction::Show => {
            if !config::config_exists(Some(workspace)) {
                info!("No configuration file found, showing defaults");
            }
            let config = config::load_config(Some(workspace), None)?;
            let toml_str = toml::to_string_pretty(&config)?;
            println!("{}", toml_str);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Exit status mirroring the training program's; signals and out-of-range codes map to 1.
fn exit_status(outcome: &RunOutcome) -> u8 {
    match outcome.exit_code {
        Some(code) => u8::try_from(code).unwrap_or(1),
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_exit_status_mapping() {
        let outcome = |code| RunOutcome {
            exit_code: code,
            elapsed: Duration::ZERO,
        };
        assert_eq!(exit_status(&outcome(Some(0))), 0);
        assert_eq!(exit_status(&outcome(Some(2))), 2);
        assert_eq!(exit_status(&outcome(Some(-1))), 1);
        assert_eq!(exit_status(&outcome(Some(300))), 1);
        assert_eq!(exit_status(&outcome(None)), 1);
    }
}
