//! CLI subcommand handlers.

use crate::{Cli, Commands, ConfigAction};
use glofbench_core::data::synthetic::{SyntheticSpec, write_csv};
use glofbench_core::report::render_diagnostics;
use glofbench_core::{BenchConfig, load_config};
use serde_json::{Map, Value, json};
use std::path::{Path, PathBuf};

const DEFAULT_SYNTHETIC_PATH: &str = "synthetic_glof_data.csv";

/// Handle a CLI subcommand; no subcommand means `run`.
pub async fn handle_command(cli: &Cli, workspace: &Path) -> anyhow::Result<()> {
    match &cli.command {
        None | Some(Commands::Run) => handle_run(cli, workspace).await,
        Some(Commands::Generate {
            rows,
            positive_fraction,
            seed,
        }) => handle_generate(cli, *rows, *positive_fraction, *seed),
        Some(Commands::Config { action }) => handle_config(cli, action, workspace),
    }
}

/// CLI flags as a config overlay; only flags the user actually set appear.
fn cli_overrides(cli: &Cli) -> Value {
    let mut root = Map::new();
    if let Some(input) = &cli.input {
        root.insert("data".into(), json!({ "input_path": input }));
    }
    if let Some(output) = &cli.output {
        root.insert("report".into(), json!({ "output_path": output }));
    }
    let mut evaluation = Map::new();
    if cli.parallel {
        evaluation.insert("parallel".into(), Value::Bool(true));
    }
    if cli.fail_fast {
        evaluation.insert("failure_policy".into(), json!("abort"));
    }
    if !evaluation.is_empty() {
        root.insert("evaluation".into(), Value::Object(evaluation));
    }
    Value::Object(root)
}

fn resolve_config(cli: &Cli, workspace: &Path) -> anyhow::Result<BenchConfig> {
    let overrides = cli_overrides(cli);
    let config = load_config(Some(workspace), cli.config.as_deref(), Some(&overrides))
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    tracing::debug!(?config, "Resolved configuration");
    Ok(config)
}

async fn handle_run(cli: &Cli, workspace: &Path) -> anyhow::Result<()> {
    let config = resolve_config(cli, workspace)?;
    let output = glofbench_core::run(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Benchmark failed: {}", e))?;

    if !cli.quiet {
        println!();
        println!("{}", output.summary);
        println!();
        println!("{}", render_diagnostics(&output.outcomes));
    }
    Ok(())
}

fn handle_generate(cli: &Cli, rows: usize, positive_fraction: f64, seed: u64) -> anyhow::Result<()> {
    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYNTHETIC_PATH));
    let spec = SyntheticSpec {
        rows,
        positive_fraction,
        seed,
    };
    let table = write_csv(&spec, &path)
        .map_err(|e| anyhow::anyhow!("Failed to write synthetic data: {}", e))?;
    println!(
        "Wrote {} synthetic lakes to {}",
        table.row_count(),
        path.display()
    );
    Ok(())
}

fn handle_config(cli: &Cli, action: &ConfigAction, workspace: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".glofbench");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = BenchConfig::default().to_toml()?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let config = resolve_config(cli, workspace)?;
            println!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_no_flags_no_overrides() {
        let cli = Cli::parse_from(["glofbench"]);
        assert_eq!(cli_overrides(&cli), json!({}));
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::parse_from([
            "glofbench",
            "run",
            "--input",
            "lakes.csv",
            "--parallel",
            "--fail-fast",
        ]);
        assert_eq!(
            cli_overrides(&cli),
            json!({
                "data": { "input_path": "lakes.csv" },
                "evaluation": { "parallel": true, "failure_policy": "abort" }
            })
        );
    }

    #[test]
    fn test_generate_parses() {
        let cli = Cli::parse_from(["glofbench", "generate", "--rows", "50", "-o", "x.csv"]);
        assert!(matches!(cli.command, Some(Commands::Generate { rows: 50, .. })));
        assert_eq!(cli.output, Some(PathBuf::from("x.csv")));
    }
}
