//! `pdksync run`: several steps in one pass.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use pdksync_core::{RunRequest, Step, StepArgs};

use super::{execute, Selection};

/// Arguments for `pdksync run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Steps to run, comma separated. They always run in pipeline order.
    #[arg(long, value_delimiter = ',', required = true, value_name = "STEPS")]
    pub steps: Vec<String>,

    /// Command for run_a_command.
    #[arg(long, conflicts_with_all = ["set", "args_file"])]
    pub command: Option<String>,

    /// Named step argument, e.g. `--set branch_name=pdksync_main`. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// YAML or JSON file holding the step arguments.
    #[arg(long, value_name = "FILE")]
    pub args_file: Option<PathBuf>,

    #[command(flatten)]
    pub selection: Selection,
}

impl RunArgs {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let steps = self
            .steps
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.parse::<Step>())
            .collect::<Result<Vec<_>, _>>()?;

        let args = match &self.command {
            Some(command) => StepArgs::Command(command.clone()),
            None => step_args(self.args_file.as_deref(), &self.set)?,
        };
        execute(config, RunRequest::new(steps, args), &self.selection)
    }
}

/// Merge `--set` pairs over the arguments file, if any.
fn step_args(file: Option<&Path>, pairs: &[String]) -> Result<StepArgs> {
    let base = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str::<StepArgs>(&raw)
                .with_context(|| format!("failed to parse step arguments in {}", path.display()))?
        }
        None => StepArgs::None,
    };
    if pairs.is_empty() {
        return Ok(base);
    }

    let mut mapping = match base {
        StepArgs::None => serde_yaml::Mapping::new(),
        StepArgs::Fields(fields) => match serde_yaml::to_value(fields)? {
            serde_yaml::Value::Mapping(m) => m,
            _ => serde_yaml::Mapping::new(),
        },
        StepArgs::Command(_) => bail!("--set cannot be combined with a command in --args-file"),
    };
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
        mapping.insert(
            serde_yaml::Value::String(key.trim().to_string()),
            serde_yaml::Value::String(value.to_string()),
        );
    }
    serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).context("invalid --set argument")
}
