//! `pdksync modules list|enable|disable`

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use pdksync_core::modules;

use super::load_config;

/// Inspect and edit the managed module list.
#[derive(Subcommand, Debug)]
pub enum ModulesCommand {
    /// List active modules and whether each has a working copy.
    List(ListArgs),

    /// Activate a commented-out entry.
    Enable { name: String },

    /// Comment out an entry so runs skip it.
    Disable { name: String },
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize, Tabled)]
struct ModuleRow {
    #[tabled(rename = "module")]
    module: String,
    #[tabled(rename = "repository")]
    repository: String,
    #[tabled(rename = "working copy")]
    cloned: bool,
}

pub fn run(cmd: ModulesCommand, config: Option<&Path>) -> Result<()> {
    match cmd {
        ModulesCommand::List(args) => list(config, args.json),
        ModulesCommand::Enable { name } => toggle(config, &name, true),
        ModulesCommand::Disable { name } => toggle(config, &name, false),
    }
}

fn list(config: Option<&Path>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let names = modules::load_managed_modules(&config.managed_modules)
        .context("failed to load managed modules")?;

    let rows: Vec<ModuleRow> = names
        .iter()
        .map(|name| ModuleRow {
            module: name.to_string(),
            repository: config.repo_name(name),
            cloned: config.module_dir(name).is_dir(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    let count = rows.len();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{count} active module(s) in {}", config.managed_modules.display());
    Ok(())
}

fn toggle(config: Option<&Path>, name: &str, active: bool) -> Result<()> {
    let config = load_config(config)?;
    let path = &config.managed_modules;
    if active {
        modules::enable_module(path, name)
    } else {
        modules::disable_module(path, name)
    }
    .with_context(|| format!("failed to update {}", path.display()))?;

    let state = if active { "enabled".green() } else { "disabled".yellow() };
    println!("{} {name} {state}", "✓".green().bold());
    Ok(())
}
