//! Subcommand implementations and the plumbing they share.

pub mod modules;
pub mod run;
pub mod step;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use pdksync_core::{config, PdksyncConfig, RunRequest, StepArgs, StepFields};
use pdksync_remote::{GitHost, GitHubClient};
use pdksync_steps::{Outcome, RunReport};

/// Module selection and output flags shared by every step command.
#[derive(Args, Debug, Default)]
pub struct Selection {
    /// Only act on these modules (comma separated). Falls back to $MODULES.
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    pub modules: Vec<String>,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl Selection {
    fn filter(&self) -> Option<Vec<String>> {
        let named: Vec<String> = self
            .modules
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if named.is_empty() {
            config::module_filter_from_env()
        } else {
            Some(named)
        }
    }
}

pub fn load_config(explicit: Option<&Path>) -> Result<PdksyncConfig> {
    config::load(explicit).context("failed to load pdksync config")
}

/// A record with nothing set is no arguments at all.
pub fn fields_or_none(fields: StepFields) -> StepArgs {
    if fields.is_empty() {
        StepArgs::None
    } else {
        StepArgs::Fields(fields)
    }
}

/// Load config, build the hosting client when a token is set, run, print.
/// A run that fails part way prints what it finished before returning the error.
pub fn execute(explicit: Option<&Path>, mut request: RunRequest, selection: &Selection) -> Result<()> {
    let config = load_config(explicit)?;
    if let Some(filter) = selection.filter() {
        request = request.with_modules(filter);
    }

    let client = config::access_token().map(|token| GitHubClient::new(&config.api_endpoint, &token));
    let host = client.as_ref().map(|c| c as &dyn GitHost);

    let steps = request
        .ordered_steps()
        .iter()
        .map(|s| s.name())
        .collect::<Vec<_>>()
        .join(", ");
    let (report, result) = pdksync_steps::run_partial(&config, host, &request);
    if let Some(report) = &report {
        // A failed run still shows the modules that finished, and their PRs.
        if result.is_ok() || !report.modules.is_empty() {
            if selection.json {
                println!("{}", serde_json::to_string_pretty(report)?);
            } else {
                print_report(report);
            }
        }
    }
    result.with_context(|| format!("pdksync run failed ({steps})"))
}

fn print_report(report: &RunReport) {
    for module in &report.modules {
        if let Some(reason) = &module.skipped {
            println!("{} {} skipped: {reason}", "!".yellow().bold(), module.module);
            continue;
        }
        println!("{} {}", "✓".green().bold(), module.module);
        for step in &module.steps {
            println!("  {:<16} {}", step.step.name(), describe(&step.outcome));
        }
    }

    if !report.pull_requests.is_empty() {
        println!("\nPull requests:");
        for url in &report.pull_requests {
            println!("  {}", url.cyan());
        }
    }

    if let Some(finished) = report.finished_at {
        let elapsed = finished - report.started_at;
        println!(
            "\n{} module(s) in {:.1}s",
            report.modules.len(),
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Done { detail } => detail.clone(),
        Outcome::NothingToCommit { branch } => format!("nothing to commit on {branch}").dimmed().to_string(),
        Outcome::NoChanges { branch } => format!("{branch} has no changes").dimmed().to_string(),
        Outcome::PullRequest { url } => format!("opened {url}"),
        Outcome::TestsPassed { report } => format!("{} ({})", "passed".green(), report.display()),
        Outcome::TestsFailed { report } => format!("{} ({})", "failed".red().bold(), report.display()),
    }
}
