//! One subcommand per step: `pdksync clone`, `pdksync create-pr`, …

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use pdksync_core::{RunRequest, Step, StepArgs, StepFields};

use super::{execute, fields_or_none, Selection};

/// Run a single step against every managed module.
#[derive(Subcommand, Debug)]
pub enum StepCommand {
    /// Clone each module into pdksync_dir, replacing any existing copy.
    Clone(Selection),

    /// Convert each module with `pdk convert`.
    PdkConvert(Selection),

    /// Validate each module with `pdk validate`.
    PdkValidate(Selection),

    /// Update each module with `pdk update`.
    PdkUpdate(Selection),

    /// Run a shell command in each module.
    RunACommand(RunACommandArgs),

    /// Pin a gem in each module's Gemfile.
    GemFileUpdate(GemFileArgs),

    /// Run unit or acceptance tests in each module.
    RunTests(RunTestsArgs),

    /// Commit pending changes on a branch.
    CreateCommit(CreateCommitArgs),

    /// Push the checked-out branch when it differs from the base.
    Push(Selection),

    /// Open a pull request for the checked-out branch.
    CreatePr(CreatePrArgs),

    /// Delete a pdksync branch on the hosting service.
    CleanBranches(CleanBranchesArgs),
}

#[derive(Args, Debug)]
pub struct RunACommandArgs {
    /// Command line, run through `sh -c`.
    pub command: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args, Debug)]
pub struct CreateCommitArgs {
    #[arg(long)]
    pub branch_name: Option<String>,

    #[arg(long)]
    pub commit_message: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args, Debug)]
pub struct CreatePrArgs {
    #[arg(long)]
    pub pr_title: Option<String>,

    /// Prefix for the title, e.g. "(MAINT)".
    #[arg(long)]
    pub additional_title: Option<String>,

    /// Label to apply; must already exist on the repository.
    #[arg(long)]
    pub label: Option<String>,

    /// Head branch (default: the checked-out branch).
    #[arg(long)]
    pub branch_name: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args, Debug)]
pub struct CleanBranchesArgs {
    /// Branch to delete; must contain "pdksync".
    #[arg(long)]
    pub branch_name: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args, Debug)]
pub struct GemFileArgs {
    #[arg(long)]
    pub gem_to_test: Option<String>,

    /// Replace the whole declaration line.
    #[arg(long)]
    pub gem_line: Option<String>,

    #[arg(long)]
    pub gem_sha_finder: Option<String>,

    #[arg(long)]
    pub gem_sha_replacer: Option<String>,

    #[arg(long)]
    pub gem_version_finder: Option<String>,

    #[arg(long)]
    pub gem_version_replacer: Option<String>,

    #[arg(long)]
    pub gem_branch_finder: Option<String>,

    #[arg(long)]
    pub gem_branch_replacer: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

#[derive(Args, Debug)]
pub struct RunTestsArgs {
    /// litmus | traditional
    #[arg(long)]
    pub module_type: Option<String>,

    /// Litmus provision list (default: "default").
    #[arg(long)]
    pub provision_type: Option<String>,

    /// Puppet agent collection for litmus, e.g. "puppet7".
    #[arg(long)]
    pub puppet_collection: Option<String>,

    #[command(flatten)]
    pub selection: Selection,
}

impl StepCommand {
    pub fn run(self, config: Option<&Path>) -> Result<()> {
        let (step, args, selection) = self.into_parts();
        execute(config, RunRequest::new(vec![step], args), &selection)
    }

    /// Absent flags stay absent so the pipeline reports what is missing.
    fn into_parts(self) -> (Step, StepArgs, Selection) {
        match self {
            StepCommand::Clone(s) => (Step::Clone, StepArgs::None, s),
            StepCommand::PdkConvert(s) => (Step::PdkConvert, StepArgs::None, s),
            StepCommand::PdkValidate(s) => (Step::PdkValidate, StepArgs::None, s),
            StepCommand::PdkUpdate(s) => (Step::PdkUpdate, StepArgs::None, s),
            StepCommand::Push(s) => (Step::Push, StepArgs::None, s),
            StepCommand::RunACommand(a) => (
                Step::RunACommand,
                a.command.map_or(StepArgs::None, StepArgs::Command),
                a.selection,
            ),
            StepCommand::CreateCommit(a) => (
                Step::CreateCommit,
                fields_or_none(StepFields {
                    branch_name: a.branch_name,
                    commit_message: a.commit_message,
                    ..Default::default()
                }),
                a.selection,
            ),
            StepCommand::CreatePr(a) => (
                Step::CreatePr,
                fields_or_none(StepFields {
                    pr_title: a.pr_title,
                    additional_title: a.additional_title,
                    label: a.label,
                    branch_name: a.branch_name,
                    ..Default::default()
                }),
                a.selection,
            ),
            StepCommand::CleanBranches(a) => (
                Step::CleanBranches,
                fields_or_none(StepFields {
                    branch_name: a.branch_name,
                    ..Default::default()
                }),
                a.selection,
            ),
            StepCommand::GemFileUpdate(a) => (
                Step::GemFileUpdate,
                fields_or_none(StepFields {
                    gem_to_test: a.gem_to_test,
                    gem_line: a.gem_line,
                    gem_sha_finder: a.gem_sha_finder,
                    gem_sha_replacer: a.gem_sha_replacer,
                    gem_version_finder: a.gem_version_finder,
                    gem_version_replacer: a.gem_version_replacer,
                    gem_branch_finder: a.gem_branch_finder,
                    gem_branch_replacer: a.gem_branch_replacer,
                    ..Default::default()
                }),
                a.selection,
            ),
            StepCommand::RunTests(a) => (
                Step::RunTests,
                fields_or_none(StepFields {
                    module_type: a.module_type,
                    provision_type: a.provision_type,
                    puppet_collection: a.puppet_collection,
                    ..Default::default()
                }),
                a.selection,
            ),
        }
    }
}
