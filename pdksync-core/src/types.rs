//! Domain types for the pdksync pipeline.
//!
//! A run is described by a [`RunRequest`]: the set of [`Step`]s to perform and
//! a [`StepArgs`] payload whose expected shape depends on the steps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed name for a managed module repository (e.g. `puppetlabs-motd`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleName(pub String);

impl ModuleName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

/// One named action of the pipeline.
///
/// Variants are declared in execution order; a run always performs its steps
/// in this order regardless of how they were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Clone,
    PdkConvert,
    PdkValidate,
    RunACommand,
    GemFileUpdate,
    RunTests,
    PdkUpdate,
    CreateCommit,
    Push,
    CreatePr,
    CleanBranches,
}

impl Step {
    /// All steps in execution order.
    pub fn all() -> &'static [Step] {
        &[
            Step::Clone,
            Step::PdkConvert,
            Step::PdkValidate,
            Step::RunACommand,
            Step::GemFileUpdate,
            Step::RunTests,
            Step::PdkUpdate,
            Step::CreateCommit,
            Step::Push,
            Step::CreatePr,
            Step::CleanBranches,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Step::Clone => "clone",
            Step::PdkConvert => "pdk_convert",
            Step::PdkValidate => "pdk_validate",
            Step::RunACommand => "run_a_command",
            Step::GemFileUpdate => "gem_file_update",
            Step::RunTests => "run_tests",
            Step::PdkUpdate => "pdk_update",
            Step::CreateCommit => "create_commit",
            Step::Push => "push",
            Step::CreatePr => "create_pr",
            Step::CleanBranches => "clean_branches",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::all().iter().map(Step::name).collect()
    }

    /// Whether the step talks to the hosting API.
    pub fn needs_host(&self) -> bool {
        matches!(self, Step::CreatePr | Step::CleanBranches)
    }

    /// Whether the step acts on the module's local working copy.
    pub fn needs_working_copy(&self) -> bool {
        !matches!(self, Step::Clone | Step::CleanBranches)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Step::all()
            .iter()
            .copied()
            .find(|step| step.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownStep(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Step arguments
// ---------------------------------------------------------------------------

/// Named argument record used by the record-shaped steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepFields {
    pub branch_name: Option<String>,
    pub commit_message: Option<String>,
    pub pr_title: Option<String>,
    pub additional_title: Option<String>,
    pub label: Option<String>,
    pub gem_to_test: Option<String>,
    pub gem_line: Option<String>,
    pub gem_sha_finder: Option<String>,
    pub gem_sha_replacer: Option<String>,
    pub gem_version_finder: Option<String>,
    pub gem_version_replacer: Option<String>,
    pub gem_branch_finder: Option<String>,
    pub gem_branch_replacer: Option<String>,
    pub module_type: Option<String>,
    pub provision_type: Option<String>,
    pub puppet_collection: Option<String>,
}

impl StepFields {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == StepFields::default()
    }
}

/// Argument payload for a run. Its shape depends on the requested steps:
/// a free string for `run_a_command`, a record for everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepArgs {
    #[default]
    None,
    Command(String),
    Fields(StepFields),
}

impl StepArgs {
    /// Short description of the payload shape, used in dispatch errors.
    pub fn shape(&self) -> &'static str {
        match self {
            StepArgs::None => "no",
            StepArgs::Command(_) => "string",
            StepArgs::Fields(_) => "named",
        }
    }

    pub fn fields(&self) -> Option<&StepFields> {
        match self {
            StepArgs::Fields(fields) => Some(fields),
            _ => None,
        }
    }
}

/// A complete pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub steps: Vec<Step>,
    pub args: StepArgs,
    /// Restrict the run to these module names; `None` means every active module.
    pub modules: Option<Vec<String>>,
}

impl RunRequest {
    pub fn new(steps: impl Into<Vec<Step>>, args: StepArgs) -> Self {
        Self {
            steps: steps.into(),
            args,
            modules: None,
        }
    }

    pub fn with_modules(mut self, modules: Vec<String>) -> Self {
        self.modules = Some(modules);
        self
    }

    /// Requested steps, deduplicated, in execution order.
    pub fn ordered_steps(&self) -> Vec<Step> {
        let mut steps = self.steps.clone();
        steps.sort();
        steps.dedup();
        steps
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
