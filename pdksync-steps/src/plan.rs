//! Argument validation.
//!
//! A [`Plan`] is the typed form of a [`RunRequest`]: every requested step's
//! arguments are checked and extracted once, before any side effect. A
//! request that builds into a plan cannot fail later for want of an argument.

use std::fmt;
use std::str::FromStr;

use pdksync_core::{RunRequest, Step, StepArgs, StepFields};
use pdksync_gemfile::{GemField, GemUpdate};

use crate::error::StepError;

pub const RUN_A_COMMAND_MISSING: &str = "\"run_a_command\" requires an argument to run.";
pub const CREATE_COMMIT_MISSING: &str = "Needs a branch_name and commit_message";
pub const CREATE_PR_MISSING: &str = "Needs a pr_title";
pub const CLEAN_BRANCHES_MISSING: &str =
    "Needs a branch_name, and the branch name contains the string pdksync";

/// Branches `clean_branches` may delete must carry this marker.
pub const BRANCH_MARKER: &str = "pdksync";

// ---------------------------------------------------------------------------
// Per-step arguments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitArgs {
    pub branch_name: String,
    pub commit_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestArgs {
    pub pr_title: String,
    pub additional_title: Option<String>,
    /// Explicitly requested label; must exist on the repository.
    pub label: Option<String>,
    /// Head branch; the checked-out branch when absent.
    pub branch_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleType {
    Litmus,
    Traditional,
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleType::Litmus => "litmus",
            ModuleType::Traditional => "traditional",
        })
    }
}

impl FromStr for ModuleType {
    type Err = StepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "litmus" => Ok(ModuleType::Litmus),
            "traditional" => Ok(ModuleType::Traditional),
            other => Err(StepError::InvalidArgument {
                step: Step::RunTests,
                message: format!("module_type must be litmus or traditional, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestArgs {
    pub module_type: ModuleType,
    /// Litmus provisioning list, `default` when unset.
    pub provision_type: String,
    /// Agent collection passed to `litmus:install_agent`.
    pub puppet_collection: Option<String>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Validated, typed view of a [`RunRequest`].
#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub steps: Vec<Step>,
    pub command: Option<String>,
    pub gem_update: Option<GemUpdate>,
    pub tests: Option<TestArgs>,
    pub commit: Option<CommitArgs>,
    pub pull_request: Option<PullRequestArgs>,
    pub clean_branch: Option<String>,
}

impl Plan {
    /// Check every requested step's arguments.
    pub fn build(request: &RunRequest) -> Result<Plan, StepError> {
        let args = &request.args;
        let mut plan = Plan {
            steps: request.ordered_steps(),
            ..Plan::default()
        };

        for step in plan.steps.clone() {
            match step {
                Step::RunACommand => {
                    plan.command = Some(command(args)?);
                }
                Step::GemFileUpdate => {
                    plan.gem_update = Some(gem_update(dispatch(step, args)?)?);
                }
                Step::RunTests => {
                    plan.tests = Some(tests(dispatch(step, args)?)?);
                }
                Step::CreateCommit => {
                    let fields = record(step, args, CREATE_COMMIT_MISSING)?;
                    match (present(&fields.branch_name), present(&fields.commit_message)) {
                        (Some(branch_name), Some(commit_message)) => {
                            plan.commit = Some(CommitArgs {
                                branch_name: branch_name.to_string(),
                                commit_message: commit_message.to_string(),
                            })
                        }
                        _ => return Err(missing(CREATE_COMMIT_MISSING)),
                    }
                }
                Step::CreatePr => {
                    let fields = record(step, args, CREATE_PR_MISSING)?;
                    let pr_title = present(&fields.pr_title).ok_or_else(|| missing(CREATE_PR_MISSING))?;
                    plan.pull_request = Some(PullRequestArgs {
                        pr_title: pr_title.to_string(),
                        additional_title: owned(&fields.additional_title),
                        label: owned(&fields.label),
                        branch_name: owned(&fields.branch_name),
                    });
                }
                Step::CleanBranches => {
                    let fields = record(step, args, CLEAN_BRANCHES_MISSING)?;
                    match present(&fields.branch_name) {
                        Some(branch) if branch.contains(BRANCH_MARKER) => {
                            plan.clean_branch = Some(branch.to_string())
                        }
                        _ => return Err(missing(CLEAN_BRANCHES_MISSING)),
                    }
                }
                Step::Clone | Step::PdkConvert | Step::PdkValidate | Step::PdkUpdate | Step::Push => {}
            }
        }
        Ok(plan)
    }

    pub fn needs_host(&self) -> Option<Step> {
        self.steps.iter().copied().find(Step::needs_host)
    }

    pub fn needs_working_copy(&self) -> bool {
        self.steps.iter().any(Step::needs_working_copy)
    }
}

/// Validate a request without keeping the plan.
pub fn validate_request(request: &RunRequest) -> Result<(), StepError> {
    Plan::build(request).map(|_| ())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn missing(message: &str) -> StepError {
    StepError::MissingArgument(message.to_string())
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

fn command(args: &StepArgs) -> Result<String, StepError> {
    match args {
        StepArgs::Command(command) if !command.trim().is_empty() => Ok(command.clone()),
        StepArgs::Fields(_) => Err(StepError::Dispatch {
            step: Step::RunACommand,
            shape: args.shape(),
        }),
        _ => Err(missing(RUN_A_COMMAND_MISSING)),
    }
}

/// Record-shaped steps: no arguments at all reads as missing fields.
fn record<'a>(step: Step, args: &'a StepArgs, message: &str) -> Result<&'a StepFields, StepError> {
    match args {
        StepArgs::Fields(fields) => Ok(fields),
        StepArgs::None => Err(missing(message)),
        StepArgs::Command(_) => Err(StepError::Dispatch {
            step,
            shape: args.shape(),
        }),
    }
}

/// Steps that can only be dispatched on a record.
fn dispatch(step: Step, args: &StepArgs) -> Result<&StepFields, StepError> {
    args.fields().ok_or(StepError::Dispatch {
        step,
        shape: args.shape(),
    })
}

fn gem_update(fields: &StepFields) -> Result<GemUpdate, StepError> {
    let gem = present(&fields.gem_to_test).ok_or_else(|| missing("Needs a gem_to_test"))?;
    let mut update = GemUpdate::new(gem);
    if let Some(line) = present(&fields.gem_line) {
        update = update.with_line(line);
    }
    let update = update
        .with_pair(
            GemField::Branch,
            fields.gem_branch_finder.as_deref(),
            fields.gem_branch_replacer.as_deref(),
        )?
        .with_pair(
            GemField::Sha,
            fields.gem_sha_finder.as_deref(),
            fields.gem_sha_replacer.as_deref(),
        )?
        .with_pair(
            GemField::Version,
            fields.gem_version_finder.as_deref(),
            fields.gem_version_replacer.as_deref(),
        )?;
    if update.is_empty() {
        return Err(missing(
            "Needs a gem_line or a gem_branch/gem_sha/gem_version finder and replacer",
        ));
    }
    Ok(update)
}

fn tests(fields: &StepFields) -> Result<TestArgs, StepError> {
    let module_type = present(&fields.module_type).ok_or_else(|| missing("Needs a module_type"))?;
    Ok(TestArgs {
        module_type: module_type.parse()?,
        provision_type: present(&fields.provision_type).unwrap_or("default").to_string(),
        puppet_collection: owned(&fields.puppet_collection),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn fields(f: impl FnOnce(&mut StepFields)) -> StepArgs {
        let mut fields = StepFields::default();
        f(&mut fields);
        StepArgs::Fields(fields)
    }

    fn build(step: Step, args: StepArgs) -> Result<Plan, StepError> {
        Plan::build(&RunRequest::new(vec![step], args))
    }

    #[rstest]
    #[case(Step::RunACommand, RUN_A_COMMAND_MISSING)]
    #[case(Step::CreateCommit, CREATE_COMMIT_MISSING)]
    #[case(Step::CreatePr, CREATE_PR_MISSING)]
    #[case(Step::CleanBranches, CLEAN_BRANCHES_MISSING)]
    fn missing_arguments_use_fixed_messages(#[case] step: Step, #[case] message: &str) {
        let err = build(step, StepArgs::None).unwrap_err();
        assert_eq!(err.to_string(), message);
    }

    #[rstest]
    #[case(Step::GemFileUpdate)]
    #[case(Step::RunTests)]
    fn record_only_steps_reject_no_arguments(#[case] step: Step) {
        let err = build(step, StepArgs::None).unwrap_err();
        assert!(matches!(err, StepError::Dispatch { shape: "no", .. }), "got: {err}");
    }

    #[test]
    fn run_a_command_rejects_a_record() {
        let err = build(Step::RunACommand, fields(|_| {})).unwrap_err();
        assert!(matches!(err, StepError::Dispatch { shape: "named", .. }));
    }

    #[test]
    fn blank_command_is_missing() {
        let err = build(Step::RunACommand, StepArgs::Command("  ".into())).unwrap_err();
        assert_eq!(err.to_string(), RUN_A_COMMAND_MISSING);
    }

    #[test]
    fn commit_needs_both_fields() {
        let err = build(
            Step::CreateCommit,
            fields(|f| f.branch_name = Some("temp_branch".into())),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), CREATE_COMMIT_MISSING);

        let plan = build(
            Step::CreateCommit,
            fields(|f| {
                f.branch_name = Some("temp_branch".into());
                f.commit_message = Some("kittens in mittens".into());
            }),
        )
        .unwrap();
        assert_eq!(plan.commit.unwrap().commit_message, "kittens in mittens");
    }

    #[test]
    fn clean_branches_requires_marker() {
        let err = build(
            Step::CleanBranches,
            fields(|f| f.branch_name = Some("feature".into())),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), CLEAN_BRANCHES_MISSING);

        let plan = build(
            Step::CleanBranches,
            fields(|f| f.branch_name = Some("pdksync_main".into())),
        )
        .unwrap();
        assert_eq!(plan.clean_branch.as_deref(), Some("pdksync_main"));
        assert_eq!(plan.needs_host(), Some(Step::CleanBranches));
        assert!(!plan.needs_working_copy());
    }

    #[test]
    fn gem_update_needs_an_edit() {
        let err = build(
            Step::GemFileUpdate,
            fields(|f| f.gem_to_test = Some("puppet_litmus".into())),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::MissingArgument(_)));

        let err = build(
            Step::GemFileUpdate,
            fields(|f| {
                f.gem_to_test = Some("puppet_litmus".into());
                f.gem_sha_finder = Some("abc".into());
            }),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::Gemfile(_)), "got: {err}");
    }

    #[test]
    fn tests_parse_module_type() {
        let plan = build(
            Step::RunTests,
            fields(|f| f.module_type = Some("Litmus".into())),
        )
        .unwrap();
        let tests = plan.tests.unwrap();
        assert_eq!(tests.module_type, ModuleType::Litmus);
        assert_eq!(tests.provision_type, "default");

        let err = build(
            Step::RunTests,
            fields(|f| f.module_type = Some("acceptance".into())),
        )
        .unwrap_err();
        assert!(matches!(err, StepError::InvalidArgument { .. }));
    }

    #[test]
    fn argument_free_steps_always_validate() {
        let request = RunRequest::new(
            vec![Step::Push, Step::Clone, Step::PdkConvert],
            StepArgs::None,
        );
        let plan = Plan::build(&request).unwrap();
        assert_eq!(plan.steps, vec![Step::Clone, Step::PdkConvert, Step::Push]);
        assert_eq!(plan.needs_host(), None);
    }
}
