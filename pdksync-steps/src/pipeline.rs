//! Pipeline entrypoint used by every CLI command that runs steps.
//!
//! ## Run protocol
//!
//! 1. Validate arguments for every requested step ([`Plan::build`]).
//! 2. Require a hosting client if any step needs the API.
//! 3. Create `pdksync_dir`, load and filter the managed module list.
//! 4. With a hosting client: check the token and that every repository exists.
//! 5. For each module, run the steps in execution order. A module without a
//!    working copy is skipped; any step failure ends the run, and
//!    [`Pipeline::run_partial`] still hands back the modules that finished.

use pdksync_core::{modules, ModuleName, PdksyncConfig, RunRequest, Step};
use pdksync_remote::{GitHost, RubyGems};
use pdksync_renderer::Renderer;

use crate::error::{io_err, StepError};
use crate::plan::Plan;
use crate::report::{ModuleReport, RunReport};
use crate::steps::{self, Target};

/// A configured pipeline. Build once per run.
pub struct Pipeline<'a> {
    config: &'a PdksyncConfig,
    host: Option<&'a dyn GitHost>,
    renderer: Renderer,
    gem_sources: Option<RubyGems>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PdksyncConfig) -> Result<Self, StepError> {
        Ok(Self {
            config,
            host: None,
            renderer: Renderer::with_overrides(config.templates_dir.as_deref())?,
            gem_sources: config.validate_gem_sources.then(RubyGems::default),
        })
    }

    pub fn with_host(mut self, host: &'a dyn GitHost) -> Self {
        self.host = Some(host);
        self
    }

    /// Replace the RubyGems client used when `validate_gem_sources` is set.
    pub fn with_gem_sources(mut self, sources: RubyGems) -> Self {
        if self.config.validate_gem_sources {
            self.gem_sources = Some(sources);
        }
        self
    }

    pub fn run(&self, request: &RunRequest) -> Result<RunReport, StepError> {
        let (report, result) = self.run_partial(request);
        result.map(|()| report)
    }

    /// Like [`run`](Self::run), but the report comes back even when the run
    /// stopped early, holding every module that finished before the failure.
    pub fn run_partial(&self, request: &RunRequest) -> (RunReport, Result<(), StepError>) {
        let mut report = RunReport::start(Vec::new());
        let result = self.drive(request, &mut report);
        let report = report.finish();

        if result.is_err() && !report.pull_requests.is_empty() {
            tracing::warn!(
                "run stopped after opening {} pull request(s): {}",
                report.pull_requests.len(),
                report.pull_requests.join(", ")
            );
        }
        for skipped in report.skipped() {
            tracing::warn!(
                "skipped {}: {}",
                skipped.module,
                skipped.skipped.as_deref().unwrap_or_default()
            );
        }
        (report, result)
    }

    fn drive(&self, request: &RunRequest, report: &mut RunReport) -> Result<(), StepError> {
        let plan = Plan::build(request)?;
        report.steps = plan.steps.clone();
        if let Some(step) = plan.needs_host() {
            if self.host.is_none() {
                return Err(StepError::HostRequired(step));
            }
        }

        let modules = self.modules(request)?;
        if let Some(host) = self.host {
            let login = host.login()?;
            tracing::debug!("using hosting API as {login}");
            self.check_repositories(host, &modules)?;
        }

        for module in &modules {
            report.push(self.run_module(&plan, module)?);
        }
        Ok(())
    }

    fn modules(&self, request: &RunRequest) -> Result<Vec<ModuleName>, StepError> {
        let dir = &self.config.pdksync_dir;
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let all = modules::load_managed_modules(&self.config.managed_modules)?;
        let selected = modules::filter_modules(all, request.modules.as_deref());
        if selected.is_empty() {
            tracing::warn!("no managed modules match the requested filter");
        }
        Ok(selected)
    }

    fn check_repositories(&self, host: &dyn GitHost, modules: &[ModuleName]) -> Result<(), StepError> {
        let mut missing = Vec::new();
        for module in modules {
            let repo = self.config.repo_name(module);
            if !host.repository_exists(&repo)? {
                missing.push(repo);
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(StepError::UnknownRepositories(missing))
        }
    }

    fn run_module(&self, plan: &Plan, module: &ModuleName) -> Result<ModuleReport, StepError> {
        let target = Target::new(self.config, module);
        let mut report = ModuleReport::new(module.clone());
        tracing::info!("{module}: starting");

        for &step in &plan.steps {
            if step.needs_working_copy() && !target.dir.is_dir() {
                report.skipped = Some(format!(
                    "no working copy at {}; run clone first",
                    target.dir.display()
                ));
                return Ok(report);
            }
            let outcome = self.run_step(&target, plan, step)?;
            tracing::info!("{module}: {step} done");
            report.record(step, outcome);
        }
        Ok(report)
    }

    fn run_step(
        &self,
        target: &Target,
        plan: &Plan,
        step: Step,
    ) -> Result<crate::report::Outcome, StepError> {
        // Plan::build has already checked that each step's arguments exist.
        let absent = || StepError::MissingArgument(format!("no arguments planned for {step}"));
        match step {
            Step::Clone => steps::clone(target),
            Step::PdkConvert | Step::PdkValidate | Step::PdkUpdate => steps::pdk(target, step),
            Step::RunACommand => {
                let command = plan.command.as_deref().ok_or_else(absent)?;
                steps::run_a_command(target, command)
            }
            Step::GemFileUpdate => {
                let update = plan.gem_update.as_ref().ok_or_else(absent)?;
                steps::gem_file_update(target, update, self.gem_sources.as_ref())
            }
            Step::RunTests => {
                let args = plan.tests.as_ref().ok_or_else(absent)?;
                steps::run_tests(target, args)
            }
            Step::CreateCommit => {
                let args = plan.commit.as_ref().ok_or_else(absent)?;
                steps::create_commit(target, args)
            }
            Step::Push => steps::push(target),
            Step::CreatePr => {
                let args = plan.pull_request.as_ref().ok_or_else(absent)?;
                let host = self.host.ok_or(StepError::HostRequired(step))?;
                steps::create_pr(target, host, &self.renderer, args)
            }
            Step::CleanBranches => {
                let branch = plan.clean_branch.as_deref().ok_or_else(absent)?;
                let host = self.host.ok_or(StepError::HostRequired(step))?;
                steps::clean_branches(target, host, branch)
            }
        }
    }
}

/// Run `request` against `config`, talking to `host` for API steps.
pub fn run(
    config: &PdksyncConfig,
    host: Option<&dyn GitHost>,
    request: &RunRequest,
) -> Result<RunReport, StepError> {
    pipeline(config, host)?.run(request)
}

/// [`run`], keeping the partial report when a module fails.
///
/// Canonical entrypoint for both `pdksync run` and the single-step commands.
pub fn run_partial(
    config: &PdksyncConfig,
    host: Option<&dyn GitHost>,
    request: &RunRequest,
) -> (Option<RunReport>, Result<(), StepError>) {
    match pipeline(config, host) {
        Ok(pipeline) => {
            let (report, result) = pipeline.run_partial(request);
            (Some(report), result)
        }
        Err(e) => (None, Err(e)),
    }
}

fn pipeline<'a>(
    config: &'a PdksyncConfig,
    host: Option<&'a dyn GitHost>,
) -> Result<Pipeline<'a>, StepError> {
    let mut pipeline = Pipeline::new(config)?;
    if let Some(host) = host {
        pipeline = pipeline.with_host(host);
    }
    Ok(pipeline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdksync_core::{StepArgs, StepFields};
    use tempfile::TempDir;

    fn config_in(tmp: &TempDir, modules: &str) -> PdksyncConfig {
        let list = tmp.path().join("managed_modules.yml");
        std::fs::write(&list, modules).unwrap();
        PdksyncConfig {
            pdksync_dir: tmp.path().join("modules_pdksync"),
            managed_modules: list,
            ..Default::default()
        }
    }

    #[test]
    fn api_step_without_host_fails_before_side_effects() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, "- puppetlabs-testing\n");
        let request = RunRequest::new(
            vec![Step::CleanBranches],
            StepArgs::Fields(StepFields {
                branch_name: Some("pdksync_main".into()),
                ..Default::default()
            }),
        );
        let err = run(&config, None, &request).unwrap_err();
        assert!(matches!(err, StepError::HostRequired(Step::CleanBranches)));
        assert!(!config.pdksync_dir.exists());
    }

    #[test]
    fn module_without_working_copy_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, "- puppetlabs-testing\n");
        let request = RunRequest::new(vec![Step::RunACommand], StepArgs::Command("true".into()));

        let report = run(&config, None, &request).unwrap();
        let module = report.module("puppetlabs-testing").unwrap();
        assert!(module.skipped.as_deref().unwrap().contains("no working copy"));
        assert!(module.steps.is_empty());
        assert!(config.pdksync_dir.is_dir());
    }

    #[test]
    fn filter_restricts_modules() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, "- puppetlabs-a\n- puppetlabs-b\n");
        let request = RunRequest::new(vec![Step::PdkValidate], StepArgs::None)
            .with_modules(vec!["puppetlabs-b".into()]);

        let report = run(&config, None, &request).unwrap();
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules[0].module.as_str(), "puppetlabs-b");
    }

    #[test]
    fn failure_stops_before_later_modules() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, "- puppetlabs-a\n- puppetlabs-b\n- puppetlabs-c\n");
        for module in ["puppetlabs-a", "puppetlabs-b", "puppetlabs-c"] {
            std::fs::create_dir_all(config.pdksync_dir.join(module)).unwrap();
        }
        std::fs::write(config.pdksync_dir.join("puppetlabs-b").join("broken"), "").unwrap();
        let request = RunRequest::new(
            vec![Step::RunACommand],
            StepArgs::Command("test ! -f broken && touch ran".into()),
        );

        let (report, result) = run_partial(&config, None, &request);
        let err = result.unwrap_err();
        assert!(matches!(err, StepError::CommandFailed { .. }), "got: {err}");

        let report = report.unwrap();
        assert_eq!(report.steps, vec![Step::RunACommand]);
        assert_eq!(report.modules.len(), 1);
        assert_eq!(report.modules[0].module.as_str(), "puppetlabs-a");
        assert!(report.finished_at.is_some());
        assert!(config.pdksync_dir.join("puppetlabs-a").join("ran").exists());
        assert!(!config.pdksync_dir.join("puppetlabs-c").join("ran").exists());
    }

    #[test]
    fn empty_module_list_fails() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp, "");
        let request = RunRequest::new(vec![Step::PdkValidate], StepArgs::None);
        let err = run(&config, None, &request).unwrap_err();
        assert!(err.to_string().contains("is empty/does not exist"), "got: {err}");
    }
}
