//! What a run did, module by module.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use pdksync_core::{ModuleName, Step};

/// Result of one step against one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// The step's action ran; `detail` says what it did.
    Done { detail: String },
    /// `create_commit` found a clean working tree.
    NothingToCommit { branch: String },
    /// The branch does not differ from the base, so nothing was pushed or opened.
    NoChanges { branch: String },
    PullRequest { url: String },
    TestsPassed { report: PathBuf },
    TestsFailed { report: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub step: Step,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReport {
    pub module: ModuleName,
    /// Why the module was skipped, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    pub steps: Vec<StepOutcome>,
}

impl ModuleReport {
    pub(crate) fn new(module: ModuleName) -> Self {
        Self {
            module,
            skipped: None,
            steps: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, step: Step, outcome: Outcome) {
        self.steps.push(StepOutcome { step, outcome });
    }

    pub fn outcome(&self, step: Step) -> Option<&Outcome> {
        self.steps
            .iter()
            .find(|s| s.step == step)
            .map(|s| &s.outcome)
    }
}

/// Summary of a whole run, serialisable for `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub steps: Vec<Step>,
    pub modules: Vec<ModuleReport>,
    /// URLs of every pull request opened.
    pub pull_requests: Vec<String>,
}

impl RunReport {
    pub(crate) fn start(steps: Vec<Step>) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            steps,
            modules: Vec::new(),
            pull_requests: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, module: ModuleReport) {
        for step in &module.steps {
            if let Outcome::PullRequest { url } = &step.outcome {
                self.pull_requests.push(url.clone());
            }
        }
        self.modules.push(module);
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.module.as_str() == name)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ModuleReport> {
        self.modules.iter().filter(|m| m.skipped.is_some())
    }
}
