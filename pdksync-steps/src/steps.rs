//! One function per step, each acting on a single module.

use std::path::{Path, PathBuf};

use pdksync_core::{ModuleName, PdksyncConfig, Step};
use pdksync_gemfile::{GemField, GemUpdate, GEMFILE};
use pdksync_remote::{Git, GitHost, NewPullRequest, RubyGems};
use pdksync_renderer::{PrContext, Renderer, TemplateKind};

use crate::error::{io_err, StepError};
use crate::exec::{self, CommandOutput};
use crate::metadata::read_metadata;
use crate::plan::{CommitArgs, ModuleType, PullRequestArgs, TestArgs};
use crate::report::Outcome;

pub const TEST_REPORT: &str = "run_tests_report.txt";

/// The module a step is acting on.
pub(crate) struct Target<'a> {
    pub config: &'a PdksyncConfig,
    pub module: &'a ModuleName,
    /// `<pdksync_dir>/<module>`.
    pub dir: PathBuf,
    /// `<namespace>/<module>`.
    pub repo: String,
}

impl<'a> Target<'a> {
    pub fn new(config: &'a PdksyncConfig, module: &'a ModuleName) -> Self {
        Self {
            config,
            module,
            dir: config.module_dir(module),
            repo: config.repo_name(module),
        }
    }

    fn git(&self) -> Git {
        Git::open(&self.dir).with_identity(
            self.config.git_user_name.as_deref(),
            self.config.git_user_email.as_deref(),
        )
    }
}

// ---------------------------------------------------------------------------
// Local steps
// ---------------------------------------------------------------------------

pub(crate) fn clone(target: &Target) -> Result<Outcome, StepError> {
    if target.dir.exists() {
        std::fs::remove_dir_all(&target.dir).map_err(|e| io_err(&target.dir, e))?;
    }
    let url = target.config.clone_url(target.module.as_str());
    Git::clone_repo(&url, &target.dir)?;
    Ok(Outcome::Done {
        detail: format!("cloned {url}"),
    })
}

/// `pdk <subcommand…>` for `pdk_convert`, `pdk_validate` and `pdk_update`.
pub(crate) fn pdk(target: &Target, step: Step) -> Result<Outcome, StepError> {
    let config = target.config;
    let mut args: Vec<&str> = match step {
        Step::PdkConvert => vec!["convert", "--force"],
        Step::PdkValidate => vec!["validate", "-a"],
        Step::PdkUpdate => vec!["update", "--force"],
        other => {
            return Err(StepError::InvalidArgument {
                step: other,
                message: "not a pdk step".to_string(),
            })
        }
    };
    if step == Step::PdkConvert {
        if let Some(url) = config.pdk_templates.as_deref() {
            args.extend(["--template-url", url]);
        }
        if let Some(git_ref) = config.pdk_template_ref.as_deref() {
            args.extend(["--template-ref", git_ref]);
        }
    }
    let output = exec::run_checked(&config.pdk_binary, &args, &target.dir)?;
    Ok(Outcome::Done {
        detail: output.label,
    })
}

pub(crate) fn run_a_command(target: &Target, command: &str) -> Result<Outcome, StepError> {
    let output = exec::shell(command, &target.dir)?;
    Ok(Outcome::Done {
        detail: output.label,
    })
}

pub(crate) fn gem_file_update(
    target: &Target,
    update: &GemUpdate,
    sources: Option<&RubyGems>,
) -> Result<Outcome, StepError> {
    if let Some(sources) = sources {
        check_gem_sources(target.config, update, sources)?;
    }
    let path = target.dir.join(GEMFILE);
    pdksync_gemfile::update_file(&path, update)?;
    Ok(Outcome::Done {
        detail: format!("updated {} in {}", update.gem, path.display()),
    })
}

/// Refuse a replacement line or replacers that point at sources the gem
/// does not have. The gem repository is the line's `git:` source when it
/// names one, otherwise `<git_base_uri>/<namespace>/<gem>.git`.
fn check_gem_sources(
    config: &PdksyncConfig,
    update: &GemUpdate,
    sources: &RubyGems,
) -> Result<(), StepError> {
    let unknown = |field: &'static str, value: &str| StepError::UnknownGemSource {
        gem: update.gem.clone(),
        field,
        value: value.to_string(),
    };
    let repo = match update.git_source() {
        Some(url) => {
            if !Git::remote_is_reachable(&url)? {
                return Err(unknown("git", &url));
            }
            url
        }
        None => config.clone_url(&update.gem),
    };
    if let Some(branch) = update.replacer(GemField::Branch) {
        if !Git::remote_has_branch(&repo, branch)? {
            return Err(unknown("branch", branch));
        }
    }
    if let Some(sha) = update.replacer(GemField::Sha) {
        let scratch = config.pdksync_dir.join(".gem_sources").join(&update.gem);
        if !Git::remote_has_commit(&repo, sha, &scratch)? {
            return Err(unknown("sha", sha));
        }
    }
    if let Some(version) = update.replacer(GemField::Version) {
        if !sources.constraint_is_published(&update.gem, version)? {
            return Err(unknown("version", version));
        }
    }
    Ok(())
}

pub(crate) fn run_tests(target: &Target, args: &TestArgs) -> Result<Outcome, StepError> {
    let outputs = match args.module_type {
        ModuleType::Traditional => traditional_tests(&target.dir)?,
        ModuleType::Litmus => litmus_tests(&target.dir, args)?,
    };
    let passed = outputs.iter().all(|o| o.success);
    let transcript: String = outputs.iter().map(CommandOutput::transcript).collect();
    let report = target.dir.join(TEST_REPORT);
    std::fs::write(&report, transcript).map_err(|e| io_err(&report, e))?;

    if passed {
        tracing::info!("{}: {} tests passed", target.module, args.module_type);
        Ok(Outcome::TestsPassed { report })
    } else {
        tracing::warn!(
            "{}: {} tests failed, see {}",
            target.module,
            args.module_type,
            report.display()
        );
        Ok(Outcome::TestsFailed { report })
    }
}

fn traditional_tests(dir: &Path) -> Result<Vec<CommandOutput>, StepError> {
    let install = exec::capture("bundle", &["install"], dir)?;
    if !install.success {
        return Ok(vec![install]);
    }
    let spec = exec::capture("bundle", &["exec", "rake", "spec"], dir)?;
    Ok(vec![install, spec])
}

/// Provision, install and run acceptance tests; tear down whatever happened.
fn litmus_tests(dir: &Path, args: &TestArgs) -> Result<Vec<CommandOutput>, StepError> {
    let provision = format!("litmus:provision_list[{}]", args.provision_type);
    let install_agent = match &args.puppet_collection {
        Some(collection) => format!("litmus:install_agent[{collection}]"),
        None => "litmus:install_agent".to_string(),
    };
    let stages = [
        vec!["install"],
        vec!["exec", "rake", provision.as_str()],
        vec!["exec", "rake", install_agent.as_str()],
        vec!["exec", "rake", "litmus:install_module"],
        vec!["exec", "rake", "litmus:acceptance:parallel"],
    ];

    let mut outputs = Vec::new();
    for stage in &stages {
        let output = exec::capture("bundle", stage, dir)?;
        let failed = !output.success;
        outputs.push(output);
        if failed {
            break;
        }
    }
    outputs.push(exec::capture("bundle", &["exec", "rake", "litmus:tear_down"], dir)?);
    Ok(outputs)
}

pub(crate) fn create_commit(target: &Target, args: &CommitArgs) -> Result<Outcome, StepError> {
    let git = target.git();
    git.checkout_branch(&args.branch_name)?;
    if !git.has_changes()? {
        tracing::info!("{}: nothing to commit on {}", target.module, args.branch_name);
        return Ok(Outcome::NothingToCommit {
            branch: args.branch_name.clone(),
        });
    }
    git.add_all()?;
    git.commit(&args.commit_message)?;
    Ok(Outcome::Done {
        detail: format!("committed to {}", args.branch_name),
    })
}

pub(crate) fn push(target: &Target) -> Result<Outcome, StepError> {
    let git = target.git();
    let branch = git.current_branch()?;
    if !git.differs_from(&target.config.base_ref(), "HEAD")? {
        tracing::info!("{}: {branch} matches {}", target.module, target.config.base_ref());
        return Ok(Outcome::NoChanges { branch });
    }
    git.push(&target.config.push_file_destination, &branch)?;
    Ok(Outcome::Done {
        detail: format!("pushed {branch} to {}", target.config.push_file_destination),
    })
}

// ---------------------------------------------------------------------------
// Hosting API steps
// ---------------------------------------------------------------------------

pub(crate) fn create_pr(
    target: &Target,
    host: &dyn GitHost,
    renderer: &Renderer,
    args: &PullRequestArgs,
) -> Result<Outcome, StepError> {
    let config = target.config;
    let label = resolve_label(target, host, args.label.as_deref())?;

    let git = target.git();
    let branch = match &args.branch_name {
        Some(branch) => branch.clone(),
        None => git.current_branch()?,
    };
    // The head may exist only on the remote when it was pushed by an earlier run.
    let head = if git.has_ref(&branch)? {
        branch.clone()
    } else {
        format!("{}/{branch}", config.push_file_destination)
    };
    if !git.differs_from(&config.base_ref(), &head)? {
        tracing::info!("{}: no changes against {}, no PR opened", target.module, config.base_ref());
        return Ok(Outcome::NoChanges { branch });
    }

    let meta = read_metadata(&target.dir)?;
    let ctx = PrContext::new(config, target.module, &args.pr_title, &branch)
        .with_additional_title(args.additional_title.as_deref())
        .with_pdk(
            meta.pdk_version.as_deref(),
            meta.template_ref.as_deref(),
            meta.template_url.as_deref(),
        );
    let pr = NewPullRequest {
        title: renderer.render(TemplateKind::PrTitle, &ctx)?,
        body: renderer.render(TemplateKind::PrBody, &ctx)?,
        head: branch,
        base: config.create_pr_against.clone(),
    };
    let created = host.create_pull_request(&target.repo, &pr)?;
    tracing::info!("{}: opened {}", target.module, created.html_url);
    if let Some(label) = label {
        host.add_labels(&target.repo, created.number, &[label])?;
    }
    Ok(Outcome::PullRequest {
        url: created.html_url,
    })
}

/// An explicit label must exist on the repository. The configured default
/// is applied only when it does.
fn resolve_label(
    target: &Target,
    host: &dyn GitHost,
    explicit: Option<&str>,
) -> Result<Option<String>, StepError> {
    let default = target.config.pdksync_label.trim();
    let wanted = match explicit {
        Some(label) => label,
        None if !default.is_empty() => default,
        None => return Ok(None),
    };
    let labels = host.labels(&target.repo)?;
    if labels.iter().any(|l| l == wanted) {
        return Ok(Some(wanted.to_string()));
    }
    if explicit.is_some() {
        return Err(StepError::InvalidLabel {
            label: wanted.to_string(),
            repo: target.repo.clone(),
        });
    }
    tracing::warn!("{}: label '{wanted}' is not defined, PR left unlabelled", target.repo);
    Ok(None)
}

pub(crate) fn clean_branches(
    target: &Target,
    host: &dyn GitHost,
    branch: &str,
) -> Result<Outcome, StepError> {
    host.delete_branch(&target.repo, branch)?;
    Ok(Outcome::Done {
        detail: format!("deleted {branch} on {}", target.repo),
    })
}
