//! Thin wrapper over the `git` CLI.
//!
//! Every call spawns `git` with the module working copy as its current
//! directory and fails with [`RemoteError::GitFailed`] (stderr attached) on a
//! non-zero exit. `GIT_TERMINAL_PROMPT=0` keeps credential prompts from
//! blocking a batch run.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::RemoteError;

/// A local working copy.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl Git {
    /// Wrap an existing working copy.
    pub fn open(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            user_name: None,
            user_email: None,
        }
    }

    /// Commit identity passed as `-c user.name=… -c user.email=…`.
    /// Unset values fall back to the user's git config.
    pub fn with_identity(mut self, name: Option<&str>, email: Option<&str>) -> Self {
        self.user_name = name.map(str::to_string);
        self.user_email = email.map(str::to_string);
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// `git clone <url> <dest>`, creating `dest`'s parent if needed.
    pub fn clone_repo(url: &str, dest: &Path) -> Result<Git, RemoteError> {
        let parent = match dest.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| RemoteError::Spawn {
            command: "git clone".to_string(),
            dir: parent.clone(),
            source: e,
        })?;

        let dest_arg = dest.to_string_lossy().into_owned();
        let mut cmd = base_command(&std::env::current_dir().unwrap_or(parent));
        cmd.args(["clone", "--quiet", url, &dest_arg]);
        run(cmd, &format!("git clone {url}"), dest)?;
        tracing::info!("cloned {url} into {}", dest.display());
        Ok(Git::open(dest))
    }

    /// True when `git ls-remote --heads <url> <branch>` finds the branch.
    pub fn remote_has_branch(url: &str, branch: &str) -> Result<bool, RemoteError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut cmd = base_command(&cwd);
        cmd.args(["ls-remote", "--heads", url, branch]);
        let out = run(cmd, &format!("git ls-remote --heads {url} {branch}"), &cwd)?;
        Ok(!stdout(&out).trim().is_empty())
    }

    /// True when `git ls-remote <url>` can read the repository at all.
    pub fn remote_is_reachable(url: &str) -> Result<bool, RemoteError> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut cmd = base_command(&cwd);
        cmd.args(["ls-remote", "--heads", url]);
        succeeds(cmd, &format!("git ls-remote --heads {url}"), &cwd)
    }

    /// True when `sha` names a commit in the repository at `url`.
    ///
    /// Arbitrary commits are not advertised by `ls-remote`, so the repository
    /// is cloned bare into `scratch` and inspected there. `scratch` is
    /// removed before and after.
    pub fn remote_has_commit(url: &str, sha: &str, scratch: &Path) -> Result<bool, RemoteError> {
        let _ = std::fs::remove_dir_all(scratch);
        let parent = scratch.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| RemoteError::Spawn {
            command: "git clone --bare".to_string(),
            dir: parent.to_path_buf(),
            source: e,
        })?;

        let dest = scratch.to_string_lossy().into_owned();
        let mut cmd = base_command(parent);
        cmd.args(["clone", "--quiet", "--bare", url, &dest]);
        let found = run(cmd, &format!("git clone --bare {url}"), parent).and_then(|_| {
            let mut cmd = base_command(scratch);
            cmd.args(["cat-file", "-e", &format!("{sha}^{{commit}}")]);
            succeeds(cmd, &format!("git cat-file -e {sha}"), scratch)
        });
        let _ = std::fs::remove_dir_all(scratch);
        found
    }

    /// True when `name` resolves to a commit in this working copy.
    pub fn has_ref(&self, name: &str) -> Result<bool, RemoteError> {
        let mut cmd = base_command(&self.workdir);
        cmd.args(["rev-parse", "--verify", "--quiet", &format!("{name}^{{commit}}")]);
        succeeds(cmd, &format!("git rev-parse --verify {name}"), &self.workdir)
    }

    /// Name of the checked-out branch.
    pub fn current_branch(&self) -> Result<String, RemoteError> {
        Ok(self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?.trim().to_string())
    }

    /// `git checkout -B <branch>`: create or reset the branch at HEAD.
    pub fn checkout_branch(&self, branch: &str) -> Result<(), RemoteError> {
        self.git(&["checkout", "--quiet", "-B", branch])?;
        tracing::debug!("checked out {branch} in {}", self.workdir.display());
        Ok(())
    }

    /// True when the working tree has staged, unstaged, or untracked changes.
    pub fn has_changes(&self) -> Result<bool, RemoteError> {
        Ok(!self.git(&["status", "--porcelain"])?.trim().is_empty())
    }

    pub fn add_all(&self) -> Result<(), RemoteError> {
        self.git(&["add", "--all"]).map(|_| ())
    }

    pub fn commit(&self, message: &str) -> Result<(), RemoteError> {
        self.git(&["commit", "--quiet", "-m", message]).map(|_| ())
    }

    /// True when the tree at `head` differs from `base_ref`.
    pub fn differs_from(&self, base_ref: &str, head: &str) -> Result<bool, RemoteError> {
        let diff = self.git(&["diff", "--name-only", base_ref, head])?;
        Ok(!diff.trim().is_empty())
    }

    /// `git push --set-upstream <remote> <branch>`.
    pub fn push(&self, remote: &str, branch: &str) -> Result<(), RemoteError> {
        self.git(&["push", "--quiet", "--set-upstream", remote, branch])?;
        tracing::info!("pushed {branch} to {remote}");
        Ok(())
    }

    /// `git show` for HEAD: commit header, message, and patch.
    pub fn show(&self) -> Result<String, RemoteError> {
        self.git(&["show", "--no-color", "HEAD"])
    }

    fn git(&self, args: &[&str]) -> Result<String, RemoteError> {
        let mut cmd = base_command(&self.workdir);
        if let Some(name) = &self.user_name {
            cmd.arg("-c").arg(format!("user.name={name}"));
        }
        if let Some(email) = &self.user_email {
            cmd.arg("-c").arg(format!("user.email={email}"));
        }
        cmd.args(args);
        let label = format!("git {}", args.join(" "));
        let out = run(cmd, &label, &self.workdir)?;
        Ok(stdout(&out))
    }
}

fn base_command(dir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(dir).env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

fn run(mut cmd: Command, label: &str, dir: &Path) -> Result<Output, RemoteError> {
    tracing::debug!("running `{label}`");
    let output = cmd.output().map_err(|e| RemoteError::Spawn {
        command: label.to_string(),
        dir: dir.to_path_buf(),
        source: e,
    })?;
    if output.status.success() {
        return Ok(output);
    }
    Err(RemoteError::GitFailed {
        command: label.to_string(),
        dir: dir.to_path_buf(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Exit status as a bool; only a failure to spawn is an error.
fn succeeds(mut cmd: Command, label: &str, dir: &Path) -> Result<bool, RemoteError> {
    tracing::debug!("running `{label}`");
    let status = cmd
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| RemoteError::Spawn {
            command: label.to_string(),
            dir: dir.to_path_buf(),
            source: e,
        })?;
    Ok(status.success())
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn init_repo(dir: &Path) -> Git {
        let mut cmd = base_command(dir);
        cmd.args(["-c", "init.defaultBranch=main", "init", "--quiet"]);
        run(cmd, "git init", dir).expect("git init");
        Git::open(dir).with_identity(Some("pdksync"), Some("pdksync@example.com"))
    }

    #[test]
    fn commit_shows_message() {
        let tmp = TempDir::new().unwrap();
        let git = init_repo(tmp.path());
        std::fs::write(tmp.path().join("README.md"), "hello\n").unwrap();

        assert!(git.has_changes().unwrap());
        git.add_all().unwrap();
        git.commit("kittens in mittens").unwrap();
        assert!(!git.has_changes().unwrap());
        assert!(git.show().unwrap().contains("kittens in mittens"));
    }

    #[test]
    fn checkout_branch_switches_head() {
        let tmp = TempDir::new().unwrap();
        let git = init_repo(tmp.path());
        std::fs::write(tmp.path().join("a"), "a").unwrap();
        git.add_all().unwrap();
        git.commit("init").unwrap();

        git.checkout_branch("pdksync_temp").unwrap();
        assert_eq!(git.current_branch().unwrap(), "pdksync_temp");
        // -B tolerates an existing branch.
        git.checkout_branch("pdksync_temp").unwrap();
    }

    #[test]
    fn named_branch_is_compared_not_head() {
        let tmp = TempDir::new().unwrap();
        let git = init_repo(tmp.path());
        std::fs::write(tmp.path().join("a"), "a").unwrap();
        git.add_all().unwrap();
        git.commit("init").unwrap();

        git.checkout_branch("pdksync_temp").unwrap();
        std::fs::write(tmp.path().join("b"), "b").unwrap();
        git.add_all().unwrap();
        git.commit("second").unwrap();
        git.git(&["checkout", "--quiet", "main"]).unwrap();

        assert!(!git.differs_from("main", "HEAD").unwrap());
        assert!(git.differs_from("main", "pdksync_temp").unwrap());
        assert!(git.has_ref("pdksync_temp").unwrap());
        assert!(!git.has_ref("pdksync_missing").unwrap());
    }

    #[test]
    fn failed_command_carries_stderr() {
        let tmp = TempDir::new().unwrap();
        let git = init_repo(tmp.path());
        let err = git.differs_from("origin/main", "HEAD").unwrap_err();
        match err {
            RemoteError::GitFailed { command, stderr, .. } => {
                assert!(command.starts_with("git diff"));
                assert!(!stderr.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
