//! External commands run inside a module working copy.

use std::path::Path;
use std::process::Command;

use crate::error::{io_err, StepError};

/// Captured result of one command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Command line as shown in logs and reports.
    pub label: String,
    pub success: bool,
    pub status: String,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// `$ label`, then stdout and stderr; the form written to report files.
    pub fn transcript(&self) -> String {
        let mut out = format!("$ {}\n", self.label);
        for stream in [&self.stdout, &self.stderr] {
            if !stream.is_empty() {
                out.push_str(stream);
                if !stream.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
        out
    }
}

/// Run `program args…` in `dir` and capture its output, whatever the exit status.
pub fn capture(program: &str, args: &[&str], dir: &Path) -> Result<CommandOutput, StepError> {
    let label = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("running `{label}` in {}", dir.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .map_err(|e| io_err(dir, e))?;

    Ok(CommandOutput {
        label,
        success: output.status.success(),
        status: output.status.to_string(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// [`capture`], failing with [`StepError::CommandFailed`] on a non-zero exit.
pub fn run_checked(program: &str, args: &[&str], dir: &Path) -> Result<CommandOutput, StepError> {
    let output = capture(program, args, dir)?;
    if output.success {
        return Ok(output);
    }
    Err(StepError::CommandFailed {
        command: output.label,
        dir: dir.to_path_buf(),
        status: output.status,
        stderr: output.stderr.trim().to_string(),
    })
}

/// `sh -c <command>` in `dir`.
pub fn shell(command: &str, dir: &Path) -> Result<CommandOutput, StepError> {
    run_checked("sh", &["-c", command], dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shell_runs_in_directory() {
        let tmp = TempDir::new().unwrap();
        shell("touch cat.meow", tmp.path()).unwrap();
        assert!(tmp.path().join("cat.meow").exists());
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = shell("echo broken >&2; exit 3", tmp.path()).unwrap_err();
        match err {
            StepError::CommandFailed { command, stderr, .. } => {
                assert_eq!(command, "sh -c echo broken >&2; exit 3");
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn capture_keeps_failures() {
        let tmp = TempDir::new().unwrap();
        let out = capture("sh", &["-c", "echo out; exit 1"], tmp.path()).unwrap();
        assert!(!out.success);
        assert_eq!(out.transcript(), "$ sh -c echo out; exit 1\nout\n");
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = capture("pdksync-no-such-program", &[], tmp.path()).unwrap_err();
        assert!(matches!(err, StepError::Io { .. }));
    }
}
