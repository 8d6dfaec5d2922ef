//! pdksync configuration.
//!
//! # Lookup order
//!
//! 1. explicit path (`--config`)
//! 2. `$PDKSYNC_CONFIG_PATH`
//! 3. `<home>/.pdksync.yml`
//!
//! A missing file is not an error: every field has a default. Relative paths
//! in the config (`pdksync_dir`, `managed_modules`, `templates_dir`) resolve
//! against the current working directory.
//!
//! As with the module list, functions come in two forms: `fn_at(home, …)` for
//! tests and `fn(…)` which derives home from `dirs::home_dir()`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError};
use crate::types::ModuleName;

pub const CONFIG_FILE_NAME: &str = ".pdksync.yml";
pub const CONFIG_PATH_ENV: &str = "PDKSYNC_CONFIG_PATH";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const MODULES_ENV: &str = "MODULES";

/// Settings shared by every step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdksyncConfig {
    /// Organisation that owns every managed module repository.
    pub namespace: String,
    /// Directory that holds one working copy per module.
    pub pdksync_dir: PathBuf,
    /// Git remote that branches are pushed to.
    pub push_file_destination: String,
    /// Base branch pull requests are opened against.
    pub create_pr_against: String,
    /// YAML list of managed module names.
    pub managed_modules: PathBuf,
    /// Label applied to pull requests when the caller names none.
    pub pdksync_label: String,
    /// Clone URLs are `<git_base_uri>/<namespace>/<module>.git`.
    pub git_base_uri: String,
    /// GitHub REST endpoint.
    pub api_endpoint: String,
    pub pdk_binary: String,
    /// `--template-url` passed to `pdk convert`.
    pub pdk_templates: Option<String>,
    /// `--template-ref` passed to `pdk convert`.
    pub pdk_template_ref: Option<String>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
    /// Directory of `.tera` files overriding the built-in PR/commit templates.
    pub templates_dir: Option<PathBuf>,
    /// Check gem branch/version replacers against their sources before editing a Gemfile.
    pub validate_gem_sources: bool,
}

impl Default for PdksyncConfig {
    fn default() -> Self {
        Self {
            namespace: "puppetlabs".to_string(),
            pdksync_dir: PathBuf::from("modules_pdksync"),
            push_file_destination: "origin".to_string(),
            create_pr_against: "main".to_string(),
            managed_modules: PathBuf::from("managed_modules.yml"),
            pdksync_label: "maintenance".to_string(),
            git_base_uri: "https://github.com".to_string(),
            api_endpoint: "https://api.github.com".to_string(),
            pdk_binary: "pdk".to_string(),
            pdk_templates: None,
            pdk_template_ref: None,
            git_user_name: None,
            git_user_email: None,
            templates_dir: None,
            validate_gem_sources: false,
        }
    }
}

impl PdksyncConfig {
    /// `<namespace>/<module>`: the repository slug used by the hosting API.
    pub fn repo_name(&self, module: &ModuleName) -> String {
        format!("{}/{}", self.namespace, module.0)
    }

    /// Clone URL for a repository in the configured namespace.
    pub fn clone_url(&self, repo: &str) -> String {
        format!(
            "{}/{}/{}.git",
            self.git_base_uri.trim_end_matches('/'),
            self.namespace,
            repo
        )
    }

    /// Working directory for a module: `<pdksync_dir>/<module>`.
    pub fn module_dir(&self, module: &ModuleName) -> PathBuf {
        self.pdksync_dir.join(&module.0)
    }

    /// `<push_file_destination>/<create_pr_against>`, the ref branches are compared to.
    pub fn base_ref(&self) -> String {
        format!("{}/{}", self.push_file_destination, self.create_pr_against)
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// `<home>/.pdksync.yml`: pure, no I/O.
pub fn default_path_at(home: &Path) -> PathBuf {
    home.join(CONFIG_FILE_NAME)
}

/// Resolve which config file applies, honouring an explicit path and
/// `$PDKSYNC_CONFIG_PATH` before the home default.
pub fn resolve_path_at(home: &Path, explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => default_path_at(home),
    }
}

/// Load a config file. Returns defaults when the file does not exist.
pub fn load_from(path: &Path) -> Result<PdksyncConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("no config at {}, using defaults", path.display());
        return Ok(PdksyncConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(PdksyncConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load the config that applies for `home`.
pub fn load_at(home: &Path, explicit: Option<&Path>) -> Result<PdksyncConfig, ConfigError> {
    load_from(&resolve_path_at(home, explicit))
}

/// `load_at` convenience wrapper.
pub fn load(explicit: Option<&Path>) -> Result<PdksyncConfig, ConfigError> {
    load_at(&home()?, explicit)
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// API token from `$GITHUB_TOKEN`, if set and non-empty.
pub fn access_token() -> Option<String> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Module filter from `$MODULES` (comma separated), if set.
pub fn module_filter_from_env() -> Option<Vec<String>> {
    std::env::var(MODULES_ENV)
        .ok()
        .map(|raw| split_list(&raw))
        .filter(|list| !list.is_empty())
}

/// Split a comma separated list, dropping blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
