//! Managed module list.
//!
//! # File format
//!
//! ```yaml
//! ---
//! - puppetlabs-motd
//! - puppetlabs-ntp
//! #- puppetlabs-testing
//! ```
//!
//! A plain YAML sequence of repository names. Entries are deactivated by
//! commenting them out, so the YAML parser never sees them.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{io_err, ConfigError};
use crate::types::ModuleName;

// ---------------------------------------------------------------------------
// 1. Load
// ---------------------------------------------------------------------------

/// Load the active module names from `path`.
///
/// Returns `ConfigError::ModuleListMissing` if the file is absent or empty,
/// `ConfigError::NoModules` if every entry is commented out, and
/// `ConfigError::Parse` (with path + line context) if the YAML is malformed.
pub fn load_managed_modules(path: &Path) -> Result<Vec<ModuleName>, ConfigError> {
    let missing = || ConfigError::ModuleListMissing {
        path: path.to_path_buf(),
    };
    let meta = std::fs::metadata(path).map_err(|_| missing())?;
    if meta.len() == 0 {
        return Err(missing());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let names: Option<Vec<String>> =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    let names: Vec<ModuleName> = names
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .map(ModuleName::from)
        .collect();

    if names.is_empty() {
        return Err(ConfigError::NoModules {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!("loaded {} managed modules from {}", names.len(), path.display());
    Ok(names)
}

// ---------------------------------------------------------------------------
// 2. Filter
// ---------------------------------------------------------------------------

/// Restrict `modules` to the names in `only`, keeping list order.
///
/// `None` keeps everything. Names in `only` that are not active in the list
/// are ignored.
pub fn filter_modules(modules: Vec<ModuleName>, only: Option<&[String]>) -> Vec<ModuleName> {
    match only {
        None => modules,
        Some(only) => modules
            .into_iter()
            .filter(|m| only.iter().any(|o| o == &m.0))
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// 3. Enable / disable
// ---------------------------------------------------------------------------

/// Uncomment the entry for `name` (`#- name` → `- name`).
///
/// Idempotent: an already active entry is left alone.
pub fn enable_module(path: &Path, name: &str) -> Result<(), ConfigError> {
    set_module_active(path, name, true)
}

/// Comment out the entry for `name` (`- name` → `#- name`).
///
/// Idempotent: an already inactive entry is left alone.
pub fn disable_module(path: &Path, name: &str) -> Result<(), ConfigError> {
    set_module_active(path, name, false)
}

fn set_module_active(path: &Path, name: &str, active: bool) -> Result<(), ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let entry = entry_pattern(name)?;

    let mut found = false;
    let mut lines: Vec<String> = Vec::new();
    for line in contents.lines() {
        match entry.captures(line) {
            Some(caps) => {
                found = true;
                let indent = caps.name("indent").map_or("", |m| m.as_str());
                let prefix = if active { "" } else { "#" };
                lines.push(format!("{indent}{prefix}- {name}"));
            }
            None => lines.push(line.to_string()),
        }
    }

    if !found {
        return Err(ConfigError::ModuleNotListed {
            name: name.to_string(),
            path: path.to_path_buf(),
        });
    }

    let mut rewritten = lines.join("\n");
    if contents.ends_with('\n') {
        rewritten.push('\n');
    }
    write_atomic(path, &rewritten)?;
    tracing::info!(
        "{} {} in {}",
        if active { "enabled" } else { "disabled" },
        name,
        path.display()
    );
    Ok(())
}

fn entry_pattern(name: &str) -> Result<Regex, ConfigError> {
    let pattern = format!(
        r"^(?P<indent>\s*)#?\s*-\s*['\x22]?{}['\x22]?\s*$",
        regex::escape(name)
    );
    Ok(Regex::new(&pattern)?)
}

/// Write via a `.tmp` sibling and rename.
fn write_atomic(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, contents).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_list(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("managed_modules.yml");
        std::fs::write(&path, contents).expect("write list");
        path
    }

    #[test]
    fn commented_entries_are_inactive() {
        let dir = TempDir::new().unwrap();
        let path = write_list(&dir, "---\n- puppetlabs-motd\n#- puppetlabs-testing\n- puppetlabs-ntp\n");
        let modules = load_managed_modules(&path).expect("load");
        assert_eq!(
            modules,
            vec![ModuleName::from("puppetlabs-motd"), ModuleName::from("puppetlabs-ntp")]
        );
    }

    #[test]
    fn filter_keeps_list_order() {
        let modules = vec![
            ModuleName::from("a"),
            ModuleName::from("b"),
            ModuleName::from("c"),
        ];
        let only = vec!["c".to_string(), "a".to_string(), "zzz".to_string()];
        let filtered = filter_modules(modules, Some(&only));
        assert_eq!(filtered, vec![ModuleName::from("a"), ModuleName::from("c")]);
    }

    #[test]
    fn enable_then_disable_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = write_list(&dir, "---\n- puppetlabs-motd\n#- puppetlabs-testing\n");

        enable_module(&path, "puppetlabs-testing").expect("enable");
        let modules = load_managed_modules(&path).unwrap();
        assert!(modules.contains(&ModuleName::from("puppetlabs-testing")));

        disable_module(&path, "puppetlabs-testing").expect("disable");
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("#- puppetlabs-testing"));
        assert!(text.ends_with('\n'));
        assert!(!tmp_path(&path).exists(), ".tmp must be gone after rewrite");
    }

    #[test]
    fn enable_does_not_touch_prefix_matches() {
        let dir = TempDir::new().unwrap();
        let path = write_list(&dir, "- puppetlabs-motd\n#- puppetlabs-motd-extra\n");
        let err = enable_module(&path, "puppetlabs-mot").unwrap_err();
        assert!(matches!(err, ConfigError::ModuleNotListed { .. }));
    }
}
