//! Gemfile line editing.
//!
//! Only the first `gem` declaration that names the target gem is touched.
//! Sub-field patterns, with the finder text regex-escaped:
//!
//! | field   | matched text                                   |
//! |---------|------------------------------------------------|
//! | branch  | `branch: '<finder>'` or `:branch => '<finder>'` |
//! | sha     | `ref: '<finder>'` or `:ref => '<finder>'`       |
//! | version | a positional quoted constraint `, '<finder>'`   |
//!
//! A version constraint is a quoted value that follows a comma directly, so a
//! labelled value such as `branch: '1.0'` never matches the version finder.
//! Quote style and line endings are preserved; only the first match on the
//! line is replaced.

use std::fmt;
use std::path::{Path, PathBuf};

use regex::{Captures, Regex};

use crate::error::{io_err, GemfileError};

/// File name edited inside each module directory.
pub const GEMFILE: &str = "Gemfile";

// ---------------------------------------------------------------------------
// Edit plan
// ---------------------------------------------------------------------------

/// A rewritable sub-field of a gem declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GemField {
    Branch,
    Sha,
    Version,
}

impl fmt::Display for GemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GemField::Branch => write!(f, "branch"),
            GemField::Sha => write!(f, "sha"),
            GemField::Version => write!(f, "version"),
        }
    }
}

/// Replace `finder` with `replacer` in one sub-field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEdit {
    pub field: GemField,
    pub finder: String,
    pub replacer: String,
}

/// Everything to change on one gem's declaration line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GemUpdate {
    pub gem: String,
    /// Whole replacement line, applied before any field edit.
    pub line: Option<String>,
    pub edits: Vec<FieldEdit>,
}

impl GemUpdate {
    pub fn new(gem: impl AsRef<str>) -> Self {
        Self {
            gem: trim_quotes(gem.as_ref()).trim().to_string(),
            line: None,
            edits: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: impl AsRef<str>) -> Self {
        let line = trim_quotes(line.as_ref());
        if !line.trim().is_empty() {
            self.line = Some(line.to_string());
        }
        self
    }

    pub fn with_edit(
        mut self,
        field: GemField,
        finder: impl AsRef<str>,
        replacer: impl AsRef<str>,
    ) -> Self {
        self.edits.push(FieldEdit {
            field,
            finder: trim_quotes(finder.as_ref()).to_string(),
            replacer: trim_quotes(replacer.as_ref()).to_string(),
        });
        self
    }

    /// Add an edit from optional halves. Both absent is a no-op; one absent
    /// is [`GemfileError::IncompletePair`].
    pub fn with_pair(
        self,
        field: GemField,
        finder: Option<&str>,
        replacer: Option<&str>,
    ) -> Result<Self, GemfileError> {
        let finder = finder.map(trim_quotes).filter(|s| !s.trim().is_empty());
        let replacer = replacer.map(trim_quotes).filter(|s| !s.trim().is_empty());
        match (finder, replacer) {
            (None, None) => Ok(self),
            (Some(finder), Some(replacer)) => Ok(self.with_edit(field, finder, replacer)),
            _ => Err(GemfileError::IncompletePair { field }),
        }
    }

    /// The replacer for `field`, if one is planned.
    pub fn replacer(&self, field: GemField) -> Option<&str> {
        self.edits
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.replacer.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_none() && self.edits.is_empty()
    }

    /// The `git:` source named by the replacement line, if any.
    pub fn git_source(&self) -> Option<String> {
        let line = self.line.as_deref()?;
        let re = Regex::new(r#"(?::git\s*=>|git:)\s*['"]([^'"]+)['"]"#).ok()?;
        re.captures(line).map(|caps| caps[1].to_string())
    }
}

/// Callers quote values for shells and YAML; the editor supplies its own quotes.
fn trim_quotes(s: &str) -> &str {
    s.trim()
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

// ---------------------------------------------------------------------------
// Locate
// ---------------------------------------------------------------------------

/// Index of the declaration line for `gem`.
///
/// A line whose quoted gem name equals `gem` wins; otherwise the first
/// declaration containing `gem` as a substring. Comment lines never match.
pub fn find_gem_line(contents: &str, gem: &str) -> Option<usize> {
    let declarations: Vec<(usize, &str)> = contents
        .lines()
        .enumerate()
        .filter(|(_, line)| is_declaration(line))
        .collect();

    let quoted = [format!("'{gem}'"), format!("\"{gem}\"")];
    declarations
        .iter()
        .find(|(_, line)| quoted.iter().any(|q| line.contains(q.as_str())))
        .or_else(|| declarations.iter().find(|(_, line)| line.contains(gem)))
        .map(|(idx, _)| *idx)
}

fn is_declaration(line: &str) -> bool {
    let trimmed = line.trim_start();
    match trimmed.strip_prefix("gem") {
        Some(rest) => rest.starts_with(|c: char| c.is_whitespace() || c == '('),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Apply
// ---------------------------------------------------------------------------

/// Apply `update` to Gemfile `contents`, returning the new contents.
pub fn apply(contents: &str, update: &GemUpdate) -> Result<String, GemfileError> {
    if update.is_empty() {
        return Err(GemfileError::NothingToDo);
    }
    let idx = find_gem_line(contents, &update.gem).ok_or_else(|| GemfileError::GemNotFound {
        gem: update.gem.clone(),
    })?;

    let mut out = String::with_capacity(contents.len());
    for (i, raw) in contents.split_inclusive('\n').enumerate() {
        if i != idx {
            out.push_str(raw);
            continue;
        }
        let (body, ending) = split_line_ending(raw);
        let mut line = match &update.line {
            Some(line) => {
                tracing::debug!("replacing line {} with {line}", idx + 1);
                line.clone()
            }
            None => body.to_string(),
        };
        for edit in &update.edits {
            line = replace_field(&line, edit, &update.gem)?;
        }
        out.push_str(&line);
        out.push_str(ending);
    }
    Ok(out)
}

/// `("text", "\r\n")`, `("text", "\n")` or `("text", "")`.
fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(body) = raw.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = raw.strip_suffix('\n') {
        (body, "\n")
    } else {
        (raw, "")
    }
}

fn labelled_pattern(label: &str, finder: &str) -> Result<Regex, GemfileError> {
    let finder = regex::escape(finder);
    let pattern = format!(r#"((?::{label}\s*=>|{label}:)\s*)(['"]){finder}(['"])"#);
    Ok(Regex::new(&pattern)?)
}

fn replace_field(line: &str, edit: &FieldEdit, gem: &str) -> Result<String, GemfileError> {
    let replaced = match edit.field {
        GemField::Branch => replace_labelled(line, "branch", edit)?,
        GemField::Sha => replace_labelled(line, "ref", edit)?,
        GemField::Version => replace_version(line, edit)?,
    };
    replaced.ok_or_else(|| GemfileError::FinderNotFound {
        gem: gem.to_string(),
        field: edit.field,
        finder: edit.finder.clone(),
    })
}

fn replace_labelled(line: &str, label: &str, edit: &FieldEdit) -> Result<Option<String>, GemfileError> {
    let re = labelled_pattern(label, &edit.finder)?;
    if !re.is_match(line) {
        return Ok(None);
    }
    let replaced = re.replacen(line, 1, |caps: &Captures| {
        format!("{}{}{}{}", &caps[1], &caps[2], edit.replacer, &caps[3])
    });
    Ok(Some(replaced.into_owned()))
}

/// Replace the first positional quoted value whose trimmed text is the finder.
fn replace_version(line: &str, edit: &FieldEdit) -> Result<Option<String>, GemfileError> {
    let quoted = Regex::new(r#"'([^']*)'|"([^"]*)""#)?;
    for caps in quoted.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
            continue;
        };
        if inner.as_str().trim() != edit.finder {
            continue;
        }
        if !line[..whole.start()].trim_end().ends_with(',') {
            continue;
        }
        let mut out = String::with_capacity(line.len() + edit.replacer.len());
        out.push_str(&line[..inner.start()]);
        out.push_str(&edit.replacer);
        out.push_str(&line[inner.end()..]);
        return Ok(Some(out));
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

/// Apply `update` to the Gemfile at `path` and write it back atomically.
pub fn update_file(path: &Path, update: &GemUpdate) -> Result<(), GemfileError> {
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let updated = apply(&contents, update)?;

    let tmp = PathBuf::from(format!("{}.pdksync.tmp", path.display()));
    std::fs::write(&tmp, &updated).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }

    tracing::info!("updated gem '{}' in {}", update.gem, path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GEMFILE_FIXTURE: &str = "\
source 'https://rubygems.org'

group :development do
  gem 'puppet-lint', '~> 2.0'
  gem 'puppet_litmus', git: 'https://github.com/puppetlabs/puppet_litmus.git', branch: 'master', ref: '04da90638f5b5fd7f007123c8c0cc551c8cb3e54', '=0.1.0'
  # gem 'puppet', branch: 'main'
end
";

    #[test]
    fn finds_declaration_by_quoted_name() {
        assert_eq!(find_gem_line(GEMFILE_FIXTURE, "puppet_litmus"), Some(4));
        assert_eq!(find_gem_line(GEMFILE_FIXTURE, "puppet-lint"), Some(3));
    }

    #[test]
    fn comment_lines_are_not_declarations() {
        assert_eq!(find_gem_line("# gem 'puppet'\n", "puppet"), None);
    }

    #[test]
    fn substring_match_is_the_fallback() {
        assert_eq!(find_gem_line(GEMFILE_FIXTURE, "litmus"), Some(4));
    }

    #[test]
    fn gem_prefix_alone_is_not_a_declaration() {
        assert!(!is_declaration("gemspec"));
        assert!(is_declaration("  gem('rake')"));
    }

    #[test]
    fn branch_edit_keeps_other_fields() {
        let update =
            GemUpdate::new("puppet_litmus").with_edit(GemField::Branch, "master", "main");
        let out = apply(GEMFILE_FIXTURE, &update).unwrap();
        assert!(out.contains("branch: 'main', ref: '04da90638f5b5fd7f007123c8c0cc551c8cb3e54'"));
        assert!(!out.contains("branch: 'master'"));
        assert!(out.ends_with("end\n"));
    }

    #[test]
    fn hash_rocket_syntax_is_supported() {
        let contents = "gem 'rspec-puppet', :git => 'https://x/rspec-puppet.git', :ref => 'abc123'\n";
        let update = GemUpdate::new("rspec-puppet").with_edit(GemField::Sha, "abc123", "def456");
        let out = apply(contents, &update).unwrap();
        assert_eq!(
            out,
            "gem 'rspec-puppet', :git => 'https://x/rspec-puppet.git', :ref => 'def456'\n"
        );
    }

    #[test]
    fn version_edit_matches_whole_quoted_constraint() {
        let update = GemUpdate::new("puppet_litmus").with_edit(GemField::Version, "0.1.0", "1.0.0");
        let err = apply(GEMFILE_FIXTURE, &update).unwrap_err();
        assert!(matches!(err, GemfileError::FinderNotFound { field: GemField::Version, .. }));
    }

    #[test]
    fn only_the_target_line_changes() {
        let contents = "gem 'a', branch: 'master'\ngem 'b', branch: 'master'\n";
        let update = GemUpdate::new("b").with_edit(GemField::Branch, "master", "main");
        let out = apply(contents, &update).unwrap();
        assert_eq!(out, "gem 'a', branch: 'master'\ngem 'b', branch: 'main'\n");
    }

    #[test]
    fn replacer_with_dollar_sign_is_literal() {
        let contents = "gem 'a', branch: 'master'\n";
        let update = GemUpdate::new("a").with_edit(GemField::Branch, "master", "feat$1");
        assert_eq!(apply(contents, &update).unwrap(), "gem 'a', branch: 'feat$1'\n");
    }

    #[test]
    fn surrounding_double_quotes_are_trimmed() {
        let update = GemUpdate::new("\"puppet_litmus\"").with_line("\"gem 'puppet_litmus'\"");
        assert_eq!(update.gem, "puppet_litmus");
        assert_eq!(update.line.as_deref(), Some("gem 'puppet_litmus'"));
    }

    #[test]
    fn incomplete_pair_is_rejected() {
        let err = GemUpdate::new("x")
            .with_pair(GemField::Sha, Some("abc"), None)
            .unwrap_err();
        assert!(err.to_string().contains("gem_sha_finder and gem_sha_replacer"));
    }

    #[test]
    fn version_edit_leaves_labelled_values_alone() {
        let contents = "gem 'puppet_litmus', git: 'https://x/puppet_litmus.git', branch: '2.0', '2.0'\n";
        let update = GemUpdate::new("puppet_litmus").with_edit(GemField::Version, "2.0", "3.0");
        assert_eq!(
            apply(contents, &update).unwrap(),
            "gem 'puppet_litmus', git: 'https://x/puppet_litmus.git', branch: '2.0', '3.0'\n"
        );
    }

    #[test]
    fn version_finder_matching_only_a_branch_is_not_found() {
        let contents = "gem 'puppet_litmus', branch: 'main', '>= 0.1'\n";
        let update = GemUpdate::new("puppet_litmus").with_edit(GemField::Version, "main", "1.0.0");
        let err = apply(contents, &update).unwrap_err();
        assert!(matches!(err, GemfileError::FinderNotFound { field: GemField::Version, .. }));
    }

    #[test]
    fn crlf_line_endings_survive_an_edit() {
        let contents = "source 'https://rubygems.org'\r\ngem 'a', branch: 'master'\r\ngem 'b'\r\n";
        let update = GemUpdate::new("a").with_edit(GemField::Branch, "master", "main");
        assert_eq!(
            apply(contents, &update).unwrap(),
            "source 'https://rubygems.org'\r\ngem 'a', branch: 'main'\r\ngem 'b'\r\n"
        );
    }

    #[test]
    fn missing_final_newline_is_kept() {
        let update = GemUpdate::new("a").with_line("gem 'a', '~> 1.0'");
        assert_eq!(apply("gem 'b'\ngem 'a'", &update).unwrap(), "gem 'b'\ngem 'a', '~> 1.0'");
    }

    #[test]
    fn git_source_is_read_from_the_replacement_line() {
        let update = GemUpdate::new("puppet_litmus")
            .with_line("gem 'puppet_litmus', :git => 'https://github.com/test/puppet_litmus.git'");
        assert_eq!(
            update.git_source().as_deref(),
            Some("https://github.com/test/puppet_litmus.git")
        );
        assert_eq!(GemUpdate::new("puppet_litmus").git_source(), None);
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = apply(GEMFILE_FIXTURE, &GemUpdate::new("puppet_litmus")).unwrap_err();
        assert!(matches!(err, GemfileError::NothingToDo));
    }
}
