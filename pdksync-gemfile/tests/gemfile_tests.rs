//! File-level Gemfile edits against a pinned `puppet_litmus` declaration.
//!
//! Each `#[case]` gets an isolated `TempDir`: no shared state.

use std::fs;
use std::path::PathBuf;

use pdksync_gemfile::{update_file, GemField, GemUpdate, GemfileError, GEMFILE};
use rstest::rstest;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

const PINNED_LINE: &str = "gem 'puppet_litmus', git: 'https://github.com/puppetlabs/puppet_litmus.git', branch: 'master', ref: '04da90638f5b5fd7f007123c8c0cc551c8cb3e54', '=0.1.0'";

fn module_with_gemfile() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(GEMFILE);
    let contents = format!(
        "source ENV['GEM_SOURCE'] || 'https://rubygems.org'\n\ngroup :development do\n  gem 'puppet-module-posix-default-r2.5', require: false\n  {PINNED_LINE}\nend\n"
    );
    fs::write(&path, contents).expect("write Gemfile");
    (dir, path)
}

fn read(path: &PathBuf) -> String {
    fs::read_to_string(path).expect("read Gemfile")
}

// ---------------------------------------------------------------------------
// Invalid finders
// ---------------------------------------------------------------------------

#[rstest]
#[case(GemField::Sha, "jsjsjsjsjsjsjs", "abcdefgjhkk")]
#[case(GemField::Version, "<= 0.4.9", "<= 1.4.11")]
#[case(GemField::Branch, "jsjsjsjsjsjsjs", "abcdefgjhkk")]
fn missing_finder_fails_and_leaves_file_alone(
    #[case] field: GemField,
    #[case] finder: &str,
    #[case] replacer: &str,
) {
    let (_dir, path) = module_with_gemfile();
    let before = read(&path);

    let update = GemUpdate::new("puppet_litmus").with_edit(field, finder, replacer);
    let err = update_file(&path, &update).unwrap_err();
    assert!(
        matches!(err, GemfileError::FinderNotFound { field: f, .. } if f == field),
        "got: {err}"
    );
    assert_eq!(read(&path), before, "failed edit must not rewrite the file");
}

#[test]
fn missing_gemfile_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(GEMFILE);
    let update = GemUpdate::new("puppet_litmus")
        .with_line("gem 'puppet_litmus', git: 'https://github.com/test/puppet_litmus.git'");
    let err = update_file(&path, &update).unwrap_err();
    assert!(matches!(err, GemfileError::Io { .. }), "got: {err}");
    assert!(err.to_string().contains("Gemfile"));
}

#[test]
fn absent_gem_is_reported() {
    let (_dir, path) = module_with_gemfile();
    let update = GemUpdate::new("rspec-puppet").with_edit(GemField::Branch, "master", "main");
    let err = update_file(&path, &update).unwrap_err();
    assert!(matches!(err, GemfileError::GemNotFound { .. }), "got: {err}");
}

// ---------------------------------------------------------------------------
// Valid edits
// ---------------------------------------------------------------------------

#[rstest]
#[case(GemField::Branch, "master", "install_modules_with_puppetfile")]
#[case(GemField::Sha, "04da90638f5b5fd7f007123c8c0cc551c8cb3e54", "af33ece9e400f0cf7b556f0440627cffe969e03b")]
#[case(GemField::Version, "=0.1.0", "<=0.3.0")]
fn valid_pair_replaces_text(#[case] field: GemField, #[case] finder: &str, #[case] replacer: &str) {
    let (_dir, path) = module_with_gemfile();
    let update = GemUpdate::new("puppet_litmus").with_edit(field, finder, replacer);
    update_file(&path, &update).expect("update");

    let after = read(&path);
    assert!(after.contains(replacer), "missing {replacer} in:\n{after}");
    assert!(!after.contains(&format!("'{finder}'")), "{finder} still present in:\n{after}");
}

#[test]
fn whole_line_replacement_is_verbatim() {
    let (_dir, path) = module_with_gemfile();
    let line = "gem 'puppet_litmus', git: 'https://github.com/puppetlabs/puppet_litmus.git'";
    update_file(&path, &GemUpdate::new("puppet_litmus").with_line(line)).expect("update");

    let after = read(&path);
    assert!(after.contains(&format!("\n{line}\n")));
    assert!(!after.contains("04da90638f5b5fd7f007123c8c0cc551c8cb3e54"));
    assert!(after.contains("gem 'puppet-module-posix-default-r2.5', require: false"));
}

#[test]
fn line_then_field_edits_compose() {
    let (_dir, path) = module_with_gemfile();
    let update = GemUpdate::new("puppet_litmus")
        .with_line("  gem 'puppet_litmus', git: 'https://github.com/puppetlabs/puppet_litmus.git', branch: 'main'")
        .with_edit(GemField::Branch, "main", "release");
    update_file(&path, &update).expect("update");
    assert!(read(&path).contains("branch: 'release'"));
}

#[test]
fn no_tmp_file_left_behind() {
    let (dir, path) = module_with_gemfile();
    let update = GemUpdate::new("puppet_litmus").with_edit(GemField::Branch, "master", "main");
    update_file(&path, &update).expect("update");
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty(), "tmp files left: {leftovers:?}");
}
