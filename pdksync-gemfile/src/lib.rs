//! # pdksync-gemfile
//!
//! Gemfile dependency-pinning editor.
//!
//! [`update_file`] locates the declaration line for one gem and rewrites its
//! `branch:` / `ref:` / version sub-fields by regex substitution, or replaces
//! the whole line. The edit is planned as a [`GemUpdate`].

pub mod editor;
pub mod error;

pub use editor::{apply, find_gem_line, update_file, FieldEdit, GemField, GemUpdate, GEMFILE};
pub use error::GemfileError;
