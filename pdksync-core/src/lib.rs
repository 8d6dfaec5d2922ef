//! pdksync core library: domain types, configuration, managed module list.
//!
//! - [`types`]: module names, steps, step arguments
//! - [`config`]: [`PdksyncConfig`] load / defaults
//! - [`modules`]: managed module list load / filter / enable / disable
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod modules;
pub mod types;

pub use config::PdksyncConfig;
pub use error::ConfigError;
pub use types::{ModuleName, RunRequest, Step, StepArgs, StepFields};
