//! # pdksync-steps
//!
//! The step pipeline.
//!
//! Call [`run`] (or build a [`Pipeline`]) with a [`RunRequest`] to validate
//! the request's arguments and then perform each requested step against every
//! managed module, in order. The returned [`RunReport`] records what each step
//! did.
//!
//! [`RunRequest`]: pdksync_core::RunRequest

pub mod error;
pub mod exec;
pub mod metadata;
pub mod pipeline;
pub mod plan;
pub mod report;
mod steps;

pub use error::StepError;
pub use pipeline::{run, run_partial, Pipeline};
pub use plan::{validate_request, ModuleType, Plan};
pub use report::{ModuleReport, Outcome, RunReport, StepOutcome};
pub use steps::TEST_REPORT;
