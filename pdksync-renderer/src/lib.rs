//! # pdksync-renderer
//!
//! Tera-based templates for the text pdksync writes on a module's behalf:
//! pull request titles and bodies.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pdksync_renderer::{PrContext, Renderer, TemplateKind};
//!
//! fn title(ctx: &PrContext) -> Option<String> {
//!     let renderer = Renderer::new().ok()?;
//!     renderer.render(TemplateKind::PrTitle, ctx).ok()
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::PrContext;
pub use engine::{Renderer, TemplateKind};
pub use error::RenderError;
