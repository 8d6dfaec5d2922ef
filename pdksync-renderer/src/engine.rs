//! Tera rendering engine: [`TemplateKind`] enum and [`Renderer`].
//!
//! | Kind          | Template name               | Used by         |
//! |---------------|-----------------------------|-----------------|
//! | PrTitle       | `pr_title.tera`             | `create_pr`     |
//! | PrBody        | `pr_body.tera`              | `create_pr`     |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use crate::context::PrContext;
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates: baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    ("pr_title.tera", include_str!("templates/pr_title.tera")),
    ("pr_body.tera", include_str!("templates/pr_body.tera")),
];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((normalize_template_name(rel), contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    // Plain-text output; PR bodies are markdown, not HTML.
    tera.autoescape_on(vec![]);
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateKind
// ---------------------------------------------------------------------------

/// Every text pdksync renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateKind {
    PrTitle,
    PrBody,
}

impl TemplateKind {
    pub fn all() -> &'static [TemplateKind] {
        &[TemplateKind::PrTitle, TemplateKind::PrBody]
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            TemplateKind::PrTitle => "pr_title.tera",
            TemplateKind::PrBody => "pr_body.tera",
        }
    }

    /// Titles are collapsed to their first non-empty line.
    fn single_line(&self) -> bool {
        matches!(self, TemplateKind::PrTitle)
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Tera renderer with embedded defaults and optional user overrides.
///
/// `.tera` files in the override directory replace the embedded template of
/// the same name. Create once per run and reuse.
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Construct a [`Renderer`] with embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Self::with_overrides(None)
    }

    /// Construct a [`Renderer`], loading overrides from `user_template_dir`.
    pub fn with_overrides(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer {
            tera: build_tera(user_template_dir)?,
        })
    }

    /// Render one template. Line endings are normalised to LF.
    pub fn render(&self, kind: TemplateKind, ctx: &PrContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let rendered = self
            .tera
            .render(kind.template_name(), &tera_ctx)?
            .replace("\r\n", "\n");

        if kind.single_line() {
            let line = rendered
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .unwrap_or_default();
            return Ok(line.to_string());
        }
        Ok(rendered.trim_end().to_string() + "\n")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pdksync_core::{ModuleName, PdksyncConfig};
    use tempfile::TempDir;

    fn ctx() -> PrContext {
        PrContext::new(
            &PdksyncConfig::default(),
            &ModuleName::from("puppetlabs-motd"),
            "My amazing PR",
            "pdksync_main-abc123",
        )
        .with_pdk(Some("2.7.1"), Some("heads/main-0-gabc123"), None)
    }

    #[test]
    fn renderer_new_succeeds() {
        Renderer::new().expect("Renderer::new should succeed with embedded templates");
    }

    #[test]
    fn all_kinds_render_without_error() {
        let renderer = Renderer::new().unwrap();
        for kind in TemplateKind::all() {
            let out = renderer
                .render(*kind, &ctx())
                .unwrap_or_else(|e| panic!("render failed for {kind:?}: {e}"));
            assert!(!out.is_empty(), "{kind:?} rendered empty");
        }
    }

    #[test]
    fn title_prefixes_additional_title() {
        let renderer = Renderer::new().unwrap();
        let plain = renderer.render(TemplateKind::PrTitle, &ctx()).unwrap();
        assert_eq!(plain, "My amazing PR");

        let prefixed = renderer
            .render(
                TemplateKind::PrTitle,
                &ctx().with_additional_title(Some("(MAINT)")),
            )
            .unwrap();
        assert_eq!(prefixed, "(MAINT) - My amazing PR");
    }

    #[test]
    fn body_carries_pdk_details() {
        let renderer = Renderer::new().unwrap();
        let body = renderer.render(TemplateKind::PrBody, &ctx()).unwrap();
        assert!(body.contains("`2.7.1`"));
        assert!(body.contains("`heads/main-0-gabc123`"));
        assert!(body.contains("puppetlabs/puppetlabs-motd"));
        assert!(!body.contains("template url"));
        assert!(!body.contains('\r'));
    }

    #[test]
    fn user_override_replaces_embedded_template() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pr_title.tera"), "[{{ module }}] {{ pr_title }}").unwrap();
        let renderer = Renderer::with_overrides(Some(dir.path())).unwrap();
        let title = renderer.render(TemplateKind::PrTitle, &ctx()).unwrap();
        assert_eq!(title, "[puppetlabs-motd] My amazing PR");
    }

    #[test]
    fn missing_override_dir_is_ignored() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        Renderer::with_overrides(Some(&missing)).expect("absent dir falls back to embedded");
    }
}
