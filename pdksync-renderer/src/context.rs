//! Template context: serializable rendering payload for one module's PR.

use serde::{Deserialize, Serialize};

use pdksync_core::{ModuleName, PdksyncConfig};

use crate::error::RenderError;

/// Placeholder used when `metadata.json` carries no pdk information.
pub const UNKNOWN: &str = "unknown";

/// Values available to the PR title and body templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrContext {
    pub module: String,
    /// `<namespace>/<module>`.
    pub repo: String,
    pub pr_title: String,
    pub additional_title: Option<String>,
    pub branch_name: String,
    pub base_branch: String,
    pub pdk_version: String,
    pub template_ref: String,
    pub template_url: Option<String>,
}

impl PrContext {
    /// Build a context for `module` with every pdk field set to [`UNKNOWN`].
    pub fn new(config: &PdksyncConfig, module: &ModuleName, pr_title: &str, branch_name: &str) -> Self {
        Self {
            module: module.0.clone(),
            repo: config.repo_name(module),
            pr_title: pr_title.to_string(),
            additional_title: None,
            branch_name: branch_name.to_string(),
            base_branch: config.create_pr_against.clone(),
            pdk_version: UNKNOWN.to_string(),
            template_ref: UNKNOWN.to_string(),
            template_url: None,
        }
    }

    pub fn with_additional_title(mut self, additional_title: Option<&str>) -> Self {
        self.additional_title = additional_title
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_pdk(
        mut self,
        pdk_version: Option<&str>,
        template_ref: Option<&str>,
        template_url: Option<&str>,
    ) -> Self {
        if let Some(v) = pdk_version {
            self.pdk_version = v.to_string();
        }
        if let Some(r) = template_ref {
            self.template_ref = r.to_string();
        }
        self.template_url = template_url.map(str::to_string);
        self
    }

    /// Convert to a [`tera::Context`].
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}
