//! The pdk fields of a module's `metadata.json`.

use std::path::Path;

use serde::Deserialize;

use crate::error::{io_err, StepError};

pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModuleMetadata {
    #[serde(rename = "pdk-version")]
    pub pdk_version: Option<String>,
    #[serde(rename = "template-ref")]
    pub template_ref: Option<String>,
    #[serde(rename = "template-url")]
    pub template_url: Option<String>,
}

/// Read `<module_dir>/metadata.json`. A module without one has no pdk fields.
pub fn read_metadata(module_dir: &Path) -> Result<ModuleMetadata, StepError> {
    let path = module_dir.join(METADATA_FILE);
    if !path.exists() {
        return Ok(ModuleMetadata::default());
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_json::from_str(&raw).map_err(|e| StepError::Metadata { path, source: e })
}
