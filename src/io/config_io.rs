use std::fs;
use std::path::Path;

use crate::io::project_io::ProjectError;
use crate::io::recovery::atomic_write;
use crate::model::config::ProjectConfig;

/// Read trellis.toml. A missing file is not an error: every section has a
/// default, so an absent config is simply the default config.
pub fn load_config(path: &Path) -> Result<ProjectConfig, ProjectError> {
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|e| ProjectError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: ProjectConfig = toml::from_str(&text)?;
    Ok(config)
}

/// Write the config back to disk.
pub fn save_config(path: &Path, config: &ProjectConfig) -> Result<(), ProjectError> {
    let text = toml::to_string_pretty(config)?;
    atomic_write(path, text.as_bytes()).map_err(|e| ProjectError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}
