use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::calendar::CalendarService;
use crate::model::color::Color;
use crate::model::task::Task;
use crate::parse::{parse_project, serialize_project};

/// Error type for project I/O operations
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("could not read {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config: {0}")]
    ConfigParseError(#[from] toml::de::Error),
    #[error("could not serialize config: {0}")]
    ConfigSerializeError(#[from] toml::ser::Error),
}

/// A loaded task list plus whatever had to be defaulted or re-anchored on
/// the way in. Warnings also land in the recovery log next to the file.
#[derive(Debug)]
pub struct LoadedProject {
    pub tasks: Vec<Task>,
    pub warnings: Vec<String>,
}

/// Load a project file. Parse problems never fail the load; they surface as
/// warnings with defaults applied. Only I/O failures are errors.
pub fn load_project(
    path: &Path,
    calendar: &CalendarService,
    default_color: Color,
) -> Result<LoadedProject, ProjectError> {
    let source = fs::read_to_string(path).map_err(|e| ProjectError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let outcome = parse_project(
        &source,
        calendar,
        default_color,
        Local::now().date_naive(),
    );
    // Losing a log line must not fail the load.
    let _ = crate::io::recovery::log_warnings(path, &outcome.warnings);
    Ok(LoadedProject {
        tasks: outcome.tasks,
        warnings: outcome.warnings,
    })
}

/// Save the task list. The write is atomic: a failed save leaves any
/// previous file — and the in-memory state — untouched.
pub fn save_project(path: &Path, tasks: &[Task]) -> Result<(), ProjectError> {
    let content = serialize_project(tasks);
    crate::io::recovery::atomic_write(path, content.as_bytes()).map_err(|e| {
        ProjectError::WriteError {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
