use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

/// Append-only log next to the project file, for values that were defaulted
/// or relationships that could not be restored on load.
pub const RECOVERY_LOG_NAME: &str = "trellis-recovery.log";

/// Write via a temp file in the same directory, then rename into place.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Path of the recovery log for a given project file.
pub fn log_path_for(project_path: &Path) -> PathBuf {
    project_path
        .parent()
        .unwrap_or(Path::new("."))
        .join(RECOVERY_LOG_NAME)
}

/// Append load warnings for a project file. Best-effort: callers typically
/// ignore the result, since losing a log line must never fail a load.
pub fn log_warnings(project_path: &Path, warnings: &[String]) -> io::Result<()> {
    if warnings.is_empty() {
        return Ok(());
    }
    let mut entry = format!(
        "## {} — load: {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
        project_path.display()
    );
    for warning in warnings {
        entry.push_str("- ");
        entry.push_str(warning);
        entry.push('\n');
    }
    entry.push('\n');

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path_for(project_path))?;
    file.write_all(entry.as_bytes())?;
    Ok(())
}
