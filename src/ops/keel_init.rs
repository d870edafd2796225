//! Implementation of `keel init`.

use std::path::Path;

use anyhow::Result;

use crate::core::errors::KeelError;
use crate::core::project::ProjectRoot;
use crate::util::config::ProjectConfig;
use crate::util::fs::ensure_dir;

/// Initialize a keel project in `dir`, creating the directory if needed.
pub fn init_project(dir: &Path) -> Result<ProjectRoot> {
    let project = ProjectRoot::new(dir);
    if project.is_initialized() {
        return Err(KeelError::AlreadyInitialized {
            dir: dir.to_path_buf(),
        }
        .into());
    }

    ensure_dir(dir)?;
    ProjectConfig::default().save(&project.config_path())?;

    for sub in [
        project.src_dir(),
        project.archive_dir(),
        project.packages_dir(),
    ] {
        ensure_dir(&sub)?;
    }

    tracing::debug!("initialized project at {}", dir.display());
    Ok(project)
}
