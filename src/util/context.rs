//! Global context for keel operations.
//!
//! Holds the handful of process-wide facts (working directory, output
//! flags, global config location) and turns them into an explicit
//! [`ProjectRoot`]. Nothing below the CLI reads the process working
//! directory directly.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::errors::KeelError;
use crate::core::project::ProjectRoot;
use crate::util::config::global_config_path;

/// Global context containing paths and output settings.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Project directory given with `--project-dir`, if any
    project_dir: Option<PathBuf>,

    /// Whether to use verbose output
    verbose: bool,

    /// Global config file (~/.keel/config.toml)
    global_config: Option<PathBuf>,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        GlobalContext {
            cwd,
            project_dir: None,
            verbose: false,
            global_config: global_config_path(),
        }
    }

    /// Use an explicit project directory instead of searching from cwd.
    pub fn set_project_dir(&mut self, dir: Option<PathBuf>) {
        self.project_dir = dir.map(|d| {
            if d.is_absolute() {
                d
            } else {
                self.cwd.join(d)
            }
        });
    }

    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn global_config_path(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    /// Directory a new project is created in.
    pub fn init_dir(&self) -> &Path {
        self.project_dir.as_deref().unwrap_or(&self.cwd)
    }

    /// Find the project root: the explicit project directory if one was
    /// given, otherwise the nearest ancestor of cwd containing `keel.toml`.
    pub fn project_root(&self) -> Result<ProjectRoot> {
        let found = match &self.project_dir {
            Some(dir) => Some(ProjectRoot::new(dir.clone())).filter(|p| p.is_initialized()),
            None => ProjectRoot::discover(&self.cwd),
        };

        found.ok_or_else(|| {
            KeelError::NotInitialized {
                dir: self.init_dir().to_path_buf(),
            }
            .into()
        })
    }
}
