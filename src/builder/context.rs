//! Build context: project, profile, resolved options and services.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::builder::backend::{Backend, BackendKind, BackendSettings};
use crate::builder::options::{BuildConfiguration, BuildRequest};
use crate::core::project::ProjectRoot;
use crate::sources::download::{Downloader, HttpDownloader};
use crate::util::config::{load_tools, ProjectConfig, ToolsConfig};
use crate::util::context::GlobalContext;
use crate::util::process::{find_executable, Executor, SystemExecutor};
use crate::util::shell::Shell;

/// Resolved paths of the external tools keel drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    pub cmake: PathBuf,
    pub ctest: PathBuf,
}

impl Tools {
    /// Resolve tools from configuration, falling back to a PATH lookup and
    /// finally to the bare name so the spawn error names the missing tool.
    pub fn resolve(config: &ToolsConfig) -> Self {
        Tools {
            cmake: resolve_tool(config.cmake.as_ref(), "cmake"),
            ctest: resolve_tool(config.ctest.as_ref(), "ctest"),
        }
    }
}

impl Default for Tools {
    fn default() -> Self {
        Tools {
            cmake: PathBuf::from("cmake"),
            ctest: PathBuf::from("ctest"),
        }
    }
}

fn resolve_tool(configured: Option<&PathBuf>, name: &str) -> PathBuf {
    if let Some(path) = configured {
        return path.clone();
    }
    find_executable(name).unwrap_or_else(|| PathBuf::from(name))
}

/// Per-invocation choices that shape a [`BuildContext`].
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Profile to use instead of the active one
    pub profile: Option<String>,

    /// Options given on the command line
    pub request: BuildRequest,

    pub insecure: bool,
}

/// Everything one invocation needs to drive packages.
#[derive(Clone)]
pub struct BuildContext {
    pub project: ProjectRoot,

    /// Active profile name
    pub profile: String,

    /// Profile options overlaid with this invocation's flags
    pub config: BuildConfiguration,

    pub tools: Tools,

    /// Ask the tools for verbose output
    pub verbose: bool,

    /// Download over plain http even when given https
    pub insecure: bool,

    pub executor: Arc<dyn Executor>,

    pub downloader: Arc<dyn Downloader>,
}

impl fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildContext")
            .field("project", &self.project)
            .field("profile", &self.profile)
            .field("config", &self.config)
            .field("tools", &self.tools)
            .field("verbose", &self.verbose)
            .field("insecure", &self.insecure)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Assemble the context for the project `gctx` points at: the selected
    /// profile overlaid with the invocation's options, resolved tools and the
    /// real process and download services.
    pub fn load(gctx: &GlobalContext, opts: &ContextOptions, shell: &Shell) -> Result<Self> {
        let project = gctx.project_root()?;
        let project_config = ProjectConfig::load(&project.config_path())?;

        let profile = opts
            .profile
            .clone()
            .unwrap_or_else(|| project_config.active.clone());
        let config = opts.request.resolve(project_config.profile(&profile)?)?;
        let tools = Tools::resolve(&load_tools(gctx.global_config_path(), &project_config));

        let executor: Arc<dyn Executor> = if shell.is_verbose() {
            Arc::new(SystemExecutor::streaming())
        } else {
            Arc::new(SystemExecutor::new())
        };
        let downloader = Arc::new(HttpDownloader::new(shell.show_progress())?);

        tracing::debug!("using profile `{}` in {}", profile, project.path().display());
        Ok(BuildContext {
            project,
            profile,
            config,
            tools,
            verbose: gctx.is_verbose(),
            insecure: opts.insecure,
            executor,
            downloader,
        })
    }

    pub fn build_dir(&self, name: &str) -> PathBuf {
        self.project.build_dir(&self.profile, name)
    }

    pub fn install_root(&self) -> PathBuf {
        self.project.install_root(&self.profile)
    }

    pub fn backend_settings(&self) -> BackendSettings {
        BackendSettings {
            install_root: self.install_root(),
            toolchain_path: self.project.toolchain_path(&self.profile),
            cmake: self.tools.cmake.clone(),
            ctest: self.tools.ctest.clone(),
            verbose: self.verbose,
            executor: Arc::clone(&self.executor),
        }
    }

    /// Instantiate the backend for `kind` in this context.
    pub fn backend(&self, kind: BackendKind) -> Backend {
        Backend::new(kind, self.backend_settings())
    }
}
