//! The build backend contract.
//!
//! A backend knows how to recognize a source tree and how to drive one
//! family of third-party build tools through configure, build, install and
//! test. The set of backends is closed: [`Backend`] enumerates them and
//! [`BackendKind`] is the tag persisted in package descriptors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::builder::boost::BoostBackend;
use crate::builder::cmake::CMakeBackend;
use crate::builder::options::BuildConfiguration;
use crate::util::process::{Executor, ProcessOutput};

/// Tag identifying a backend variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// A CMake project (`CMakeLists.txt`).
    #[serde(rename = "cmake")]
    CMake,
    /// A Boost-style tree that bootstraps its own `b2` driver.
    #[serde(rename = "boost")]
    Boost,
}

impl BackendKind {
    /// Detection order used by the backend selector. A tree that matches
    /// more than one variant binds to the earliest.
    pub const DETECTION_ORDER: [BackendKind; 2] = [BackendKind::CMake, BackendKind::Boost];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::CMake => "cmake",
            BackendKind::Boost => "boost",
        }
    }

    /// Name the sources in `source_dir` declare for this variant, if they
    /// look like this variant at all.
    pub fn detect(&self, source_dir: &Path) -> Option<String> {
        match self {
            BackendKind::CMake => crate::builder::cmake::project_name(source_dir),
            BackendKind::Boost => crate::builder::boost::detect(source_dir),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cmake" => Ok(BackendKind::CMake),
            "boost" | "b2" => Ok(BackendKind::Boost),
            _ => Err(format!(
                "unknown backend '{}'; expected 'cmake' or 'boost'",
                s
            )),
        }
    }
}

/// Everything a backend needs besides the per-call paths and options.
#[derive(Clone)]
pub struct BackendSettings {
    /// Shared install prefix of the active profile
    pub install_root: PathBuf,

    /// Where the generated CMake toolchain file is written
    pub toolchain_path: PathBuf,

    pub cmake: PathBuf,

    pub ctest: PathBuf,

    /// Ask the tools for verbose output
    pub verbose: bool,

    pub executor: Arc<dyn Executor>,
}

impl fmt::Debug for BackendSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSettings")
            .field("install_root", &self.install_root)
            .field("toolchain_path", &self.toolchain_path)
            .field("cmake", &self.cmake)
            .field("ctest", &self.ctest)
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

/// Capability interface shared by every backend variant.
///
/// Backends hold no state between calls beyond their settings; every
/// operation receives the source directory, the build directory and the
/// resolved configuration explicitly.
pub trait BuildBackend {
    fn kind(&self) -> BackendKind;

    /// Name the sources in `source_dir` declare, if this backend recognizes
    /// them.
    fn detect(&self, source_dir: &Path) -> Option<String> {
        self.kind().detect(source_dir)
    }

    fn configure(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()>;

    /// Build, optionally restricted to one target.
    fn build(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        target: Option<&str>,
    ) -> Result<()>;

    fn install(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()>;

    fn test(&self, source_dir: &Path, build_dir: &Path, config: &BuildConfiguration)
        -> Result<()>;
}

/// The closed set of backends.
#[derive(Debug)]
pub enum Backend {
    CMake(CMakeBackend),
    Boost(BoostBackend),
}

impl Backend {
    pub fn new(kind: BackendKind, settings: BackendSettings) -> Self {
        match kind {
            BackendKind::CMake => Backend::CMake(CMakeBackend::new(settings)),
            BackendKind::Boost => Backend::Boost(BoostBackend::new(settings)),
        }
    }

    fn inner(&self) -> &dyn BuildBackend {
        match self {
            Backend::CMake(b) => b,
            Backend::Boost(b) => b,
        }
    }
}

impl BuildBackend for Backend {
    fn kind(&self) -> BackendKind {
        self.inner().kind()
    }

    fn configure(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        self.inner().configure(source_dir, build_dir, config)
    }

    fn build(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        target: Option<&str>,
    ) -> Result<()> {
        self.inner().build(source_dir, build_dir, config, target)
    }

    fn install(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        self.inner().install(source_dir, build_dir, config)
    }

    fn test(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        self.inner().test(source_dir, build_dir, config)
    }
}

/// Label used for a package in error messages: the source directory name.
pub(crate) fn package_label(source_dir: &Path) -> String {
    source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| source_dir.display().to_string())
}

/// Echo a failed tool's captured stderr so the user sees why it failed.
pub(crate) fn echo_stderr(output: &ProcessOutput) {
    if !output.stderr.trim().is_empty() {
        eprint!("{}", output.stderr);
    }
}
