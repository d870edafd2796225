//! CMake backend.
//!
//! Drives an existing CMake project: configure into a per-profile build
//! directory, build through `cmake --build`, install through the `install`
//! target and test through `check` with a `ctest` fallback.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::builder::backend::{
    echo_stderr, package_label, BackendKind, BackendSettings, BuildBackend,
};
use crate::builder::options::BuildConfiguration;
use crate::builder::toolchain;
use crate::core::errors::KeelError;
use crate::util::fs::{ensure_dir, remove_dir_all_if_exists};
use crate::util::process::{available_jobs, ProcessBuilder, ProcessOutput};

/// Project descriptor at the root of a CMake source tree.
pub const PROJECT_FILE: &str = "CMakeLists.txt";

/// Cache written by a previous configure.
pub const CACHE_FILE: &str = "CMakeCache.txt";

const GENERATOR_KEY: &str = "CMAKE_GENERATOR:INTERNAL";

/// Present in the build directory when the generator understands `-j`.
const MAKEFILE_MARKER: &str = "Makefile";

/// Build-integrated test target tried before falling back to ctest.
const CHECK_TARGET: &str = "check";

const DIAGNOSTIC_LOGS: [&str; 2] = ["CMakeFiles/CMakeOutput.log", "CMakeFiles/CMakeError.log"];

static PROJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*project\s*\(\s*([\w-]+)").expect("valid regex"));

static CACHE_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([\w:]+)=(.*?)\s*$").expect("valid regex"));

/// Name declared by the first `project()` call in `source_dir`'s
/// `CMakeLists.txt`, lower-cased.
pub fn project_name(source_dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(source_dir.join(PROJECT_FILE)).ok()?;
    parse_project_name(&text)
}

fn parse_project_name(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        PROJECT_RE
            .captures(&line.to_lowercase())
            .map(|caps| caps[1].to_string())
    })
}

/// Parse the `KEY:TYPE=VALUE` lines of a CMake cache.
fn parse_cache(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with("//"))
        .filter_map(|line| {
            CACHE_ENTRY_RE
                .captures(line)
                .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        })
        .collect()
}

/// Generator recorded by a previous configure in `build_dir`.
pub fn cached_generator(build_dir: &Path) -> Option<String> {
    let text = std::fs::read_to_string(build_dir.join(CACHE_FILE)).ok()?;
    parse_cache(&text).remove(GENERATOR_KEY)
}

/// What a configure may reuse from an existing build directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildDirState {
    Missing,
    Reusable,
    /// Configured with another generator; CMake cannot switch in place.
    GeneratorChanged,
}

fn build_dir_state(build_dir: &Path, generator: Option<&str>) -> BuildDirState {
    if !build_dir.exists() {
        return BuildDirState::Missing;
    }
    match generator {
        None => BuildDirState::Reusable,
        Some(requested) => match cached_generator(build_dir) {
            Some(previous) if previous == requested => BuildDirState::Reusable,
            _ => BuildDirState::GeneratorChanged,
        },
    }
}

/// ToolProject backend for CMake sources.
#[derive(Debug, Clone)]
pub struct CMakeBackend {
    settings: BackendSettings,
}

impl CMakeBackend {
    pub fn new(settings: BackendSettings) -> Self {
        CMakeBackend { settings }
    }

    fn configure_command(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.settings.cmake)
            .arg(format!(
                "-DCMAKE_INSTALL_PREFIX={}",
                self.settings.install_root.display()
            ))
            .arg(format!(
                "-DCMAKE_TOOLCHAIN_FILE={}",
                self.settings.toolchain_path.display()
            ));

        if self.settings.verbose {
            cmd = cmd.arg("-DCMAKE_VERBOSE_MAKEFILE=On");
        }

        cmd = cmd
            .arg(format!(
                "-DBUILD_TESTING={}",
                if config.testing { "On" } else { "Off" }
            ))
            .arg(format!("-DCMAKE_BUILD_TYPE={}", config.variant));

        for (key, value) in &config.defines {
            cmd = cmd.arg(format!("-D{}={}", key, value));
        }

        if let Some(generator) = &config.generator {
            cmd = cmd.arg("-G").arg(generator);
        }

        cmd.arg(source_dir).cwd(build_dir)
    }

    fn build_command(
        &self,
        build_dir: &Path,
        config: &BuildConfiguration,
        target: Option<&str>,
    ) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.settings.cmake)
            .arg("--build")
            .arg(build_dir)
            .arg("--config")
            .arg(config.variant.as_str());

        if let Some(target) = target {
            cmd = cmd.arg("--target").arg(target);
        }

        if build_dir.join(MAKEFILE_MARKER).exists() {
            cmd = cmd.arg("--").arg(format!("-j{}", available_jobs()));
            if self.settings.verbose {
                cmd = cmd.arg("VERBOSE=1");
            }
        }

        cmd
    }

    fn test_runner_command(&self, build_dir: &Path, config: &BuildConfiguration) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.settings.ctest);
        if self.settings.verbose {
            cmd = cmd.arg("-VV");
        }
        cmd.arg("-C").arg(config.variant.as_str()).cwd(build_dir)
    }

    /// Run a command; on failure print its stderr and the configure logs.
    fn run_reporting(&self, cmd: &ProcessBuilder, build_dir: &Path) -> Result<ProcessOutput> {
        let output = self.settings.executor.run(cmd)?;
        if !output.success() {
            echo_stderr(&output);
            show_diagnostic_logs(build_dir);
        }
        Ok(output)
    }
}

impl BuildBackend for CMakeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::CMake
    }

    fn configure(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        if build_dir_state(build_dir, config.generator.as_deref())
            == BuildDirState::GeneratorChanged
        {
            tracing::info!(
                "generator changed, recreating build directory {}",
                build_dir.display()
            );
            remove_dir_all_if_exists(build_dir)?;
        }
        ensure_dir(build_dir)?;

        toolchain::write(
            &self.settings.toolchain_path,
            config,
            &self.settings.install_root,
        )?;

        let cmd = self.configure_command(source_dir, build_dir, config);
        let output = self.run_reporting(&cmd, build_dir)?;
        if !output.success() {
            return Err(KeelError::Configure {
                package: package_label(source_dir),
                command: cmd.display_command(),
                code: output.code,
            }
            .into());
        }

        Ok(())
    }

    fn build(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        target: Option<&str>,
    ) -> Result<()> {
        let cmd = self.build_command(build_dir, config, target);
        let output = self.run_reporting(&cmd, build_dir)?;
        if !output.success() {
            return Err(KeelError::Build {
                package: package_label(source_dir),
                command: cmd.display_command(),
                code: output.code,
            }
            .into());
        }
        Ok(())
    }

    fn install(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        let cmd = self.build_command(build_dir, config, Some("install"));
        let output = self.run_reporting(&cmd, build_dir)?;
        if !output.success() {
            return Err(KeelError::Install {
                package: package_label(source_dir),
                command: cmd.display_command(),
                code: output.code,
            }
            .into());
        }
        Ok(())
    }

    fn test(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        let check = self.build_command(build_dir, config, Some(CHECK_TARGET));
        match self.settings.executor.run(&check) {
            Ok(output) if output.success() => return Ok(()),
            Ok(output) => tracing::debug!(
                "`{}` exited with {:?}, falling back to ctest",
                check.display_command(),
                output.code
            ),
            Err(e) => tracing::debug!("`{}` failed: {:#}", check.display_command(), e),
        }

        let cmd = self.test_runner_command(build_dir, config);
        let output = self.run_reporting(&cmd, build_dir)?;
        if !output.success() {
            return Err(KeelError::Test {
                package: package_label(source_dir),
                command: cmd.display_command(),
                code: output.code,
            }
            .into());
        }
        Ok(())
    }
}

/// Print CMake's configure logs verbatim, if any were written.
fn show_diagnostic_logs(build_dir: &Path) {
    if let Err(e) = write_diagnostic_logs(build_dir, &mut io::stderr().lock()) {
        tracing::debug!("failed to print configure logs: {}", e);
    }
}

fn write_diagnostic_logs(build_dir: &Path, out: &mut impl Write) -> io::Result<()> {
    for log in DIAGNOSTIC_LOGS {
        let path = build_dir.join(log);
        if let Ok(contents) = std::fs::read_to_string(&path) {
            writeln!(out, "--- {} ---", path.display())?;
            writeln!(out, "{}", contents)?;
        }
    }
    Ok(())
}
