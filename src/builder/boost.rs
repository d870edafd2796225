//! Boost backend.
//!
//! Boost ships its own build driver, `b2`, which a bootstrap script at the
//! root of the source tree compiles in place. Build and install both go
//! through `b2` with the source tree as working directory.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::backend::{
    echo_stderr, package_label, BackendKind, BackendSettings, BuildBackend,
};
use crate::builder::options::{BuildConfiguration, Linkage};
use crate::core::errors::KeelError;
use crate::util::process::ProcessBuilder;

/// Name every Boost tree is registered under.
pub const BOOST_NAME: &str = "boost";

const BOOTSTRAP_SH: &str = "bootstrap.sh";
const BOOTSTRAP_BAT: &str = "bootstrap.bat";

/// Generator names containing this select the MSVC toolset.
const MSVC_GENERATOR_MARKER: &str = "Visual Studio";

/// Generator names ending in this select a 64-bit build.
const WIN64_SUFFIX: &str = "Win64";

/// `boost` if `source_dir` carries a bootstrap script.
pub fn detect(source_dir: &Path) -> Option<String> {
    let has_script =
        source_dir.join(BOOTSTRAP_SH).is_file() || source_dir.join(BOOTSTRAP_BAT).is_file();
    has_script.then(|| BOOST_NAME.to_string())
}

fn driver_path(source_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        source_dir.join("b2.exe")
    } else {
        source_dir.join("b2")
    }
}

/// BootstrappedLibrary backend for Boost sources.
#[derive(Debug, Clone)]
pub struct BoostBackend {
    settings: BackendSettings,
}

impl BoostBackend {
    pub fn new(settings: BackendSettings) -> Self {
        BoostBackend { settings }
    }

    fn bootstrap_command(&self, source_dir: &Path) -> ProcessBuilder {
        let cmd = if cfg!(windows) {
            ProcessBuilder::new(source_dir.join(BOOTSTRAP_BAT))
        } else {
            ProcessBuilder::new("sh").arg(source_dir.join(BOOTSTRAP_SH))
        };
        cmd.cwd(source_dir)
    }

    fn driver_command(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        install: bool,
    ) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(driver_path(source_dir))
            .arg(format!("--prefix={}", self.settings.install_root.display()))
            .arg(format!("--build-dir={}", build_dir.display()))
            .arg(format!("variant={}", config.variant.as_lower()));

        if let Some(generator) = &config.generator {
            if generator.contains(MSVC_GENERATOR_MARKER) {
                cmd = cmd.arg("toolset=msvc");
            }
            if generator.ends_with(WIN64_SUFFIX) {
                cmd = cmd.arg("address-model=64").arg("architecture=x86");
            }
        }

        match config.linkage {
            Linkage::Static => cmd = cmd.arg("link=static"),
            Linkage::Shared => cmd = cmd.arg("link=shared"),
            Linkage::Unspecified => {}
        }

        if let Some(flags) = &config.compiler_flags {
            cmd = cmd.arg(format!("cxxflags={}", flags));
        }
        if let Some(flags) = &config.linker_flags {
            cmd = cmd.arg(format!("linkflags={}", flags));
        }

        cmd.arg(if install { "install" } else { "stage" })
            .cwd(source_dir)
    }

    fn run_driver(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        install: bool,
    ) -> Result<()> {
        if !driver_path(source_dir).exists() {
            tracing::debug!("b2 not found in {}, bootstrapping", source_dir.display());
            self.configure(source_dir, build_dir, config)?;
        }

        let cmd = self.driver_command(source_dir, build_dir, config, install);
        let output = self.settings.executor.run(&cmd)?;
        if output.success() {
            return Ok(());
        }

        echo_stderr(&output);
        let package = package_label(source_dir);
        let command = cmd.display_command();
        let err = if install {
            KeelError::Install {
                package,
                command,
                code: output.code,
            }
        } else {
            KeelError::Build {
                package,
                command,
                code: output.code,
            }
        };
        Err(err.into())
    }
}

impl BuildBackend for BoostBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Boost
    }

    fn configure(
        &self,
        source_dir: &Path,
        _build_dir: &Path,
        _config: &BuildConfiguration,
    ) -> Result<()> {
        let cmd = self.bootstrap_command(source_dir);
        let output = self.settings.executor.run(&cmd)?;
        if !output.success() {
            echo_stderr(&output);
            return Err(KeelError::Configure {
                package: package_label(source_dir),
                command: cmd.display_command(),
                code: output.code,
            }
            .into());
        }
        Ok(())
    }

    /// `b2 stage`; a target selection is not supported by b2 and is ignored.
    fn build(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
        target: Option<&str>,
    ) -> Result<()> {
        if let Some(target) = target {
            tracing::warn!("ignoring target `{}` for a Boost build", target);
        }
        self.run_driver(source_dir, build_dir, config, false)
    }

    fn install(
        &self,
        source_dir: &Path,
        build_dir: &Path,
        config: &BuildConfiguration,
    ) -> Result<()> {
        self.run_driver(source_dir, build_dir, config, true)
    }

    fn test(
        &self,
        source_dir: &Path,
        _build_dir: &Path,
        _config: &BuildConfiguration,
    ) -> Result<()> {
        Err(KeelError::precondition(format!(
            "`{}` is built with b2, which has no test operation",
            package_label(source_dir)
        ))
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::builder::options::Variant;
    use crate::test_support::{fixtures, MockExecutor, MockProcessOutput};
    use tempfile::TempDir;

    fn backend(tmp: &Path, executor: Arc<MockExecutor>) -> BoostBackend {
        BoostBackend::new(fixtures::backend_settings(tmp, executor))
    }

    #[test]
    fn test_detect() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(detect(tmp.path()), None);

        std::fs::write(tmp.path().join(BOOTSTRAP_BAT), "").unwrap();
        assert_eq!(detect(tmp.path()).as_deref(), Some("boost"));
    }

    #[test]
    fn test_install_bootstraps_when_driver_missing() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/boost");
        fixtures::boost_tree(&src);

        let exec = Arc::new(MockExecutor::new().with_default(MockProcessOutput::success("")));
        let boost = backend(tmp.path(), exec.clone());

        let config = BuildConfiguration {
            variant: Variant::Debug,
            linkage: Linkage::Static,
            ..Default::default()
        };
        let bd = tmp.path().join("build/boost");
        boost.install(&src, &bd, &config).unwrap();

        let calls = exec.commands();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].display_command().contains(BOOTSTRAP_SH) || cfg!(windows));

        let args = calls[1].get_args();
        assert_eq!(calls[1].get_program(), driver_path(&src));
        assert_eq!(calls[1].get_cwd(), Some(src.as_path()));
        assert!(args.contains(&format!(
            "--prefix={}",
            tmp.path().join("install-default").display()
        )));
        assert!(args.contains(&format!("--build-dir={}", bd.display())));
        assert!(args.contains(&"variant=debug".to_string()));
        assert!(args.contains(&"link=static".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("install"));
    }

    #[test]
    fn test_build_stages_with_existing_driver() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("boost");
        fixtures::boost_tree(&src);
        std::fs::write(driver_path(&src), "").unwrap();

        let exec = Arc::new(MockExecutor::new().with_default(MockProcessOutput::success("")));
        let boost = backend(tmp.path(), exec.clone());

        let config = BuildConfiguration {
            generator: Some("Visual Studio 15 2017 Win64".to_string()),
            ..Default::default()
        };
        boost
            .build(&src, &tmp.path().join("bd"), &config, None)
            .unwrap();

        let calls = exec.commands();
        assert_eq!(calls.len(), 1);
        let args = calls[0].get_args();
        assert!(args.contains(&"toolset=msvc".to_string()));
        assert!(args.contains(&"address-model=64".to_string()));
        assert!(args.contains(&"architecture=x86".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("link=")));
        assert_eq!(args.last().map(String::as_str), Some("stage"));
    }

    #[test]
    fn test_bootstrap_failure() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("boost");
        fixtures::boost_tree(&src);

        let exec = Arc::new(MockExecutor::new().with_default(MockProcessOutput::failure(1, "")));
        let boost = backend(tmp.path(), exec);

        let err = boost
            .install(&src, &tmp.path().join("bd"), &BuildConfiguration::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::Configure { .. })
        ));
    }

    #[test]
    fn test_has_no_test_operation() {
        let tmp = TempDir::new().unwrap();
        let exec = Arc::new(MockExecutor::new());
        let boost = backend(tmp.path(), exec.clone());

        let err = boost
            .test(tmp.path(), tmp.path(), &BuildConfiguration::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::Precondition { .. })
        ));
        assert!(exec.calls().is_empty());
    }
}
