//! Implementation of the stage-driving commands: `keel fetch`, `configure`,
//! `build`, `test`, `install` and `clean`.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::builder::backend::BackendKind;
use crate::builder::context::BuildContext;
use crate::core::descriptor::{DescriptorStore, PackageDescriptor};
use crate::core::errors::KeelError;
use crate::core::package::Package;
use crate::core::package_spec::PackageSpec;
use crate::util::hash::is_valid_sha256;
use crate::util::lock::FileLock;
use crate::util::shell::{format_duration, Shell, Status};

/// The lifecycle step a command asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOp {
    Fetch,
    Configure,
    Build { target: Option<String> },
    Test,
    Install,
    Clean,
}

impl PackageOp {
    fn status(&self) -> Status {
        match self {
            PackageOp::Fetch => Status::Fetching,
            PackageOp::Configure => Status::Configuring,
            PackageOp::Build { .. } => Status::Building,
            PackageOp::Test => Status::Testing,
            PackageOp::Install => Status::Installing,
            PackageOp::Clean => Status::Cleaned,
        }
    }

    fn done_status(&self) -> Status {
        match self {
            PackageOp::Install => Status::Installed,
            PackageOp::Clean => Status::Cleaned,
            _ => Status::Finished,
        }
    }
}

/// Overrides for how a package is fetched and built.
#[derive(Debug, Clone, Default)]
pub struct PackageOptions {
    /// Bind this backend instead of detecting one
    pub backend: Option<BackendKind>,

    /// Expected SHA-256 of the archive
    pub sha256: Option<String>,
}

/// Turn a command-line package argument into a [`Package`].
///
/// Known names load their descriptor. A source location creates a new
/// package unless one is already stored under the same name.
pub fn resolve_package(
    ctx: &BuildContext,
    spec: &str,
    cwd: &Path,
    opts: &PackageOptions,
) -> Result<Package> {
    let mut package = match PackageSpec::parse(spec, cwd)? {
        PackageSpec::Named(name) => Package::open(ctx, &name)?,
        PackageSpec::Source(source) => {
            if DescriptorStore::new(&ctx.project).exists(&source.name) {
                Package::open(ctx, &source.name)?
            } else {
                let descriptor = PackageDescriptor {
                    archive: Some(source.archive),
                    url: Some(source.url),
                    pinned: source.pinned,
                    ..Default::default()
                };
                Package::new(ctx, source.name, descriptor)
            }
        }
    };

    if let Some(kind) = opts.backend {
        package.set_backend(kind);
    }
    if let Some(sha256) = &opts.sha256 {
        if !is_valid_sha256(sha256) {
            return Err(KeelError::precondition(format!(
                "`{}` is not a SHA-256 checksum (expected 64 hex characters)",
                sha256
            ))
            .into());
        }
        package.set_sha256(sha256.to_lowercase());
    }

    Ok(package)
}

/// Run one lifecycle step on an already resolved package.
pub fn run_op(ctx: &BuildContext, package: &mut Package, op: &PackageOp) -> Result<()> {
    match op {
        PackageOp::Fetch => package.fetch(ctx),
        PackageOp::Configure => package.configure(ctx),
        PackageOp::Build { target } => package.build(ctx, target.as_deref()),
        PackageOp::Test => package.test(ctx),
        PackageOp::Install => package.install(ctx),
        PackageOp::Clean => package.clean(ctx),
    }
}

/// Resolve `spec` and drive it through `op` while holding its package lock.
pub fn drive_package(
    ctx: &BuildContext,
    spec: &str,
    cwd: &Path,
    op: &PackageOp,
    opts: &PackageOptions,
    shell: &Shell,
) -> Result<Package> {
    let mut package = resolve_package(ctx, spec, cwd, opts)?;
    let provisional = package.name().to_string();
    let lock_path = ctx.project.package_lock_path(&provisional);
    let lock = FileLock::try_exclusive(&lock_path)?;

    if *op != PackageOp::Clean {
        shell.status(op.status(), package.name());
    }
    let start = Instant::now();
    let result = run_op(ctx, &mut package, op);
    if package.name() != provisional {
        // nothing is registered under the provisional name any more
        drop(lock);
        if let Err(e) = std::fs::remove_file(&lock_path) {
            tracing::debug!("failed to remove {}: {}", lock_path.display(), e);
        }
    }
    result?;

    shell.status(
        op.done_status(),
        format!(
            "{} ({}) in {}",
            package.name(),
            package.stage(),
            format_duration(start.elapsed())
        ),
    );
    Ok(package)
}

/// Install each package in order, stopping at the first failure.
///
/// A failed package keeps whatever it produced so far; the user is pointed
/// at `keel clean` for a fresh start.
pub fn install_packages(
    ctx: &BuildContext,
    specs: &[String],
    cwd: &Path,
    opts: &PackageOptions,
    shell: &Shell,
) -> Result<Vec<Package>> {
    let mut installed = Vec::with_capacity(specs.len());

    for spec in specs {
        match drive_package(ctx, spec, cwd, &PackageOp::Install, opts, shell) {
            Ok(package) => installed.push(package),
            Err(err) => {
                if !installed.is_empty() {
                    let names: Vec<&str> = installed.iter().map(|p| p.name()).collect();
                    shell.note(format!("already installed: {}", names.join(", ")));
                }
                shell.note(format!(
                    "partial results were kept; run `keel clean {}` to start over",
                    spec
                ));
                return Err(err).with_context(|| format!("failed to install `{}`", spec));
            }
        }
    }

    Ok(installed)
}
