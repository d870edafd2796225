//! `keel fetch`, `configure`, `build`, `test`, `install` and `clean` commands

use anyhow::Result;

use crate::cli::{BuildArgs, BuildOpts, CleanArgs, InstallArgs, PackageArgs, SourceOpts};
use crate::GlobalOptions;
use keel::builder::{BuildContext, ContextOptions};
use keel::ops::{drive_package, install_packages, PackageOp, PackageOptions};

fn load_context(opts: &GlobalOptions, build: &BuildOpts, source: &SourceOpts) -> Result<BuildContext> {
    let ctx_opts = ContextOptions {
        profile: opts.profile.clone(),
        request: build.to_request(opts.gctx.cwd()),
        insecure: source.insecure,
    };
    BuildContext::load(&opts.gctx, &ctx_opts, &opts.shell)
}

fn package_options(source: &SourceOpts) -> PackageOptions {
    PackageOptions {
        backend: source.backend,
        sha256: source.sha256.clone(),
    }
}

fn drive(args: PackageArgs, op: PackageOp, opts: &GlobalOptions) -> Result<()> {
    let ctx = load_context(opts, &args.build, &args.source)?;
    drive_package(
        &ctx,
        &args.package,
        opts.gctx.cwd(),
        &op,
        &package_options(&args.source),
        &opts.shell,
    )?;
    Ok(())
}

pub fn fetch(args: PackageArgs, opts: &GlobalOptions) -> Result<()> {
    drive(args, PackageOp::Fetch, opts)
}

pub fn configure(args: PackageArgs, opts: &GlobalOptions) -> Result<()> {
    drive(args, PackageOp::Configure, opts)
}

pub fn build(args: BuildArgs, opts: &GlobalOptions) -> Result<()> {
    drive(args.package, PackageOp::Build { target: args.target }, opts)
}

pub fn test(args: PackageArgs, opts: &GlobalOptions) -> Result<()> {
    drive(args, PackageOp::Test, opts)
}

pub fn clean(args: CleanArgs, opts: &GlobalOptions) -> Result<()> {
    let ctx = load_context(opts, &BuildOpts::default(), &SourceOpts::default())?;
    drive_package(
        &ctx,
        &args.package,
        opts.gctx.cwd(),
        &PackageOp::Clean,
        &PackageOptions::default(),
        &opts.shell,
    )?;
    Ok(())
}

pub fn install(args: InstallArgs, opts: &GlobalOptions) -> Result<()> {
    let ctx = load_context(opts, &args.build, &args.source)?;
    install_packages(
        &ctx,
        &args.packages,
        opts.gctx.cwd(),
        &package_options(&args.source),
        &opts.shell,
    )?;
    Ok(())
}
