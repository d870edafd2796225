//! Package lifecycle.
//!
//! A [`Package`] ties a name to its archive, its bound backend and its
//! [`Stage`] under the active profile. Every operation performs whatever
//! earlier step is missing (configure fetches, build and install configure)
//! and persists the descriptor once it succeeds.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::builder::backend::{BackendKind, BuildBackend};
use crate::builder::context::BuildContext;
use crate::builder::select::select;
use crate::core::descriptor::{DescriptorStore, PackageDescriptor};
use crate::core::errors::KeelError;
use crate::core::project::is_package_dir_name;
use crate::sources::archive::{ArchiveFetcher, FetchRequest};
use crate::util::fs::{
    ensure_dir, move_dir, prune_empty_dirs, remove_dir_all_if_exists, snapshot_files,
};
use crate::util::lock::FileLock;

/// Position of a package in its lifecycle. Ordered: a later stage implies
/// every earlier one was reached.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Clean,
    Fetched,
    Configured,
    Built,
    Installed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::Fetched => "fetched",
            Stage::Configured => "configured",
            Stage::Built => "built",
            Stage::Installed => "installed",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One package of a project.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    descriptor: PackageDescriptor,
    stage: Stage,
    /// Lock on the detected name, taken when fetch renames the package
    name_lock: Option<Arc<FileLock>>,
}

impl Package {
    /// Create a package from a descriptor, reconciling its recorded stage
    /// with what is on disk.
    pub fn new(ctx: &BuildContext, name: impl Into<String>, descriptor: PackageDescriptor) -> Self {
        let mut package = Package {
            name: name.into(),
            descriptor,
            stage: Stage::Clean,
            name_lock: None,
        };
        package.stage = package.reconciled_stage(ctx);
        package
    }

    /// Load a stored package.
    pub fn open(ctx: &BuildContext, name: &str) -> Result<Self> {
        let descriptor = DescriptorStore::new(&ctx.project).load(name)?;
        Ok(Package::new(ctx, name, descriptor))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.descriptor.backend
    }

    /// Bind `kind` regardless of what detection finds.
    pub fn set_backend(&mut self, kind: BackendKind) {
        self.descriptor.backend = Some(kind);
    }

    /// Require the archive to hash to `sha256`.
    pub fn set_sha256(&mut self, sha256: impl Into<String>) {
        self.descriptor.sha256 = Some(sha256.into());
    }

    pub fn source_dir(&self, ctx: &BuildContext) -> PathBuf {
        ctx.project.source_dir(&self.name)
    }

    pub fn build_dir(&self, ctx: &BuildContext) -> PathBuf {
        ctx.build_dir(&self.name)
    }

    /// Whether the source directory holds this package's sources.
    pub fn is_fetched(&self, ctx: &BuildContext) -> bool {
        let src = self.source_dir(ctx);
        if !src.is_dir() {
            return false;
        }
        match select(&src) {
            Some(selection) => selection.name == self.name || self.descriptor.pinned,
            None => self.descriptor.pinned && self.descriptor.backend.is_some(),
        }
    }

    fn reconciled_stage(&self, ctx: &BuildContext) -> Stage {
        if !self.is_fetched(ctx) {
            return Stage::Clean;
        }
        if !self.build_dir(ctx).is_dir() {
            return Stage::Fetched;
        }
        self.descriptor.record(&ctx.profile).stage.max(Stage::Fetched)
    }

    /// Place the sources in `src/<name>` and bind a backend.
    pub fn fetch(&mut self, ctx: &BuildContext) -> Result<()> {
        if self.is_fetched(ctx) {
            tracing::info!("{} is already fetched", self.name);
            return self.advance(ctx, Stage::Fetched);
        }

        let archive = self.descriptor.archive.clone().ok_or_else(|| {
            KeelError::precondition(format!("package `{}` has no archive to fetch", self.name))
        })?;

        tracing::info!("Fetching {}", self.name);
        let fetcher = ArchiveFetcher::new(&ctx.project, ctx.downloader.as_ref());
        let src = fetcher.fetch(&FetchRequest {
            url: self.descriptor.url.as_deref(),
            archive: &archive,
            dest_name: &self.name,
            sha256: self.descriptor.sha256.as_deref(),
            insecure: ctx.insecure,
        })?;

        self.bind_backend(ctx, src)?;

        // new sources invalidate whatever was configured from the old ones
        self.stage = Stage::Fetched;
        self.save(ctx)?;
        tracing::info!(
            "Sources placed in {}",
            self.source_dir(ctx).display()
        );
        Ok(())
    }

    fn bind_backend(&mut self, ctx: &BuildContext, src: PathBuf) -> Result<()> {
        match select(&src) {
            Some(selection) => {
                if self.descriptor.backend.is_none() {
                    self.descriptor.backend = Some(selection.kind);
                }
                if !self.descriptor.pinned && selection.name != self.name {
                    self.rename(ctx, selection.name)?;
                }
                Ok(())
            }
            None if self.descriptor.backend.is_some() => Ok(()),
            None => Err(KeelError::BackendUnresolved { path: src }.into()),
        }
    }

    /// Adopt the name the sources declare.
    fn rename(&mut self, ctx: &BuildContext, name: String) -> Result<()> {
        if !is_package_dir_name(&name) {
            return Err(KeelError::precondition(format!(
                "sources declare the unusable package name `{}`",
                name
            ))
            .into());
        }
        // `src/<name>` is replaced below; nobody else may be driving it
        let lock = FileLock::try_exclusive(&ctx.project.package_lock_path(&name))?;
        tracing::info!("Package name is {}", name);

        let store = DescriptorStore::new(&ctx.project);
        let from = ctx.project.source_dir(&self.name);
        let to = ctx.project.source_dir(&name);
        remove_dir_all_if_exists(&to)?;
        move_dir(&from, &to)?;

        store.remove(&self.name)?;
        if store.exists(&name) {
            // keep the install records of the package we are replacing
            self.descriptor.profiles = store.load(&name)?.profiles;
        }
        self.name = name;
        self.name_lock = Some(Arc::new(lock));
        Ok(())
    }

    fn backend(&self, ctx: &BuildContext) -> Result<crate::builder::backend::Backend> {
        let kind = self.descriptor.backend.ok_or_else(|| KeelError::BackendUnresolved {
            path: self.source_dir(ctx),
        })?;
        Ok(ctx.backend(kind))
    }

    pub fn configure(&mut self, ctx: &BuildContext) -> Result<()> {
        if !self.is_fetched(ctx) {
            self.fetch(ctx)?;
        }

        let backend = self.backend(ctx)?;
        let bd = self.build_dir(ctx);
        ensure_dir(&bd)?;

        tracing::info!("Configuring {}", self.name);
        backend.configure(&self.source_dir(ctx), &bd, &ctx.config)?;
        self.advance(ctx, Stage::Configured)
    }

    fn ensure_configured(&mut self, ctx: &BuildContext) -> Result<()> {
        if self.stage < Stage::Configured || !self.build_dir(ctx).is_dir() {
            self.configure(ctx)?;
        }
        Ok(())
    }

    /// Build the package, or only `target` when given.
    pub fn build(&mut self, ctx: &BuildContext, target: Option<&str>) -> Result<()> {
        self.ensure_configured(ctx)?;

        tracing::info!("Building {}", self.name);
        let backend = self.backend(ctx)?;
        backend.build(
            &self.source_dir(ctx),
            &self.build_dir(ctx),
            &ctx.config,
            target,
        )?;
        self.advance(ctx, Stage::Built)
    }

    pub fn test(&mut self, ctx: &BuildContext) -> Result<()> {
        self.ensure_configured(ctx)?;

        tracing::info!("Testing {}", self.name);
        let backend = self.backend(ctx)?;
        backend.test(&self.source_dir(ctx), &self.build_dir(ctx), &ctx.config)?;
        self.save(ctx)
    }

    /// Install into the profile's install root, recording the files the
    /// install step added.
    pub fn install(&mut self, ctx: &BuildContext) -> Result<()> {
        self.ensure_configured(ctx)?;
        let backend = self.backend(ctx)?;

        let install_root = ctx.install_root();
        let _lock = FileLock::exclusive(&ctx.project.install_lock_path(&ctx.profile))?;
        let before = snapshot_files(&install_root)?;

        tracing::info!("Installing {}", self.name);
        backend.install(&self.source_dir(ctx), &self.build_dir(ctx), &ctx.config)?;

        let after = snapshot_files(&install_root)?;
        let record = self.descriptor.record_mut(&ctx.profile);
        let files: BTreeSet<PathBuf> = record
            .installed_files
            .drain(..)
            .chain(after.difference(&before).cloned())
            .collect();
        tracing::debug!("{} installed {} file(s)", self.name, files.len());
        record.installed_files = files.into_iter().collect();

        self.advance(ctx, Stage::Installed)
    }

    /// Delete the build and source directories.
    pub fn clean(&mut self, ctx: &BuildContext) -> Result<()> {
        tracing::info!("Removing build and source directories of {}", self.name);
        remove_dir_all_if_exists(&self.build_dir(ctx))?;
        remove_dir_all_if_exists(&self.source_dir(ctx))?;

        self.stage = Stage::Clean;
        if !DescriptorStore::new(&ctx.project).exists(&self.name) {
            tracing::debug!("{} was never recorded, nothing to save", self.name);
            return Ok(());
        }
        self.save(ctx)
    }

    /// Uninstall from every profile, delete sources and build directories
    /// and forget the package. Returns the number of files uninstalled.
    pub fn remove(self, ctx: &BuildContext) -> Result<usize> {
        let mut removed = 0;

        for (profile, record) in &self.descriptor.profiles {
            let install_root = ctx.project.install_root(profile);
            if !record.installed_files.is_empty() && install_root.is_dir() {
                let _lock = FileLock::exclusive(&ctx.project.install_lock_path(profile))?;
                for file in &record.installed_files {
                    let path = install_root.join(file);
                    if path.is_file() || path.is_symlink() {
                        std::fs::remove_file(&path)?;
                        removed += 1;
                    }
                    if let Some(parent) = path.parent() {
                        prune_empty_dirs(parent, &install_root);
                    }
                }
            }
            remove_dir_all_if_exists(&ctx.project.build_dir(profile, &self.name))?;
        }

        remove_dir_all_if_exists(&ctx.build_dir(&self.name))?;
        remove_dir_all_if_exists(&self.source_dir(ctx))?;
        DescriptorStore::new(&ctx.project).remove(&self.name)?;

        tracing::info!("Removed {} ({} file(s) uninstalled)", self.name, removed);
        Ok(removed)
    }

    fn advance(&mut self, ctx: &BuildContext, stage: Stage) -> Result<()> {
        self.stage = self.stage.max(stage);
        self.save(ctx)
    }

    /// Persist the descriptor with the current stage.
    pub fn save(&mut self, ctx: &BuildContext) -> Result<()> {
        self.descriptor.record_mut(&ctx.profile).stage = self.stage;
        DescriptorStore::new(&ctx.project).save(&self.name, &self.descriptor)
    }
}
