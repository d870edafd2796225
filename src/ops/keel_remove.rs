//! Implementation of `keel remove`.

use anyhow::Result;

use crate::builder::context::BuildContext;
use crate::core::errors::KeelError;
use crate::core::package::Package;
use crate::util::lock::FileLock;
use crate::util::shell::{Shell, Status};

/// Uninstall and forget the named packages. Every name is checked before
/// anything is removed. Returns the number of files uninstalled.
pub fn remove_packages(ctx: &BuildContext, names: &[String], shell: &Shell) -> Result<usize> {
    let packages = names
        .iter()
        .map(|name| Package::open(ctx, name))
        .collect::<Result<Vec<_>>>()?;

    if packages.is_empty() {
        return Err(KeelError::precondition("no packages given to remove").into());
    }

    let mut removed = 0;
    for package in packages {
        let name = package.name().to_string();
        let _lock = FileLock::try_exclusive(&ctx.project.package_lock_path(&name))?;
        let files = package.remove(ctx)?;
        shell.status(Status::Removed, format!("{} ({} file(s))", name, files));
        removed += files;
    }

    Ok(removed)
}
