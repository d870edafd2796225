//! `keel list` command

use anyhow::Result;

use crate::GlobalOptions;
use keel::builder::{BuildContext, ContextOptions};
use keel::ops::list_packages;

pub fn execute(opts: &GlobalOptions) -> Result<()> {
    let ctx = BuildContext::load(
        &opts.gctx,
        &ContextOptions {
            profile: opts.profile.clone(),
            ..Default::default()
        },
        &opts.shell,
    )?;

    let packages = list_packages(&ctx)?;
    if packages.is_empty() {
        println!("No packages found");
        return Ok(());
    }

    let width = packages.iter().map(|p| p.name.len()).max().unwrap_or(0);
    for package in packages {
        let backend = package.backend.map(|b| b.as_str()).unwrap_or("-");
        println!(
            "{:<width$}  {:<6}  {}",
            package.name,
            backend,
            package.stage,
            width = width
        );
    }
    Ok(())
}
