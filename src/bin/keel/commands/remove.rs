//! `keel remove` command

use anyhow::Result;

use crate::cli::RemoveArgs;
use crate::GlobalOptions;
use keel::builder::{BuildContext, ContextOptions};
use keel::ops::remove_packages;

pub fn execute(args: RemoveArgs, opts: &GlobalOptions) -> Result<()> {
    let ctx = BuildContext::load(
        &opts.gctx,
        &ContextOptions {
            profile: opts.profile.clone(),
            ..Default::default()
        },
        &opts.shell,
    )?;

    remove_packages(&ctx, &args.packages, &opts.shell)?;
    Ok(())
}
