//! `keel init` command

use anyhow::Result;

use crate::GlobalOptions;
use keel::ops::init_project;
use keel::util::shell::Status;

pub fn execute(opts: &GlobalOptions) -> Result<()> {
    let project = init_project(opts.gctx.init_dir())?;
    opts.shell.status(
        Status::Created,
        format!("keel project in {}", project.path().display()),
    );
    Ok(())
}
