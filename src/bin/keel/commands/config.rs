//! `keel config` command

use anyhow::Result;

use crate::cli::{ConfigArgs, ConfigCommand};
use crate::GlobalOptions;
use keel::ops::{add_profile, list_profiles, scan_profile, set_profile, use_profile};
use keel::util::shell::Status;

pub fn execute(args: ConfigArgs, opts: &GlobalOptions) -> Result<()> {
    let project = opts.gctx.project_root()?;
    let cwd = opts.gctx.cwd();

    match args.command {
        None => {
            for profile in list_profiles(&project)? {
                let marker = if profile.active { "* " } else { "  " };
                println!("{}{}", marker, profile.name);
            }
        }
        Some(ConfigCommand::Add { name, build }) => {
            add_profile(&project, &name, &build.to_request(cwd))?;
            opts.shell.status(Status::Created, format!("profile `{}`", name));
        }
        Some(ConfigCommand::Set { build }) => {
            let name = set_profile(&project, opts.profile.as_deref(), &build.to_request(cwd))?;
            opts.shell.status(Status::Updated, format!("profile `{}`", name));
        }
        Some(ConfigCommand::Use { name }) => {
            use_profile(&project, &name)?;
            opts.shell.status(Status::Info, format!("using profile `{}`", name));
        }
        Some(ConfigCommand::Scan { path }) => {
            let root = cwd.join(path);
            let found = scan_profile(&project, &root)?;
            if found.is_empty() {
                opts.shell.warn(format!(
                    "no CMake package configs found under {}",
                    root.display()
                ));
                return Ok(());
            }
            for (name, dir) in &found {
                opts.shell
                    .status(Status::Info, format!("{}_DIR = {}", name, dir.display()));
            }
            opts.shell.status(
                Status::Finished,
                format!("found {} package config(s)", found.len()),
            );
        }
    }
    Ok(())
}
