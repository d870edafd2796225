//! Keel CLI - build and install native packages from source

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use keel::util::shell::{ColorChoice, Shell};
use keel::util::GlobalContext;

/// Options shared by every command.
pub struct GlobalOptions {
    pub shell: Shell,
    pub gctx: GlobalContext,
    /// Profile selected with `--profile` or `KEEL_PROFILE`
    pub profile: Option<String>,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "keel=debug"
    } else if cli.quiet {
        "keel=warn"
    } else {
        "keel=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    let mut gctx = GlobalContext::new()?;
    gctx.set_project_dir(cli.project_dir);
    gctx.set_verbose(cli.verbose);

    let opts = GlobalOptions {
        shell: Shell::from_flags(cli.quiet, cli.verbose, color),
        gctx,
        profile: cli.profile,
    };

    match cli.command {
        Commands::Init => commands::init::execute(&opts),
        Commands::Fetch(args) => commands::package::fetch(args, &opts),
        Commands::Configure(args) => commands::package::configure(args, &opts),
        Commands::Build(args) => commands::package::build(args, &opts),
        Commands::Install(args) => commands::package::install(args, &opts),
        Commands::Test(args) => commands::package::test(args, &opts),
        Commands::Clean(args) => commands::package::clean(args, &opts),
        Commands::Remove(args) => commands::remove::execute(args, &opts),
        Commands::List => commands::list::execute(&opts),
        Commands::Config(args) => commands::config::execute(args, &opts),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
