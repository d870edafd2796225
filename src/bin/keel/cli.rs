//! CLI definitions using clap.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use keel::builder::{BackendKind, BuildRequest};
use keel::builder::options::parse_define;

/// Keel - build and install native packages from source
#[derive(Parser)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (tool output is streamed)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Project directory (defaults to the nearest directory with keel.toml)
    #[arg(long, global = true, env = "KEEL_PROJECT_DIR", value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Build profile to use instead of the active one
    #[arg(long, global = true, env = "KEEL_PROFILE", value_name = "NAME")]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a keel project in the current (or --project-dir) directory
    Init,

    /// Download and unpack a package's sources
    Fetch(PackageArgs),

    /// Configure a package, fetching it first if needed
    Configure(PackageArgs),

    /// Build a package
    Build(BuildArgs),

    /// Build and install packages into the profile's install root
    Install(InstallArgs),

    /// Run a package's test suite
    Test(PackageArgs),

    /// Delete a package's source and build directories
    Clean(CleanArgs),

    /// Uninstall packages and forget them
    Remove(RemoveArgs),

    /// List packages and their stage
    List,

    /// Manage build profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Build options that overlay the selected profile.
#[derive(Args, Debug, Clone, Default)]
pub struct BuildOpts {
    /// CMake generator
    #[arg(short = 'G', long, env = "KEEL_GENERATOR")]
    pub generator: Option<String>,

    /// CMake toolchain file to include
    #[arg(short = 't', long, value_name = "FILE")]
    pub toolchain: Option<PathBuf>,

    /// C++ compiler
    #[arg(long)]
    pub cxx: Option<String>,

    /// Extra C++ compiler flags
    #[arg(long, allow_hyphen_values = true)]
    pub cxxflags: Option<String>,

    /// Extra linker flags
    #[arg(long, allow_hyphen_values = true)]
    pub ldflags: Option<String>,

    /// C++ language standard (e.g. c++17)
    #[arg(long = "std", value_name = "STD")]
    pub language_standard: Option<String>,

    /// Define a CMake variable (a bare NAME means ON)
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", value_parser = parse_define)]
    pub defines: Vec<(String, String)>,

    /// Build static libraries
    #[arg(long = "static")]
    pub static_linkage: bool,

    /// Build shared libraries
    #[arg(long = "shared")]
    pub shared_linkage: bool,

    /// Build the debug variant
    #[arg(long)]
    pub debug: bool,

    /// Build the release variant
    #[arg(long)]
    pub release: bool,

    /// Enable package test suites
    #[arg(long = "test")]
    pub testing: bool,
}

impl BuildOpts {
    /// Convert to a [`BuildRequest`], resolving the toolchain file against `cwd`.
    pub fn to_request(&self, cwd: &Path) -> BuildRequest {
        BuildRequest {
            generator: self.generator.clone(),
            toolchain_file: self.toolchain.as_ref().map(|t| cwd.join(t)),
            compiler: self.cxx.clone(),
            compiler_flags: self.cxxflags.clone(),
            linker_flags: self.ldflags.clone(),
            language_standard: self.language_standard.clone(),
            defines: self.defines.iter().cloned().collect(),
            static_linkage: self.static_linkage,
            shared_linkage: self.shared_linkage,
            debug: self.debug,
            release: self.release,
            testing: self.testing,
        }
    }
}

/// How a package is obtained.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceOpts {
    /// Build backend to use instead of detecting one
    #[arg(long)]
    pub backend: Option<BackendKind>,

    /// Expected SHA-256 of the archive
    #[arg(long, value_name = "HEX")]
    pub sha256: Option<String>,

    /// Download https URLs over plain http
    #[arg(long)]
    pub insecure: bool,
}

#[derive(Args)]
pub struct PackageArgs {
    /// Package name, NAME,URL, owner/repo, URL or archive path
    pub package: String,

    #[command(flatten)]
    pub source: SourceOpts,

    #[command(flatten)]
    pub build: BuildOpts,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub package: PackageArgs,

    /// Build only this target
    #[arg(short = 'T', long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Packages to install, in order
    #[arg(required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub source: SourceOpts,

    #[command(flatten)]
    pub build: BuildOpts,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Package name
    pub package: String,
}

#[derive(Args)]
pub struct RemoveArgs {
    /// Packages to remove
    #[arg(required = true)]
    pub packages: Vec<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommand>,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Add a profile built from the given options
    Add {
        /// Profile name
        name: String,

        #[command(flatten)]
        build: BuildOpts,
    },

    /// Update a profile (the active one unless --profile is given)
    Set {
        #[command(flatten)]
        build: BuildOpts,
    },

    /// Make a profile the active one
    Use {
        /// Profile name
        name: String,
    },

    /// Record <Name>_DIR for every CMake package config found under a path
    Scan {
        /// Directory to search
        path: PathBuf,
    },
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}
