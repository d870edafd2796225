//! Implementation of `keel config`: build profile management.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::builder::options::{BuildConfiguration, BuildRequest};
use crate::core::project::ProjectRoot;
use crate::util::config::ProjectConfig;

static PACKAGE_CONFIG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+?)(?:Config|-config)\.cmake$").expect("valid regex")
});

/// A profile as shown by `keel config`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    pub name: String,
    pub active: bool,
}

fn load(project: &ProjectRoot) -> Result<ProjectConfig> {
    ProjectConfig::load(&project.config_path())
}

fn save(project: &ProjectRoot, config: &ProjectConfig) -> Result<()> {
    config.save(&project.config_path())
}

/// Every profile, sorted by name.
pub fn list_profiles(project: &ProjectRoot) -> Result<Vec<ProfileEntry>> {
    let config = load(project)?;
    Ok(config
        .profiles
        .keys()
        .map(|name| ProfileEntry {
            name: name.clone(),
            active: *name == config.active,
        })
        .collect())
}

/// Store a new profile built from `request`.
pub fn add_profile(project: &ProjectRoot, name: &str, request: &BuildRequest) -> Result<()> {
    let mut config = load(project)?;
    let profile = request.resolve(&BuildConfiguration::default())?;
    config.add_profile(name, profile)?;
    save(project, &config)
}

/// Overlay `request` on a profile (the active one when `name` is `None`).
/// Returns the name of the updated profile.
pub fn set_profile(
    project: &ProjectRoot,
    name: Option<&str>,
    request: &BuildRequest,
) -> Result<String> {
    let mut config = load(project)?;
    let name = name.map(str::to_string).unwrap_or_else(|| config.active.clone());
    request.apply_to(config.profile_mut(&name)?)?;
    save(project, &config)?;
    Ok(name)
}

/// Make `name` the active profile.
pub fn use_profile(project: &ProjectRoot, name: &str) -> Result<()> {
    let mut config = load(project)?;
    config.use_profile(name)?;
    save(project, &config)
}

/// Find CMake package config files under `root`, keyed by package name.
pub fn find_package_configs(root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let mut found = BTreeMap::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        let Some(caps) = PACKAGE_CONFIG_RE.captures(&file_name) else {
            continue;
        };
        if let Some(dir) = entry.path().parent() {
            tracing::debug!("found package config {}", entry.path().display());
            found
                .entry(caps[1].to_string())
                .or_insert_with(|| dir.to_path_buf());
        }
    }

    Ok(found)
}

/// Record `<Name>_DIR` defines in the active profile for every package
/// config found under `root`. Returns the modules found.
pub fn scan_profile(project: &ProjectRoot, root: &Path) -> Result<BTreeMap<String, PathBuf>> {
    let found = find_package_configs(root)?;
    if found.is_empty() {
        return Ok(found);
    }

    let mut config = load(project)?;
    let active = config.active.clone();
    let profile = config.profile_mut(&active)?;
    for (name, dir) in &found {
        profile
            .defines
            .insert(format!("{}_DIR", name), dir.display().to_string());
    }
    save(project, &config)?;
    Ok(found)
}
