//! Package descriptors.
//!
//! Each package known to a project has a JSON record at
//! `packages/<name>.json` holding where it came from, the backend bound to
//! it and, per profile, how far it has progressed and which files its
//! install step produced.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::backend::BackendKind;
use crate::core::errors::KeelError;
use crate::core::package::Stage;
use crate::core::project::ProjectRoot;
use crate::util::fs::{read_to_string, write_atomic};

const DESCRIPTOR_EXT: &str = "json";

/// State of a package under one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileRecord {
    pub stage: Stage,

    /// Files the install step added, relative to the install root
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub installed_files: Vec<PathBuf>,
}

/// Persisted record of a package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageDescriptor {
    /// Archive file name in the cache
    pub archive: Option<String>,

    /// Where the archive is retrieved from
    pub url: Option<String>,

    /// Bound backend, if any
    pub backend: Option<BackendKind>,

    /// Expected SHA-256 of the archive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// The name was chosen by the user and survives backend detection
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pinned: bool,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ProfileRecord>,
}

impl PackageDescriptor {
    pub fn record(&self, profile: &str) -> ProfileRecord {
        self.profiles.get(profile).cloned().unwrap_or_default()
    }

    pub fn record_mut(&mut self, profile: &str) -> &mut ProfileRecord {
        self.profiles.entry(profile.to_string()).or_default()
    }
}

/// Directory of package descriptors.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    dir: PathBuf,
}

impl DescriptorStore {
    pub fn new(project: &ProjectRoot) -> Self {
        DescriptorStore {
            dir: project.packages_dir(),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, DESCRIPTOR_EXT))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    pub fn load(&self, name: &str) -> Result<PackageDescriptor> {
        let path = self.path(name);
        if !path.is_file() {
            return Err(KeelError::PackageNotFound {
                name: name.to_string(),
            }
            .into());
        }
        let contents = read_to_string(&path)?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse package descriptor: {}", path.display()))
    }

    /// Write the descriptor, replacing any previous one atomically.
    pub fn save(&self, name: &str, descriptor: &PackageDescriptor) -> Result<()> {
        let json = serde_json::to_string_pretty(descriptor)
            .context("failed to serialize package descriptor")?;
        write_atomic(&self.path(name), json.as_bytes())
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.path(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    /// Names of every stored package, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }

        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&self.dir.to_string_lossy()),
            DESCRIPTOR_EXT
        );
        let mut names = Vec::new();
        for entry in glob::glob(&pattern).context("invalid descriptor pattern")? {
            let path = entry?;
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
