//! Configuration file support for keel.
//!
//! keel reads two configuration files:
//! - Global: `~/.keel/config.toml` - user-wide tool locations
//! - Project: `keel.toml` - build profiles and project tool overrides
//!
//! Project config takes precedence over global config.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::options::BuildConfiguration;
use crate::core::errors::KeelError;
use crate::util::fs::write_atomic;

/// Name of the profile created by `keel init`.
pub const DEFAULT_PROFILE: &str = "default";

/// Locations of external tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Path to the cmake executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmake: Option<PathBuf>,

    /// Path to the ctest executable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctest: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn is_empty(&self) -> bool {
        self.cmake.is_none() && self.ctest.is_none()
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: &ToolsConfig) {
        if other.cmake.is_some() {
            self.cmake = other.cmake.clone();
        }
        if other.ctest.is_some() {
            self.ctest = other.ctest.clone();
        }
    }
}

/// Project configuration stored in `keel.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Name of the active profile
    pub active: String,

    #[serde(skip_serializing_if = "ToolsConfig::is_empty")]
    pub tools: ToolsConfig,

    /// Named build profiles
    pub profiles: BTreeMap<String, BuildConfiguration>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(DEFAULT_PROFILE.to_string(), BuildConfiguration::default());
        ProjectConfig {
            active: DEFAULT_PROFILE.to_string(),
            tools: ToolsConfig::default(),
            profiles,
        }
    }
}

impl ProjectConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents =
            toml::to_string_pretty(self).context("failed to serialize project config")?;
        write_atomic(path, contents.as_bytes())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Result<&BuildConfiguration> {
        self.profiles.get(name).ok_or_else(|| {
            KeelError::ProfileNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    pub fn profile_mut(&mut self, name: &str) -> Result<&mut BuildConfiguration> {
        self.profiles.get_mut(name).ok_or_else(|| {
            KeelError::ProfileNotFound {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// Add a new profile. The first profile of an empty project becomes
    /// active.
    pub fn add_profile(&mut self, name: &str, config: BuildConfiguration) -> Result<()> {
        if self.profiles.contains_key(name) {
            return Err(KeelError::ProfileExists {
                name: name.to_string(),
            }
            .into());
        }
        if self.profiles.is_empty() {
            self.active = name.to_string();
        }
        self.profiles.insert(name.to_string(), config);
        Ok(())
    }

    /// Make `name` the active profile.
    pub fn use_profile(&mut self, name: &str) -> Result<()> {
        self.profile(name)?;
        self.active = name.to_string();
        Ok(())
    }
}

/// User-wide configuration stored in `~/.keel/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub tools: ToolsConfig,
}

impl GlobalConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist
    /// or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }
}

/// Get the global keel config directory (~/.keel).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".keel"))
}

/// Get the global config path (~/.keel/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Resolve tool settings.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`keel.toml`)
/// 2. Global config (`~/.keel/config.toml`)
/// 3. PATH lookup at use time
pub fn load_tools(global_path: Option<&Path>, project: &ProjectConfig) -> ToolsConfig {
    let mut tools = ToolsConfig::default();

    if let Some(path) = global_path {
        tools.merge(&GlobalConfig::load_or_default(path).tools);
    }

    tools.merge(&project.tools);
    tools
}
