//! Build configuration.
//!
//! A [`BuildConfiguration`] is stored as a named profile in `keel.toml` and
//! is overlaid with the flags given on a single invocation ([`BuildRequest`])
//! to produce the options handed to every backend call.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::errors::KeelError;

/// Library linkage requested from the build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Static,
    Shared,
    /// Leave the choice to the package.
    #[default]
    Unspecified,
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linkage::Static => write!(f, "static"),
            Linkage::Shared => write!(f, "shared"),
            Linkage::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Build variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Debug,
    #[default]
    Release,
}

impl Variant {
    /// Name as CMake spells it (`CMAKE_BUILD_TYPE`, `--config`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Debug => "Debug",
            Variant::Release => "Release",
        }
    }

    /// Lower-cased name, as b2 expects it.
    pub fn as_lower(&self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Variant::Debug),
            "release" => Ok(Variant::Release),
            _ => Err(format!(
                "invalid variant '{}'; expected 'debug' or 'release'",
                s
            )),
        }
    }
}

/// The resolved options passed into every backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfiguration {
    /// CMake generator, e.g. `Ninja` or `Unix Makefiles`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,

    /// User toolchain file, included from the generated one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toolchain_file: Option<PathBuf>,

    /// C++ compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_flags: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub linker_flags: Option<String>,

    /// C++ language standard, e.g. `17`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_standard: Option<String>,

    pub linkage: Linkage,

    pub variant: Variant,

    /// Configure packages with their test suites enabled
    pub testing: bool,

    /// Extra `-D` definitions
    pub defines: BTreeMap<String, String>,
}

/// Build options given on a single invocation.
///
/// Linkage and variant each come from a pair of mutually exclusive flags;
/// [`BuildRequest::validate`] rejects a request that sets both of a pair
/// before anything else sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub generator: Option<String>,
    pub toolchain_file: Option<PathBuf>,
    pub compiler: Option<String>,
    pub compiler_flags: Option<String>,
    pub linker_flags: Option<String>,
    pub language_standard: Option<String>,
    pub defines: BTreeMap<String, String>,
    pub static_linkage: bool,
    pub shared_linkage: bool,
    pub debug: bool,
    pub release: bool,
    pub testing: bool,
}

impl BuildRequest {
    /// Reject mutually exclusive flag pairs.
    pub fn validate(&self) -> Result<()> {
        if self.static_linkage && self.shared_linkage {
            return Err(KeelError::ConflictingOptions {
                first: "--static",
                second: "--shared",
            }
            .into());
        }
        if self.debug && self.release {
            return Err(KeelError::ConflictingOptions {
                first: "--debug",
                second: "--release",
            }
            .into());
        }
        Ok(())
    }

    pub fn linkage(&self) -> Option<Linkage> {
        if self.static_linkage {
            Some(Linkage::Static)
        } else if self.shared_linkage {
            Some(Linkage::Shared)
        } else {
            None
        }
    }

    pub fn variant(&self) -> Option<Variant> {
        if self.debug {
            Some(Variant::Debug)
        } else if self.release {
            Some(Variant::Release)
        } else {
            None
        }
    }

    /// Overlay this request onto `config` in place.
    pub fn apply_to(&self, config: &mut BuildConfiguration) -> Result<()> {
        self.validate()?;

        if let Some(generator) = &self.generator {
            config.generator = Some(generator.clone());
        }
        if let Some(toolchain) = &self.toolchain_file {
            config.toolchain_file = Some(toolchain.clone());
        }
        if let Some(compiler) = &self.compiler {
            config.compiler = Some(compiler.clone());
        }
        if let Some(flags) = &self.compiler_flags {
            config.compiler_flags = Some(flags.clone());
        }
        if let Some(flags) = &self.linker_flags {
            config.linker_flags = Some(flags.clone());
        }
        if let Some(std) = &self.language_standard {
            config.language_standard = Some(std.clone());
        }
        if let Some(linkage) = self.linkage() {
            config.linkage = linkage;
        }
        if let Some(variant) = self.variant() {
            config.variant = variant;
        }
        if self.testing {
            config.testing = true;
        }
        for (key, value) in &self.defines {
            config.defines.insert(key.clone(), value.clone());
        }

        Ok(())
    }

    /// Resolve the configuration for this invocation on top of a profile.
    pub fn resolve(&self, profile: &BuildConfiguration) -> Result<BuildConfiguration> {
        let mut config = profile.clone();
        self.apply_to(&mut config)?;
        Ok(config)
    }
}

/// Parse a `NAME[=VALUE]` definition; a bare `NAME` means `ON`.
pub fn parse_define(s: &str) -> Result<(String, String), String> {
    let (name, value) = match s.split_once('=') {
        Some((name, value)) => (name.trim(), value),
        None => (s.trim(), "ON"),
    };
    if name.is_empty() {
        return Err(format!("invalid definition '{}': missing name", s));
    }
    Ok((name.to_string(), value.to_string()))
}
