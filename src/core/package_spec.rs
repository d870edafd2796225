//! Package specifications given on the command line.
//!
//! ```text
//! zlib                                   an existing package
//! zlib,https://zlib.net/zlib-1.3.tar.gz  a new package with a fixed name
//! madler/zlib                            GitHub master branch archive
//! https://zlib.net/zlib-1.3.tar.gz       a new package named after its sources
//! ../archives/zlib-1.3.tar.gz            a local archive (or file:// URL)
//! ```

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::core::errors::KeelError;
use crate::core::project::is_package_dir_name;
use crate::sources::extract::{archive_stem, ArchiveFormat};

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));

static GITHUB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w-]+)/([\w-]+)$").expect("valid regex"));

/// Where a new package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    /// Name to register the package under before its sources are seen
    pub name: String,

    /// The name was given explicitly and is kept after detection
    pub pinned: bool,

    /// Remote URL or absolute local path
    pub url: String,

    /// Archive file name in the cache
    pub archive: String,
}

/// A parsed package argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpec {
    /// A package already known to the project
    Named(String),
    /// A package identified by its archive location
    Source(SourceSpec),
}

impl PackageSpec {
    /// Parse a package argument; relative local paths resolve against `cwd`.
    pub fn parse(spec: &str, cwd: &Path) -> Result<Self, KeelError> {
        let invalid = |reason: &str| KeelError::InvalidPackageSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let spec = spec.trim();
        if spec.is_empty() {
            return Err(invalid("empty package name"));
        }

        if NAME_RE.is_match(spec) {
            return Ok(PackageSpec::Named(spec.to_string()));
        }

        if let Some((name, location)) = spec.split_once(',') {
            if !NAME_RE.is_match(name) {
                return Err(invalid("package names may only contain letters, digits, `_` and `-`"));
            }
            let mut source = parse_location(location, cwd).map_err(|r| invalid(&r))?;
            source.name = name.to_string();
            source.pinned = true;
            return Ok(PackageSpec::Source(source));
        }

        parse_location(spec, cwd)
            .map(PackageSpec::Source)
            .map_err(|r| invalid(&r))
    }

    /// Name the package is registered under (provisional for unpinned
    /// sources).
    pub fn name(&self) -> &str {
        match self {
            PackageSpec::Named(name) => name,
            PackageSpec::Source(source) => &source.name,
        }
    }
}

fn parse_location(location: &str, cwd: &Path) -> Result<SourceSpec, String> {
    if let Some(caps) = GITHUB_RE.captures(location) {
        if !cwd.join(location).exists() {
            let repo = caps[2].to_string();
            return Ok(SourceSpec {
                archive: format!("{}.zip", repo),
                url: format!("https://github.com/{}/archive/master.zip", location),
                name: repo,
                pinned: false,
            });
        }
    }

    if let Ok(url) = Url::parse(location) {
        if matches!(url.scheme(), "http" | "https" | "ftp" | "file") {
            let archive = url
                .path_segments()
                .and_then(|mut segments| segments.next_back())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| "URL does not name an archive file".to_string())?
                .to_string();
            return source_for(location.to_string(), archive);
        }
    }

    let path = cwd.join(location);
    if path.is_file() {
        let archive = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| "path does not name an archive file".to_string())?;
        return source_for(path.to_string_lossy().into_owned(), archive);
    }

    Err("not a package name, URL or existing archive".to_string())
}

fn source_for(url: String, archive: String) -> Result<SourceSpec, String> {
    if ArchiveFormat::from_name(&archive).is_none() {
        return Err(format!(
            "`{}` is not a supported archive (.tar.gz, .tgz, .tar, .zip)",
            archive
        ));
    }
    let name = archive_stem(&archive);
    if !is_package_dir_name(name) {
        return Err(format!(
            "archive `{}` does not yield a usable package name",
            archive
        ));
    }
    Ok(SourceSpec {
        name: name.to_string(),
        pinned: false,
        url,
        archive,
    })
}
