//! Project layout.
//!
//! Every path keel touches is derived from a [`ProjectRoot`], which is
//! discovered once by the CLI and then passed explicitly to every component.
//!
//! ```text
//! <root>/
//!   keel.toml                  profiles and tool settings
//!   src/<name>/                unpacked sources, one directory per package
//!   src-arch/<archive>         downloaded archive cache
//!   packages/<name>.json       package descriptors
//!   build-<profile>/<name>/    per-profile build directories
//!   install-<profile>/         per-profile install prefix
//!   temp/                      extraction scratch space
//! ```

use std::path::{Component, Path, PathBuf};

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "keel.toml";

/// Name of the generated CMake toolchain file inside a profile's build root.
pub const TOOLCHAIN_FILE: &str = "keel-toolchain.cmake";

/// Lock file guarding an install prefix.
const INSTALL_LOCK_FILE: &str = ".keel.lock";

/// Whether `name` can be used as a directory under `src/` and
/// `build-<profile>/`: exactly one ordinary path component.
pub fn is_package_dir_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Root directory of a keel project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRoot {
    root: PathBuf,
}

impl ProjectRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ProjectRoot { root: root.into() }
    }

    /// Search `start` and its ancestors for a directory containing `keel.toml`.
    pub fn discover(start: &Path) -> Option<Self> {
        start
            .ancestors()
            .find(|dir| dir.join(CONFIG_FILE).is_file())
            .map(ProjectRoot::new)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn is_initialized(&self) -> bool {
        self.config_path().is_file()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Directory holding the unpacked sources of every package.
    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.src_dir().join(name)
    }

    /// Archive cache.
    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("src-arch")
    }

    pub fn archive_path(&self, archive: &str) -> PathBuf {
        self.archive_dir().join(archive)
    }

    /// Package descriptor store.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("packages")
    }

    pub fn package_lock_path(&self, name: &str) -> PathBuf {
        self.packages_dir().join(format!("{}.lock", name))
    }

    /// Scratch directory used while extracting archives.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn build_root(&self, profile: &str) -> PathBuf {
        self.root.join(format!("build-{}", profile))
    }

    pub fn build_dir(&self, profile: &str, name: &str) -> PathBuf {
        self.build_root(profile).join(name)
    }

    pub fn toolchain_path(&self, profile: &str) -> PathBuf {
        self.build_root(profile).join(TOOLCHAIN_FILE)
    }

    /// Shared install prefix for a profile.
    pub fn install_root(&self, profile: &str) -> PathBuf {
        self.root.join(format!("install-{}", profile))
    }

    pub fn install_lock_path(&self, profile: &str) -> PathBuf {
        self.install_root(profile).join(INSTALL_LOCK_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout() {
        let project = ProjectRoot::new("/work/proj");

        assert_eq!(project.source_dir("zlib"), Path::new("/work/proj/src/zlib"));
        assert_eq!(
            project.archive_path("zlib-1.3.tar.gz"),
            Path::new("/work/proj/src-arch/zlib-1.3.tar.gz")
        );
        assert_eq!(
            project.build_dir("default", "zlib"),
            Path::new("/work/proj/build-default/zlib")
        );
        assert_eq!(
            project.install_root("debug"),
            Path::new("/work/proj/install-debug")
        );
        assert_eq!(
            project.toolchain_path("default"),
            Path::new("/work/proj/build-default/keel-toolchain.cmake")
        );
    }

    #[test]
    fn test_package_dir_names() {
        for name in ["zlib", "zlib-1.3.1", "...", "lib.x"] {
            assert!(is_package_dir_name(name), "{}", name);
        }
        for name in ["", ".", "..", "a/b", "../zlib", "a\\b", "/abs"] {
            assert!(!is_package_dir_name(name), "{}", name);
        }
    }

    #[test]
    fn test_discover_searches_upward() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "").unwrap();
        let nested = tmp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let project = ProjectRoot::discover(&nested).unwrap();
        assert_eq!(project.path(), tmp.path());
        assert!(project.is_initialized());
    }

    #[test]
    fn test_discover_without_config() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("x");
        std::fs::create_dir_all(&nested).unwrap();

        // a keel.toml further up the real filesystem would be found, so only
        // assert that the temp dir itself is not reported
        let found = ProjectRoot::discover(&nested);
        assert!(found.map_or(true, |p| !p.path().starts_with(tmp.path())));
    }
}
