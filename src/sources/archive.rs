//! Archive fetch pipeline.
//!
//! An archive is taken from the cache (`src-arch/`) when present, otherwise
//! retrieved into it. It is then verified, extracted into the scratch
//! directory (`temp/`), checked to hold exactly one top-level directory and
//! moved to `src/<name>`. The scratch directory never outlives a fetch.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::errors::KeelError;
use crate::core::project::{is_package_dir_name, ProjectRoot};
use crate::sources::download::{copy_local, insecure_url, Downloader, SourceLocation};
use crate::sources::extract;
use crate::util::fs::{ensure_dir, list_dirs, move_dir, remove_dir_all_if_exists};
use crate::util::hash::sha256_file;

/// What to fetch and where to put it.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    /// Where to retrieve the archive from when it is not cached
    pub url: Option<&'a str>,

    /// File name of the archive in the cache
    pub archive: &'a str,

    /// Directory name under `src/`
    pub dest_name: &'a str,

    /// Expected SHA-256 of the archive
    pub sha256: Option<&'a str>,

    /// Downgrade https to http
    pub insecure: bool,
}

/// Scratch directory that is emptied on creation and removed on drop.
struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    fn create(path: PathBuf) -> Result<Self> {
        remove_dir_all_if_exists(&path)?;
        ensure_dir(&path)?;
        Ok(ScratchDir { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    "failed to remove scratch directory {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Retrieves, verifies and unpacks package archives into a project.
pub struct ArchiveFetcher<'a> {
    project: &'a ProjectRoot,
    downloader: &'a dyn Downloader,
}

impl<'a> ArchiveFetcher<'a> {
    pub fn new(project: &'a ProjectRoot, downloader: &'a dyn Downloader) -> Self {
        ArchiveFetcher {
            project,
            downloader,
        }
    }

    /// Run the pipeline, returning the new source directory.
    pub fn fetch(&self, request: &FetchRequest<'_>) -> Result<PathBuf> {
        for name in [request.archive, request.dest_name] {
            if !is_package_dir_name(name) {
                return Err(KeelError::precondition(format!(
                    "`{}` cannot be used as a file name inside the project",
                    name
                ))
                .into());
            }
        }

        let cached = self.project.archive_path(request.archive);
        self.ensure_cached(request, &cached)?;

        if let Some(expected) = request.sha256 {
            verify(&cached, request.archive, expected)?;
        }

        let scratch = ScratchDir::create(self.project.scratch_dir())?;
        extract::unpack(&cached, scratch.path())?;

        let dirs = list_dirs(scratch.path())?;
        let [top] = dirs.as_slice() else {
            return Err(KeelError::Extraction {
                archive: cached,
                message: format!(
                    "wrong directory count: expected 1 top-level directory, found {}",
                    dirs.len()
                ),
            }
            .into());
        };

        let dest = self.project.source_dir(request.dest_name);
        remove_dir_all_if_exists(&dest)?;
        move_dir(top, &dest)?;

        tracing::debug!("placed sources in {}", dest.display());
        Ok(dest)
    }

    fn ensure_cached(&self, request: &FetchRequest<'_>, cached: &Path) -> Result<()> {
        if cached.is_file() {
            tracing::debug!("reusing cached archive {}", cached.display());
            return Ok(());
        }

        let Some(url) = request.url else {
            return Err(KeelError::precondition(format!(
                "archive `{}` is not cached and no URL is known for it",
                request.archive
            ))
            .into());
        };

        match SourceLocation::classify(url) {
            SourceLocation::Local(path) => {
                tracing::info!("Copying {}", path.display());
                copy_local(&path, cached)
            }
            SourceLocation::Remote(url) => {
                let url = if request.insecure {
                    insecure_url(&url)
                } else {
                    url
                };
                self.downloader.download(&url, cached)
            }
        }
    }
}

/// Compare the archive against its expected checksum, evicting it from the
/// cache on mismatch.
fn verify(cached: &Path, archive: &str, expected: &str) -> Result<()> {
    let actual = sha256_file(cached)?;
    if actual.eq_ignore_ascii_case(expected) {
        tracing::debug!("archive hash verified: {}", &actual[..16]);
        return Ok(());
    }

    if let Err(e) = std::fs::remove_file(cached) {
        tracing::warn!("failed to remove {}: {}", cached.display(), e);
    }
    Err(KeelError::HashMismatch {
        archive: archive.to_string(),
        expected: expected.to_lowercase(),
        actual,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixtures, MockDownloader};
    use crate::util::hash::sha256_bytes;
    use tempfile::TempDir;

    const LIB_URL: &str = "https://example.org/lib-1.0.zip";

    fn request<'a>(url: Option<&'a str>, archive: &'a str, dest: &'a str) -> FetchRequest<'a> {
        FetchRequest {
            url,
            archive,
            dest_name: dest,
            sha256: None,
            insecure: false,
        }
    }

    fn lib_zip() -> Vec<u8> {
        fixtures::zip(&[
            ("lib-1.0/CMakeLists.txt", "project(lib)\n"),
            ("lib-1.0/src/lib.c", "int lib(void) { return 1; }\n"),
        ])
    }

    #[test]
    fn test_fetch_zip_into_source_tree() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().serve(LIB_URL, lib_zip());

        let fetcher = ArchiveFetcher::new(&project, &downloader);
        let dest = fetcher
            .fetch(&request(Some(LIB_URL), "lib-1.0.zip", "lib"))
            .unwrap();

        assert_eq!(dest, tmp.path().join("src/lib"));
        assert_eq!(
            std::fs::read_to_string(dest.join("CMakeLists.txt")).unwrap(),
            "project(lib)\n"
        );
        assert!(dest.join("src/lib.c").is_file());
        assert!(tmp.path().join("src-arch/lib-1.0.zip").is_file());
        assert!(!tmp.path().join("temp").exists());
    }

    #[test]
    fn test_cached_archive_is_reused() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().serve(LIB_URL, lib_zip());
        let fetcher = ArchiveFetcher::new(&project, &downloader);

        let req = request(Some(LIB_URL), "lib-1.0.zip", "lib");
        let dest = fetcher.fetch(&req).unwrap();
        let first = fixtures::tree_contents(&dest);

        // a stray file from a previous fetch does not survive a re-fetch
        std::fs::write(dest.join("stale.txt"), "old").unwrap();
        fetcher.fetch(&req).unwrap();

        assert_eq!(downloader.requests(), vec![LIB_URL.to_string()]);
        assert_eq!(fixtures::tree_contents(&dest), first);
    }

    #[test]
    fn test_two_top_level_dirs_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let url = "https://example.org/two.tar.gz";
        let downloader = MockDownloader::new().serve(
            url,
            fixtures::tar_gz(&[("a/x.txt", "a"), ("b/y.txt", "b")]),
        );

        let err = ArchiveFetcher::new(&project, &downloader)
            .fetch(&request(Some(url), "two.tar.gz", "two"))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::Extraction { .. })
        ));
        assert!(err.to_string().contains("wrong directory count"));
        assert!(!tmp.path().join("temp").exists());
        assert!(!tmp.path().join("src/two").exists());
    }

    #[test]
    fn test_escaping_destination_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().serve(LIB_URL, lib_zip());
        let fetcher = ArchiveFetcher::new(&project, &downloader);

        for (archive, dest) in [
            ("lib-1.0.zip", ".."),
            ("lib-1.0.zip", "a/b"),
            ("../lib.zip", "lib"),
        ] {
            let err = fetcher
                .fetch(&request(Some(LIB_URL), archive, dest))
                .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<KeelError>(),
                Some(KeelError::Precondition { .. })
            ));
        }

        assert!(!tmp.path().join("src-arch").exists());
        assert!(!tmp.path().join("temp").exists());
        assert!(!tmp.path().join("CMakeLists.txt").exists());
    }

    #[test]
    fn test_no_top_level_dir_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let url = "https://example.org/flat.tar.gz";
        let downloader =
            MockDownloader::new().serve(url, fixtures::tar_gz(&[("CMakeLists.txt", "")]));

        let err = ArchiveFetcher::new(&project, &downloader)
            .fetch(&request(Some(url), "flat.tar.gz", "flat"))
            .unwrap_err();

        assert!(err.to_string().contains("found 0"));
        assert!(!tmp.path().join("temp").exists());
    }

    #[test]
    fn test_hash_mismatch_evicts_archive() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().serve(LIB_URL, lib_zip());

        let wrong = "0".repeat(64);
        let mut req = request(Some(LIB_URL), "lib-1.0.zip", "lib");
        req.sha256 = Some(&wrong);

        let err = ArchiveFetcher::new(&project, &downloader)
            .fetch(&req)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::HashMismatch { .. })
        ));
        assert!(!tmp.path().join("src-arch/lib-1.0.zip").exists());
        assert!(!tmp.path().join("src/lib").exists());
    }

    #[test]
    fn test_matching_hash_is_accepted() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let bytes = lib_zip();
        let hash = sha256_bytes(&bytes).to_uppercase();
        let downloader = MockDownloader::new().serve(LIB_URL, bytes);

        let mut req = request(Some(LIB_URL), "lib-1.0.zip", "lib");
        req.sha256 = Some(&hash);
        assert!(ArchiveFetcher::new(&project, &downloader).fetch(&req).is_ok());
    }

    #[test]
    fn test_insecure_downgrades_scheme() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().serve("http://example.org/lib-1.0.zip", lib_zip());

        let mut req = request(Some(LIB_URL), "lib-1.0.zip", "lib");
        req.insecure = true;
        ArchiveFetcher::new(&project, &downloader).fetch(&req).unwrap();

        assert_eq!(
            downloader.requests(),
            vec!["http://example.org/lib-1.0.zip".to_string()]
        );
    }

    #[test]
    fn test_download_failure_is_fetch_error() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new().fail(LIB_URL);

        let err = ArchiveFetcher::new(&project, &downloader)
            .fetch(&request(Some(LIB_URL), "lib-1.0.zip", "lib"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::Fetch { .. })
        ));
        assert!(!tmp.path().join("temp").exists());
    }

    #[test]
    fn test_local_archive_is_copied() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path().join("proj"));
        let local = tmp.path().join("lib-1.0.zip");
        std::fs::write(&local, lib_zip()).unwrap();
        let downloader = MockDownloader::new();

        let dest = ArchiveFetcher::new(&project, &downloader)
            .fetch(&request(local.to_str(), "lib-1.0.zip", "lib"))
            .unwrap();

        assert!(dest.join("CMakeLists.txt").is_file());
        assert!(downloader.requests().is_empty());
    }

    #[test]
    fn test_missing_url_and_cache_is_precondition() {
        let tmp = TempDir::new().unwrap();
        let project = ProjectRoot::new(tmp.path());
        let downloader = MockDownloader::new();

        let err = ArchiveFetcher::new(&project, &downloader)
            .fetch(&request(None, "lib-1.0.zip", "lib"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KeelError>(),
            Some(KeelError::Precondition { .. })
        ));
    }
}
