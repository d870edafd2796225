//! Archive retrieval.
//!
//! A package source is either a remote URL fetched over HTTP(S) or a local
//! archive (plain path or `file://` URL) copied into the archive cache.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use url::Url;

use crate::core::errors::KeelError;
use crate::util::fs::ensure_dir;

/// Where an archive comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Local(PathBuf),
    Remote(String),
}

impl SourceLocation {
    /// Classify a user-supplied source string.
    pub fn classify(source: &str) -> Self {
        if let Ok(url) = Url::parse(source) {
            match url.scheme() {
                "file" => {
                    if let Ok(path) = url.to_file_path() {
                        return SourceLocation::Local(path);
                    }
                }
                "http" | "https" | "ftp" => return SourceLocation::Remote(source.to_string()),
                // single-letter schemes are Windows drive letters
                _ => {}
            }
        }
        SourceLocation::Local(PathBuf::from(source))
    }
}

/// Downgrade `https://` to `http://`.
pub fn insecure_url(url: &str) -> String {
    match url.strip_prefix("https://") {
        Some(rest) => format!("http://{}", rest),
        None => url.to_string(),
    }
}

/// Service that places the bytes behind a URL at a path.
pub trait Downloader: Send + Sync {
    /// Download `url` to `dest`. `dest` must not be left half-written.
    fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloader backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::blocking::Client,
    show_progress: bool,
}

impl HttpDownloader {
    pub fn new(show_progress: bool) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("keel/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;
        Ok(HttpDownloader {
            client,
            show_progress,
        })
    }

    fn progress_bar(&self, url: &str, total: Option<u64>) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }
        let pb = ProgressBar::new(total.unwrap_or(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.set_message(url.rsplit('/').next().unwrap_or(url).to_string());
        Some(pb)
    }
}

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("Downloading {}", url);

        let fetch_error = |message: String| KeelError::Fetch {
            url: url.to_string(),
            message,
        };

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fetch_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_error(format!("HTTP {}", response.status())).into());
        }

        let dir = dest
            .parent()
            .with_context(|| format!("path has no parent directory: {}", dest.display()))?;
        ensure_dir(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;

        let pb = self.progress_bar(url, response.content_length());
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| fetch_error(e.to_string()))?;
            if n == 0 {
                break;
            }
            tmp.write_all(&buf[..n])
                .with_context(|| format!("failed to write {}", dest.display()))?;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        tmp.as_file().sync_all()?;
        tmp.persist(dest)
            .with_context(|| format!("failed to persist download to {}", dest.display()))?;
        Ok(())
    }
}

/// Copy a local archive into the cache, failing as a fetch error when the
/// file is missing.
pub fn copy_local(source: &Path, dest: &Path) -> Result<()> {
    let mut input = File::open(source).map_err(|e| KeelError::Fetch {
        url: source.display().to_string(),
        message: e.to_string(),
    })?;

    let dir = dest
        .parent()
        .with_context(|| format!("path has no parent directory: {}", dest.display()))?;
    ensure_dir(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::io::copy(&mut input, &mut tmp)
        .with_context(|| format!("failed to copy {}", source.display()))?;
    tmp.persist(dest)
        .with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(())
}
