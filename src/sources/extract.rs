//! Archive decompression.
//!
//! Supports gzip-compressed tarballs, plain tarballs and zip files, chosen
//! by file extension. Every failure is reported as
//! [`KeelError::Extraction`].

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Result;
use flate2::read::GzDecoder;
use tar::Archive;
use zip::ZipArchive;

use crate::core::errors::KeelError;
use crate::util::fs::ensure_dir;

/// Archive formats keel can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Tar,
    Zip,
}

impl ArchiveFormat {
    const SUFFIXES: [(&'static str, ArchiveFormat); 4] = [
        (".tar.gz", ArchiveFormat::TarGz),
        (".tgz", ArchiveFormat::TarGz),
        (".tar", ArchiveFormat::Tar),
        (".zip", ArchiveFormat::Zip),
    ];

    /// Detect the format from an archive file name.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        Self::SUFFIXES
            .iter()
            .find(|(suffix, _)| lower.ends_with(suffix))
            .map(|(_, format)| *format)
    }
}

/// Archive file name without its archive extension (`lib-1.0.zip` ->
/// `lib-1.0`).
pub fn archive_stem(name: &str) -> &str {
    let lower = name.to_lowercase();
    for (suffix, _) in ArchiveFormat::SUFFIXES {
        if lower.ends_with(suffix) {
            return &name[..name.len() - suffix.len()];
        }
    }
    name
}

/// Unpack `archive` into `dest`.
pub fn unpack(archive: &Path, dest: &Path) -> Result<()> {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some(format) = ArchiveFormat::from_name(&name) else {
        return Err(extraction_error(archive, "unsupported archive format"));
    };

    ensure_dir(dest)?;
    tracing::debug!("unpacking {} into {}", archive.display(), dest.display());

    let result = match format {
        ArchiveFormat::TarGz => unpack_tar_gz(archive, dest),
        ArchiveFormat::Tar => unpack_tar(archive, dest),
        ArchiveFormat::Zip => unpack_zip(archive, dest),
    };
    result.map_err(|e| extraction_error(archive, format!("{:#}", e)))
}

fn extraction_error(archive: &Path, message: impl Into<String>) -> anyhow::Error {
    KeelError::Extraction {
        archive: archive.to_path_buf(),
        message: message.into(),
    }
    .into()
}

fn unpack_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));
    tar.unpack(dest)?;
    Ok(())
}

fn unpack_tar(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(BufReader::new(file));
    tar.unpack(dest)?;
    Ok(())
}

fn unpack_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(BufReader::new(file))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::debug!("skipping zip entry with unsafe path: {}", entry.name());
            continue;
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            ensure_dir(parent)?;
        }
        let mut out = File::create(&out_path)?;
        std::io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))?;
        }
    }

    Ok(())
}
