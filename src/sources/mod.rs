//! Package sources.
//!
//! Sources are responsible for getting a package's archive into the project
//! (download, local copy or cache hit) and unpacking it into `src/`.

pub mod archive;
pub mod download;
pub mod extract;

pub use archive::{ArchiveFetcher, FetchRequest};
pub use download::{Downloader, HttpDownloader};
