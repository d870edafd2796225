//! Test fixtures for common test scenarios.
//!
//! Source trees, in-memory archives and ready-made contexts.

use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use walkdir::WalkDir;

use crate::builder::backend::BackendSettings;
use crate::builder::context::{BuildContext, Tools};
use crate::builder::options::BuildConfiguration;
use crate::core::project::ProjectRoot;
use crate::test_support::{MockDownloader, MockExecutor};
use crate::util::config::DEFAULT_PROFILE;

/// Write a minimal CMake project declaring `name` into `dir`.
pub fn cmake_project(dir: &Path, name: &str) {
    std::fs::create_dir_all(dir).expect("failed to create project dir");
    std::fs::write(
        dir.join("CMakeLists.txt"),
        format!(
            "cmake_minimum_required(VERSION 3.10)\nproject({} C)\nadd_library({} {}.c)\n",
            name, name, name
        ),
    )
    .expect("failed to write CMakeLists.txt");
}

/// Write the skeleton of a Boost tree into `dir`.
pub fn boost_tree(dir: &Path) {
    std::fs::create_dir_all(dir.join("boost")).expect("failed to create boost dir");
    std::fs::write(dir.join("bootstrap.sh"), "#!/bin/sh\n").expect("failed to write script");
    std::fs::write(dir.join("bootstrap.bat"), "@echo off\n").expect("failed to write script");
    std::fs::write(
        dir.join("boost/version.hpp"),
        "#define BOOST_VERSION 108400\n",
    )
    .expect("failed to write header");
}

/// Contents of a `CMakeCache.txt` recording `generator`.
pub fn cmake_cache(generator: &str) -> String {
    format!(
        "# This is the CMakeCache file.\n\
         //Build type\n\
         CMAKE_BUILD_TYPE:STRING=Release\n\
         //Name of generator.\n\
         CMAKE_GENERATOR:INTERNAL={}\n",
        generator
    )
}

/// Build a gzip-compressed tarball from `(path, contents)` pairs.
pub fn tar_gz(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("failed to append tar entry");
    }

    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("failed to finish tarball")
}

/// Build a zip archive from `(path, contents)` pairs.
pub fn zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    for (path, contents) in entries {
        writer
            .start_file(*path, options)
            .expect("failed to start zip entry");
        writer
            .write_all(contents.as_bytes())
            .expect("failed to write zip entry");
    }

    writer
        .finish()
        .expect("failed to finish zip")
        .into_inner()
}

/// Every file under `dir` with its contents, keyed by relative path.
pub fn tree_contents(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e
                .path()
                .strip_prefix(dir)
                .expect("walked path outside root")
                .to_path_buf();
            let contents = std::fs::read(e.path()).expect("failed to read file");
            (relative, contents)
        })
        .collect()
}

/// Backend settings rooted at `root`, running commands through `executor`.
pub fn backend_settings(root: &Path, executor: Arc<MockExecutor>) -> BackendSettings {
    BackendSettings {
        install_root: root.join("install-default"),
        toolchain_path: root.join("keel-toolchain.cmake"),
        cmake: PathBuf::from("cmake"),
        ctest: PathBuf::from("ctest"),
        verbose: false,
        executor,
    }
}

/// Build context for a project at `root` using the default profile.
pub fn context(
    root: &Path,
    executor: Arc<MockExecutor>,
    downloader: Arc<MockDownloader>,
) -> BuildContext {
    BuildContext {
        project: ProjectRoot::new(root),
        profile: DEFAULT_PROFILE.to_string(),
        config: BuildConfiguration::default(),
        tools: Tools::default(),
        verbose: false,
        insecure: false,
        executor,
        downloader,
    }
}
