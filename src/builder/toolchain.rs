//! Generated CMake toolchain file.
//!
//! Compiler, flags, language standard and linkage are handed to CMake
//! through a toolchain file rather than on the command line, so that they
//! also reach projects that call `project()` more than once or spawn
//! sub-builds. The file lives in the profile's build root and is rewritten
//! before every configure.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;

use crate::builder::options::{BuildConfiguration, Linkage};
use crate::util::fs::write_atomic;

/// Render the toolchain file for `config`.
pub fn render(config: &BuildConfiguration, install_root: &Path) -> String {
    let mut out = String::from("# Generated by keel. Do not edit.\n");

    if let Some(user) = &config.toolchain_file {
        let _ = writeln!(out, "include(\"{}\")", cmake_path(user));
    }

    if let Some(cxx) = &config.compiler {
        let _ = writeln!(out, "set(CMAKE_CXX_COMPILER \"{}\")", escape(cxx));
    }
    if let Some(flags) = &config.compiler_flags {
        let _ = writeln!(
            out,
            "set(CMAKE_CXX_FLAGS_INIT \"${{CMAKE_CXX_FLAGS_INIT}} {}\")",
            escape(flags)
        );
    }
    if let Some(flags) = &config.linker_flags {
        for kind in ["EXE", "SHARED", "MODULE"] {
            let _ = writeln!(
                out,
                "set(CMAKE_{kind}_LINKER_FLAGS_INIT \"${{CMAKE_{kind}_LINKER_FLAGS_INIT}} {}\")",
                escape(flags)
            );
        }
    }
    if let Some(std) = &config.language_standard {
        let std = std.trim_start_matches("c++").trim_start_matches("gnu++");
        let _ = writeln!(out, "set(CMAKE_CXX_STANDARD {})", std);
        let _ = writeln!(out, "set(CMAKE_CXX_STANDARD_REQUIRED ON)");
    }

    match config.linkage {
        Linkage::Static => out.push_str("set(BUILD_SHARED_LIBS OFF CACHE BOOL \"\")\n"),
        Linkage::Shared => out.push_str("set(BUILD_SHARED_LIBS ON CACHE BOOL \"\")\n"),
        Linkage::Unspecified => {}
    }

    let _ = writeln!(
        out,
        "list(PREPEND CMAKE_PREFIX_PATH \"{}\")",
        cmake_path(install_root)
    );

    out
}

/// Write the toolchain file for `config` to `path`.
pub fn write(path: &Path, config: &BuildConfiguration, install_root: &Path) -> Result<()> {
    write_atomic(path, render(config, install_root).as_bytes())
}

/// CMake wants forward slashes, even on Windows.
fn cmake_path(path: &Path) -> String {
    escape(&path.display().to_string().replace('\\', "/"))
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
