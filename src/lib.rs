//! keel - a source-based package manager for native C and C++ libraries
//!
//! This crate provides the core library functionality for keel: fetching
//! source archives, selecting a build backend and driving it through
//! configure, build and install into a per-profile prefix.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for keel unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides mock implementations for process execution
/// and downloads, plus archive and source-tree fixtures.
#[cfg(test)]
pub mod test_support;

pub use core::{Package, PackageSpec, ProjectRoot, Stage};
pub use util::context::GlobalContext;
