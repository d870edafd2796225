//! Backend selection.
//!
//! Inspects a source tree and binds the first backend in
//! [`BackendKind::DETECTION_ORDER`] that recognizes it: a CMake project
//! descriptor wins over a Boost bootstrap script.

use std::path::Path;

use crate::builder::backend::BackendKind;

/// Result of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Name the sources declare
    pub name: String,
    pub kind: BackendKind,
}

/// Select a backend for `source_dir`, or `None` if nothing recognizes it.
pub fn select(source_dir: &Path) -> Option<Selection> {
    BackendKind::DETECTION_ORDER.iter().find_map(|kind| {
        kind.detect(source_dir).map(|name| Selection { name, kind: *kind })
    })
}
