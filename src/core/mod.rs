//! Core data structures for keel.
//!
//! This module contains the foundational types used throughout keel:
//! - The project layout every path is derived from
//! - Packages, their lifecycle stages and persisted descriptors
//! - Package specifications given on the command line
//! - The error taxonomy

pub mod descriptor;
pub mod errors;
pub mod package;
pub mod package_spec;
pub mod project;

pub use descriptor::{DescriptorStore, PackageDescriptor};
pub use errors::KeelError;
pub use package::{Package, Stage};
pub use package_spec::PackageSpec;
pub use project::ProjectRoot;
