//! Build orchestration.
//!
//! This module drives third-party build tools:
//! - Resolved build options and the per-invocation overlay
//! - The backend contract and its CMake and Boost variants
//! - Backend selection for a source tree
//! - The generated CMake toolchain file

pub mod backend;
pub mod boost;
pub mod cmake;
pub mod context;
pub mod options;
pub mod select;
pub mod toolchain;

pub use backend::{Backend, BackendKind, BuildBackend};
pub use context::{BuildContext, ContextOptions, Tools};
pub use options::{BuildConfiguration, BuildRequest, Linkage, Variant};
