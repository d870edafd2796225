//! High-level operations.
//!
//! This module contains the implementation of keel commands.

pub mod keel_init;
pub mod keel_list;
pub mod keel_package;
pub mod keel_profile;
pub mod keel_remove;

pub use keel_init::init_project;
pub use keel_list::{list_packages, PackageListing};
pub use keel_package::{
    drive_package, install_packages, resolve_package, run_op, PackageOp, PackageOptions,
};
pub use keel_profile::{
    add_profile, find_package_configs, list_profiles, scan_profile, set_profile, use_profile,
    ProfileEntry,
};
pub use keel_remove::remove_packages;
