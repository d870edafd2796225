//! Command implementations

pub mod completions;
pub mod config;
pub mod init;
pub mod list;
pub mod package;
pub mod remove;
