//! Error taxonomy for package operations.
//!
//! These are raised inside `anyhow::Error` so that context can be attached
//! on the way up; callers that need to branch on the kind use
//! `err.downcast_ref::<KeelError>()`.

use std::path::PathBuf;

use thiserror::Error;

/// A classified failure from a package operation.
#[derive(Debug, Error)]
pub enum KeelError {
    #[error("failed to fetch `{url}`: {message}")]
    Fetch { url: String, message: String },

    #[error("failed to extract `{}`: {message}", .archive.display())]
    Extraction { archive: PathBuf, message: String },

    #[error("no build backend recognizes the sources in `{}`", .path.display())]
    BackendUnresolved { path: PathBuf },

    #[error("configure step failed for `{package}` (`{command}` exited with {})", describe_code(.code))]
    Configure {
        package: String,
        command: String,
        code: Option<i32>,
    },

    #[error("build step failed for `{package}` (`{command}` exited with {})", describe_code(.code))]
    Build {
        package: String,
        command: String,
        code: Option<i32>,
    },

    #[error("install step failed for `{package}` (`{command}` exited with {})", describe_code(.code))]
    Install {
        package: String,
        command: String,
        code: Option<i32>,
    },

    #[error("tests failed for `{package}` (`{command}` exited with {})", describe_code(.code))]
    Test {
        package: String,
        command: String,
        code: Option<i32>,
    },

    #[error("{message}")]
    Precondition { message: String },

    #[error("checksum mismatch for `{archive}`:\n  expected: {expected}\n  actual:   {actual}")]
    HashMismatch {
        archive: String,
        expected: String,
        actual: String,
    },

    #[error("`{first}` cannot be used with `{second}`")]
    ConflictingOptions {
        first: &'static str,
        second: &'static str,
    },

    #[error("package `{name}` not found")]
    PackageNotFound { name: String },

    #[error("could not find `keel.toml` in `{}` or any parent directory", .dir.display())]
    NotInitialized { dir: PathBuf },

    #[error("`{}` is already initialized", .dir.display())]
    AlreadyInitialized { dir: PathBuf },

    #[error("profile `{name}` does not exist")]
    ProfileNotFound { name: String },

    #[error("profile `{name}` already exists")]
    ProfileExists { name: String },

    #[error("invalid package `{spec}`: {reason}")]
    InvalidPackageSpec { spec: String, reason: String },

    #[error("`{}` is locked by another keel process", .path.display())]
    Locked { path: PathBuf },
}

impl KeelError {
    pub fn precondition(message: impl Into<String>) -> Self {
        KeelError::Precondition {
            message: message.into(),
        }
    }
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}
