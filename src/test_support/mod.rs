//! Test utilities and mocks for keel unit tests.
//!
//! This module provides mock implementations for the two services that are
//! difficult to test in isolation: process execution and archive
//! downloads.
//!
//! # Example
//!
//! ```rust,ignore
//! use keel::test_support::{MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let exec = Arc::new(
//!         MockExecutor::new()
//!             .expect_contains("--target check", MockProcessOutput::failure(2, "no rule"))
//!             .with_default(MockProcessOutput::success("")),
//!     );
//!
//!     // Hand `exec` to a backend, then inspect `exec.calls()`.
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::core::errors::KeelError;
use crate::sources::download::Downloader;
use crate::util::process::{Executor, ProcessBuilder, ProcessOutput};

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<MockProcessOutput> for ProcessOutput {
    fn from(mock: MockProcessOutput) -> Self {
        ProcessOutput {
            code: Some(mock.status),
            stdout: mock.stdout,
            stderr: mock.stderr,
        }
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command contains substring.
    Contains(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::Contains(s) => cmd.contains(s.as_str()),
        }
    }
}

type RunHook = Box<dyn Fn(&ProcessBuilder) + Send + Sync>;

/// Mock process executor for testing command execution.
///
/// Commands are matched against expectations in the order they were added;
/// the first match supplies the output. Unmatched commands get the default
/// output if one is set and are an error otherwise. Every command is
/// recorded.
#[derive(Default)]
pub struct MockExecutor {
    expectations: Vec<(CommandPattern, MockProcessOutput)>,
    default_output: Option<MockProcessOutput>,
    hook: Option<RunHook>,
    calls: Mutex<Vec<ProcessBuilder>>,
}

impl MockExecutor {
    /// Create a mock executor that rejects every command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an expectation for an exact command match.
    pub fn expect(mut self, cmd: &str, output: MockProcessOutput) -> Self {
        self.expectations
            .push((CommandPattern::Exact(cmd.to_string()), output));
        self
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(mut self, substring: &str, output: MockProcessOutput) -> Self {
        self.expectations
            .push((CommandPattern::Contains(substring.to_string()), output));
        self
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn with_default(mut self, output: MockProcessOutput) -> Self {
        self.default_output = Some(output);
        self
    }

    /// Run `hook` for every command before answering it, e.g. to create
    /// the files a real tool would produce.
    pub fn on_run(mut self, hook: impl Fn(&ProcessBuilder) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Every command run so far.
    pub fn commands(&self) -> Vec<ProcessBuilder> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Display strings of every command run so far.
    pub fn calls(&self) -> Vec<String> {
        self.commands()
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }
}

impl Executor for MockExecutor {
    fn run(&self, cmd: &ProcessBuilder) -> Result<ProcessOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(cmd.clone());
        }
        if let Some(hook) = &self.hook {
            hook(cmd);
        }

        let full_cmd = cmd.display_command();
        if let Some((_, output)) = self
            .expectations
            .iter()
            .find(|(pattern, _)| pattern.matches(&full_cmd))
        {
            return Ok(output.clone().into());
        }

        if let Some(ref default) = self.default_output {
            return Ok(default.clone().into());
        }

        bail!("unexpected command: {}", full_cmd)
    }
}

/// Mock downloader serving fixed bytes per URL.
#[derive(Debug, Default)]
pub struct MockDownloader {
    responses: HashMap<String, Vec<u8>>,
    failing: Vec<String>,
    requests: Mutex<Vec<String>>,
}

impl MockDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for `url`.
    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), body.into());
        self
    }

    /// Fail requests for `url` as a transport error.
    pub fn fail(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    /// Get all requested URLs.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

impl Downloader for MockDownloader {
    fn download(&self, url: &str, dest: &Path) -> Result<()> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        let fetch_error = |message: &str| KeelError::Fetch {
            url: url.to_string(),
            message: message.to_string(),
        };

        if self.failing.iter().any(|u| u == url) {
            return Err(fetch_error("connection refused").into());
        }
        let Some(body) = self.responses.get(url) else {
            return Err(fetch_error("HTTP 404 Not Found").into());
        };

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_executor_matching() {
        let exec = MockExecutor::new()
            .expect("cmake --version", MockProcessOutput::success("cmake version 3.28"))
            .expect_contains("--target check", MockProcessOutput::failure(2, "no rule"));

        let out = exec.run(&ProcessBuilder::new("cmake").arg("--version")).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, "cmake version 3.28");

        let out = exec
            .run(&ProcessBuilder::new("cmake").args(["--build", "bd", "--target", "check"]))
            .unwrap();
        assert_eq!(out.code, Some(2));

        assert!(exec.run(&ProcessBuilder::new("ctest")).is_err());
        assert_eq!(exec.calls().len(), 3);
    }

    #[test]
    fn test_mock_downloader() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dl = MockDownloader::new()
            .serve("https://a.org/x.zip", b"zip".to_vec())
            .fail("https://b.org/y.zip");

        let dest = tmp.path().join("cache/x.zip");
        dl.download("https://a.org/x.zip", &dest).unwrap();
        assert_eq!(std::fs::read(&dest).unwrap(), b"zip");

        assert!(dl.download("https://b.org/y.zip", &dest).is_err());
        assert!(dl.download("https://c.org/z.zip", &dest).is_err());
        assert_eq!(dl.requests().len(), 3);
    }
}
