//! # What to sync and how to invoke the sync executable.
//!
//! [`SyncSpec`] is built once at startup and read-only afterwards. It composes the
//! external command line:
//!
//! ```text
//! <program> <base_args...> <source_dir> <destination_prefix><destination> [--exclude * --include <pattern>]
//! ```
//!
//! With the default [`SyncCommand`] this is `aws s3 sync /data s3://my-bucket`.
//! When an include pattern is configured, everything is excluded first and then the
//! pattern is re-included, so only matching files transfer. Without a pattern the
//! whole tree is mirrored.
//!
//! Arguments are passed to the executable as a vector, never through a shell, so
//! patterns like `*.flac` reach the sync tool verbatim.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Sync executable and its fixed leading arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncCommand {
    /// Executable name or path (resolved through `PATH`).
    pub program: String,
    /// Arguments placed before the source directory (e.g. `["s3", "sync"]`).
    pub base_args: Vec<String>,
    /// Prepended to the destination identifier (e.g. `"s3://"`).
    pub destination_prefix: String,
}

impl SyncCommand {
    /// Builds a command with no base arguments and no destination prefix.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            destination_prefix: String::new(),
        }
    }

    /// Appends fixed leading arguments.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_destination_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.destination_prefix = prefix.into();
        self
    }

    /// Parses a whitespace-separated command (`"aws s3 sync"`).
    ///
    /// Returns `None` for a blank string.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_base_args(parts))
    }
}

impl Default for SyncCommand {
    /// `aws s3 sync <dir> s3://<bucket>`
    fn default() -> Self {
        Self::new("aws")
            .with_base_args(["s3", "sync"])
            .with_destination_prefix("s3://")
    }
}

/// Immutable description of the directory to push and where to push it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSpec {
    source_dir: PathBuf,
    destination: String,
    include_pattern: Option<String>,
    command: SyncCommand,
}

impl SyncSpec {
    /// Creates a spec mirroring the whole `source_dir` with the default command.
    pub fn new(source_dir: impl Into<PathBuf>, destination: impl Into<String>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination: destination.into(),
            include_pattern: None,
            command: SyncCommand::default(),
        }
    }

    /// Restricts the transfer to files matching `pattern`.
    ///
    /// A blank pattern means "include everything" and clears any previous filter.
    pub fn with_include_pattern(mut self, pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        self.include_pattern = (!pattern.trim().is_empty()).then_some(pattern);
        self
    }

    pub fn with_command(mut self, command: SyncCommand) -> Self {
        self.command = command;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn include_pattern(&self) -> Option<&str> {
        self.include_pattern.as_deref()
    }

    pub fn command(&self) -> &SyncCommand {
        &self.command
    }

    /// Arguments passed to [`SyncCommand::program`], in order.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.command.base_args.iter().map(OsString::from).collect();
        args.push(self.source_dir.clone().into_os_string());
        args.push(format!("{}{}", self.command.destination_prefix, self.destination).into());
        if let Some(pattern) = &self.include_pattern {
            args.extend(["--exclude", "*", "--include"].map(OsString::from));
            args.push(pattern.into());
        }
        args
    }

    /// Human-readable command line, used in status messages and logs.
    pub fn display_command(&self) -> String {
        std::iter::once(self.command.program.clone())
            .chain(self.args().iter().map(|a| a.to_string_lossy().into_owned()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
