//! Command execution backends.
//!
//! An [`Executor`] takes a fully assembled [`Invocation`] (program path plus
//! discrete argument tokens) and returns the tool's [`CommandOutput`]. Two
//! backends exist with the same observable contract:
//!
//! - [`ProcessExecutor`] spawns the program directly via tokio
//! - [`BridgeExecutor`] routes through the embedded native bridge library

mod bridge;
mod process;

pub use bridge::{BridgeExecutor, NativeBridge};
pub use process::ProcessExecutor;

use ardukit_core::{CommandOutput, Result};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// One program invocation. Arguments are never shell-interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program to run.
    pub program: PathBuf,
    /// Argument tokens, in order.
    pub args: Vec<String>,
    /// Working directory for the child, inherited when `None`.
    pub cwd: Option<PathBuf>,
    /// Kill the child after this long, unbounded when `None`.
    pub timeout: Option<Duration>,
}

impl Invocation {
    /// Invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Append argument tokens.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// The arguments joined with spaces, for logs and error messages.
    #[must_use]
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

/// Runs an [`Invocation`] to completion.
///
/// Implementations return `Ok` whenever the program ran, whatever its exit
/// status; callers decide whether a non-zero exit is a failure via
/// [`CommandOutput::into_result`].
#[async_trait]
pub trait Executor: fmt::Debug + Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Run the invocation and capture its output.
    ///
    /// # Errors
    ///
    /// Returns [`ardukit_core::Error::ExecutionFailure`] if the program cannot
    /// be launched and [`ardukit_core::Error::Timeout`] if it exceeds its timeout.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;
}
