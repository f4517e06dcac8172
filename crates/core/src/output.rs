//! Captured result of one invocation of the wrapped tool.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Standard output, standard error and exit status of a finished subprocess.
///
/// Both executors (plain process and native bridge) produce this type, so the
/// observable contract is the same regardless of how the tool was launched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
}

impl CommandOutput {
    /// Build an output record from raw captured text.
    ///
    /// Trailing whitespace is trimmed from both streams.
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: Option<i32>) -> Self {
        Self {
            stdout: trim_trailing(stdout.into()),
            stderr: trim_trailing(stderr.into()),
            exit_code,
        }
    }

    /// Build an output record from raw byte buffers, replacing invalid UTF-8.
    #[must_use]
    pub fn from_bytes(stdout: &[u8], stderr: &[u8], exit_code: Option<i32>) -> Self {
        Self::new(
            String::from_utf8_lossy(stdout),
            String::from_utf8_lossy(stderr),
            exit_code,
        )
    }

    /// Captured standard output.
    #[must_use]
    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    /// Captured standard error.
    #[must_use]
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Exit code, `None` if the process was terminated by a signal.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Whether the tool exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Consume the output, keeping only standard output.
    #[must_use]
    pub fn into_stdout(self) -> String {
        self.stdout
    }

    /// Turn a non-zero exit into [`Error::ToolFailure`].
    ///
    /// `command` names the subcommand in the error (e.g. "board details --fqbn x").
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailure`] carrying the exit code and standard error
    /// when the tool did not exit successfully.
    pub fn into_result(self, command: impl Into<String>) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(Error::ToolFailure {
                command: command.into(),
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

fn trim_trailing(mut text: String) -> String {
    let trimmed_len = text.trim_end().len();
    text.truncate(trimmed_len);
    text
}
