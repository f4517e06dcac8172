//! Error types shared across ardukit crates.

use miette::Diagnostic;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for ardukit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving, extracting or running the wrapped tool.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// The host reported an OS or CPU architecture outside the supported set.
    #[error("Unsupported {kind}: '{value}'")]
    #[diagnostic(
        code(ardukit::platform::unsupported),
        help("ardukit ships binaries for windows, macos and linux on x86_64, aarch64 and arm")
    )]
    UnsupportedPlatform {
        /// Which dimension failed ("platform" or "architecture").
        kind: &'static str,
        /// The host-reported string.
        value: String,
    },

    /// The expected embedded artifact is missing from the package.
    #[error("Resource not found: {locator} (searched {source_name})")]
    #[diagnostic(
        code(ardukit::bundle::resource_not_found),
        help("the distributable was packaged without binaries for this host; set ARDUKIT_CLI_PATH to use an installed arduino-cli")
    )]
    ResourceNotFound {
        /// Resource locator that was looked up.
        locator: String,
        /// Description of the resource source that was searched.
        source_name: String,
    },

    /// Writing the extracted artifact to disk failed.
    #[error("Failed to extract {locator} to {}: {source}", path.display())]
    #[diagnostic(code(ardukit::bundle::extraction_failed))]
    ExtractionFailure {
        /// Resource locator being extracted.
        locator: String,
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The native bridge library could not be loaded.
    #[error("Failed to load native bridge {}: {message}", path.display())]
    #[diagnostic(
        code(ardukit::bridge::load_failed),
        help("use execution mode 'process' to run the tool without the native bridge")
    )]
    BridgeLoadFailure {
        /// Path of the library that failed to load.
        path: PathBuf,
        /// Loader message.
        message: String,
    },

    /// The native bridge returned a malformed or unexpected response.
    #[error("Native bridge error: {message}")]
    #[diagnostic(code(ardukit::bridge::protocol))]
    Bridge {
        /// Error message.
        message: String,
    },

    /// The subprocess could not be launched at all.
    #[error("Failed to launch {}: {source}", program.display())]
    #[diagnostic(code(ardukit::exec::launch_failed))]
    ExecutionFailure {
        /// Program that failed to start.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The wrapped tool ran but exited unsuccessfully.
    #[error("`{command}` failed{}: {stderr}", exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default())]
    #[diagnostic(code(ardukit::exec::tool_failed))]
    ToolFailure {
        /// The subcommand that was run (without the binary path).
        command: String,
        /// Exit code, `None` when terminated by a signal.
        exit_code: Option<i32>,
        /// Standard error of the tool, trailing whitespace trimmed.
        stderr: String,
    },

    /// The subprocess exceeded its configured timeout and was killed.
    #[error("{} timed out after {}s", program.display(), timeout.as_secs_f64())]
    #[diagnostic(code(ardukit::exec::timeout))]
    Timeout {
        /// Program that was killed.
        program: PathBuf,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A facade operation was called without a required argument.
    #[error("{operation}: missing required argument '{argument}'")]
    #[diagnostic(code(ardukit::facade::missing_argument))]
    MissingArgument {
        /// Facade operation name.
        operation: &'static str,
        /// Argument name.
        argument: &'static str,
    },

    /// Invalid configuration.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(ardukit::config::invalid))]
    Configuration {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Create an unsupported platform error.
    #[must_use]
    pub fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            kind,
            value: value.into(),
        }
    }

    /// Create a resource not found error.
    #[must_use]
    pub fn resource_not_found(locator: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            locator: locator.into(),
            source_name: source_name.into(),
        }
    }

    /// Create an extraction failure.
    #[must_use]
    pub fn extraction(
        locator: impl Into<String>,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::ExtractionFailure {
            locator: locator.into(),
            path: path.into(),
            source,
        }
    }

    /// Create a bridge load failure.
    #[must_use]
    pub fn bridge_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::BridgeLoadFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a bridge protocol error.
    #[must_use]
    pub fn bridge(message: impl Into<String>) -> Self {
        Self::Bridge {
            message: message.into(),
        }
    }

    /// Create an execution failure.
    #[must_use]
    pub fn execution(program: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ExecutionFailure {
            program: program.into(),
            source,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Exit code of the wrapped tool, if this is a [`Error::ToolFailure`].
    #[must_use]
    pub fn tool_exit_code(&self) -> Option<i32> {
        match self {
            Self::ToolFailure { exit_code, .. } => *exit_code,
            _ => None,
        }
    }
}
