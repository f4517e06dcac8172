//! Error reporting for the ardukit CLI
//!
//! A failing arduino-cli run is reported the way arduino-cli itself reports
//! it: its stderr verbatim and its exit code. Everything else goes through
//! miette.

use miette::Diagnostic;
use thiserror::Error;

/// Exit code for errors that did not come from the wrapped tool.
pub const EXIT_FAILURE: i32 = 1;

/// CLI-specific error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Ardukit(#[from] ardukit::Error),

    #[error("Tracing initialization failed: {message}")]
    #[diagnostic(
        code(ardukit::cli::tracing_error),
        help("Check the RUST_LOG environment variable and the --level flag")
    )]
    Tracing { message: String },

    #[error("Failed to write output")]
    #[diagnostic(code(ardukit::cli::output_error))]
    Output {
        #[source]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn tracing(message: impl Into<String>) -> Self {
        Self::Tracing {
            message: message.into(),
        }
    }

    /// Process exit code for this error.
    ///
    /// A tool failure keeps the tool's own code. A failure without a code
    /// (killed by a signal) maps to [`EXIT_FAILURE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Ardukit(err) => err
                .tool_exit_code()
                .filter(|code| *code != 0)
                .unwrap_or(EXIT_FAILURE),
            _ => EXIT_FAILURE,
        }
    }

    /// Text to print on stderr.
    pub fn render(self) -> String {
        match self {
            Self::Ardukit(ardukit::Error::ToolFailure { stderr, .. }) => stderr,
            other => format!("{:?}", miette::Report::new(other)),
        }
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
