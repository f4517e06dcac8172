//! The `ArduinoCli` facade.
//!
//! Each operation maps its parameters onto one arduino-cli argument vector and
//! runs it. A non-zero exit becomes [`Error::ToolFailure`]; `exec_output` is
//! the one exception and hands back the raw [`CommandOutput`].

use ardukit_core::{CommandOutput, Config, Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info_span};

use crate::executor::{Executor, Invocation, ProcessExecutor};
use crate::session::Session;

/// Handle to an arduino-cli binary.
///
/// Cheap to clone; clones share the session and executors.
#[derive(Clone)]
pub struct ArduinoCli {
    program: PathBuf,
    process: Arc<dyn Executor>,
    specialized: Arc<dyn Executor>,
    timeout: Option<Duration>,
    cwd: Option<PathBuf>,
    session: Option<Arc<Session>>,
}

impl std::fmt::Debug for ArduinoCli {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArduinoCli")
            .field("program", &self.program)
            .field("process", &self.process.name())
            .field("specialized", &self.specialized.name())
            .field("timeout", &self.timeout)
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ArduinoCli`].
#[derive(Default)]
pub struct ArduinoCliBuilder {
    program: Option<PathBuf>,
    process: Option<Arc<dyn Executor>>,
    specialized: Option<Arc<dyn Executor>>,
    timeout: Option<Duration>,
    cwd: Option<PathBuf>,
    session: Option<Arc<Session>>,
}

impl ArduinoCliBuilder {
    /// Use this tool binary instead of the session's.
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Executor for the general operations.
    #[must_use]
    pub fn process_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.process = Some(executor);
        self
    }

    /// Executor for compile, upload and exec.
    #[must_use]
    pub fn specialized_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.specialized = Some(executor);
        self
    }

    /// Kill the tool after `timeout`. Overrides the session's configured timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run the tool from this working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Resolve the tool, executors and timeout from `session`.
    #[must_use]
    pub fn session(mut self, session: Arc<Session>) -> Self {
        self.session = Some(session);
        self
    }

    /// Build the facade.
    ///
    /// Anything not set explicitly comes from the session. The specialised
    /// executor falls back to the process executor when there is no session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if neither a program nor a session was
    /// given, and propagates extraction or bridge loading errors from the
    /// session.
    pub fn build(self) -> Result<ArduinoCli> {
        let program = match (self.program, &self.session) {
            (Some(program), _) => program,
            (None, Some(session)) => session.cli_path()?,
            (None, None) => {
                return Err(Error::configuration(
                    "no arduino-cli binary: set a program path or attach a session",
                ));
            }
        };

        let process = self
            .process
            .unwrap_or_else(|| Arc::new(ProcessExecutor::new()));
        let specialized = match (self.specialized, &self.session) {
            (Some(executor), _) => executor,
            (None, Some(session)) => session.specialized_executor()?,
            (None, None) => Arc::clone(&process),
        };
        let timeout = self.timeout.or_else(|| {
            self.session
                .as_ref()
                .and_then(|session| session.config().timeout())
        });

        debug!(
            program = %program.display(),
            process = process.name(),
            specialized = specialized.name(),
            timeout_ms = ?timeout.map(|t| t.as_millis()),
            "Built arduino-cli facade"
        );

        Ok(ArduinoCli {
            program,
            process,
            specialized,
            timeout,
            cwd: self.cwd,
            session: self.session,
        })
    }
}

impl ArduinoCli {
    /// Facade over the embedded tool, configured from the environment.
    ///
    /// Loads [`Config`] from its default locations, then creates a session
    /// for the detected host.
    ///
    /// # Errors
    ///
    /// Propagates configuration, platform and extraction errors.
    pub fn new() -> Result<Self> {
        let config = Config::load(None)?;
        Self::from_session(Arc::new(Session::new(config)?))
    }

    /// Facade bound to `session`. The session stays alive as long as the facade.
    ///
    /// # Errors
    ///
    /// Propagates extraction or bridge loading errors.
    pub fn from_session(session: Arc<Session>) -> Result<Self> {
        Self::builder().session(session).build()
    }

    /// Start building a facade.
    #[must_use]
    pub fn builder() -> ArduinoCliBuilder {
        ArduinoCliBuilder::default()
    }

    /// Path of the resolved tool binary.
    #[must_use]
    pub fn cli_path(&self) -> &Path {
        &self.program
    }

    /// Session this facade was built from, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Arc<Session>> {
        self.session.as_ref()
    }

    /// `arduino-cli version`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailure`] on a non-zero exit, or any execution error.
    pub async fn version(&self) -> Result<CommandOutput> {
        self.general(vec!["version".into()]).await
    }

    /// `arduino-cli board list`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailure`] on a non-zero exit, or any execution error.
    pub async fn board_list(&self) -> Result<CommandOutput> {
        self.general(args(["board", "list"])).await
    }

    /// `arduino-cli board listall`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ToolFailure`] on a non-zero exit, or any execution error.
    pub async fn board_list_all(&self) -> Result<CommandOutput> {
        self.general(args(["board", "listall"])).await
    }

    /// `arduino-cli board search <query>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty query, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn board_search(&self, query: &str) -> Result<CommandOutput> {
        let query = require("board_search", "query", query)?;
        self.general(args(["board", "search", query])).await
    }

    /// `arduino-cli board details --fqbn <fqbn>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty FQBN, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn board_details(&self, fqbn: &str) -> Result<CommandOutput> {
        let fqbn = require("board_details", "fqbn", fqbn)?;
        self.general(args(["board", "details", "--fqbn", fqbn])).await
    }

    /// `arduino-cli core install <core>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty core name, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn core_install(&self, core: &str) -> Result<CommandOutput> {
        let core = require("core_install", "core", core)?;
        self.general(args(["core", "install", core])).await
    }

    /// `arduino-cli core list`
    ///
    /// # Errors
    ///
    /// As [`ArduinoCli::version`].
    pub async fn core_list(&self) -> Result<CommandOutput> {
        self.general(args(["core", "list"])).await
    }

    /// `arduino-cli core update-index`
    ///
    /// # Errors
    ///
    /// As [`ArduinoCli::version`].
    pub async fn core_update_index(&self) -> Result<CommandOutput> {
        self.general(args(["core", "update-index"])).await
    }

    /// `arduino-cli lib search <query>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty query, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn lib_search(&self, query: &str) -> Result<CommandOutput> {
        let query = require("lib_search", "query", query)?;
        self.general(args(["lib", "search", query])).await
    }

    /// `arduino-cli lib install <library>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty library name, otherwise
    /// as [`ArduinoCli::version`].
    pub async fn lib_install(&self, library: &str) -> Result<CommandOutput> {
        let library = require("lib_install", "library", library)?;
        self.general(args(["lib", "install", library])).await
    }

    /// `arduino-cli lib list`
    ///
    /// # Errors
    ///
    /// As [`ArduinoCli::version`].
    pub async fn lib_list(&self) -> Result<CommandOutput> {
        self.general(args(["lib", "list"])).await
    }

    /// `arduino-cli sketch new <name>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty name, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn sketch_new(&self, name: &str) -> Result<CommandOutput> {
        let name = require("sketch_new", "name", name)?;
        self.general(args(["sketch", "new", name])).await
    }

    /// `arduino-cli config dump`
    ///
    /// # Errors
    ///
    /// As [`ArduinoCli::version`].
    pub async fn config_dump(&self) -> Result<CommandOutput> {
        self.general(args(["config", "dump"])).await
    }

    /// `arduino-cli compile --fqbn <fqbn> <sketch>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty sketch or FQBN, otherwise
    /// as [`ArduinoCli::version`].
    pub async fn compile(&self, sketch: &str, fqbn: &str) -> Result<CommandOutput> {
        let sketch = require("compile", "sketch", sketch)?;
        let fqbn = require("compile", "fqbn", fqbn)?;
        self.specialized(args(["compile", "--fqbn", fqbn, sketch]))
            .await
    }

    /// `arduino-cli upload -p <port> --fqbn <fqbn> <sketch>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty sketch, FQBN or port,
    /// otherwise as [`ArduinoCli::version`].
    pub async fn upload(&self, sketch: &str, fqbn: &str, port: &str) -> Result<CommandOutput> {
        let sketch = require("upload", "sketch", sketch)?;
        let fqbn = require("upload", "fqbn", fqbn)?;
        let port = require("upload", "port", port)?;
        self.specialized(args(["upload", "-p", port, "--fqbn", fqbn, sketch]))
            .await
    }

    /// `arduino-cli upload -p <port> --fqbn <fqbn> --input-file <hex>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty hex path, FQBN or port,
    /// otherwise as [`ArduinoCli::version`].
    pub async fn upload_hex(&self, hex: &str, fqbn: &str, port: &str) -> Result<CommandOutput> {
        let hex = require("upload_hex", "hex", hex)?;
        let fqbn = require("upload_hex", "fqbn", fqbn)?;
        let port = require("upload_hex", "port", port)?;
        self.general(args([
            "upload",
            "-p",
            port,
            "--fqbn",
            fqbn,
            "--input-file",
            hex,
        ]))
        .await
    }

    /// `arduino-cli compile --upload -p <port> --fqbn <fqbn> <sketch>`
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty sketch, FQBN or port,
    /// otherwise as [`ArduinoCli::version`].
    pub async fn compile_and_upload(
        &self,
        sketch: &str,
        fqbn: &str,
        port: &str,
    ) -> Result<CommandOutput> {
        let sketch = require("compile_and_upload", "sketch", sketch)?;
        let fqbn = require("compile_and_upload", "fqbn", fqbn)?;
        let port = require("compile_and_upload", "port", port)?;
        self.general(args([
            "compile", "--upload", "-p", port, "--fqbn", fqbn, sketch,
        ]))
        .await
    }

    /// Run arbitrary arguments verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty argument list,
    /// otherwise as [`ArduinoCli::version`].
    pub async fn exec<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = require_args("exec", args)?;
        self.specialized(args).await
    }

    /// Run a whitespace-separated argument line. No quoting or other shell
    /// interpretation is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for a blank line, otherwise as
    /// [`ArduinoCli::version`].
    pub async fn exec_line(&self, line: &str) -> Result<CommandOutput> {
        let args = require_args("exec_line", line.split_whitespace())?;
        self.specialized(args).await
    }

    /// Run arbitrary arguments and return the output whatever the exit status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingArgument`] for an empty argument list, or an
    /// execution error if the tool could not be run at all.
    pub async fn exec_output<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = require_args("exec_output", args)?;
        self.run(self.specialized.as_ref(), args).await
    }

    async fn general(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.checked(self.process.as_ref(), args).await
    }

    async fn specialized(&self, args: Vec<String>) -> Result<CommandOutput> {
        self.checked(self.specialized.as_ref(), args).await
    }

    async fn checked(&self, executor: &dyn Executor, args: Vec<String>) -> Result<CommandOutput> {
        let command = args.join(" ");
        self.run(executor, args).await?.into_result(command)
    }

    async fn run(&self, executor: &dyn Executor, args: Vec<String>) -> Result<CommandOutput> {
        let invocation = Invocation::new(&self.program)
            .args(args)
            .current_dir(self.cwd.clone())
            .timeout(self.timeout);

        let span = info_span!(
            "arduino_cli",
            operation_id = %uuid::Uuid::new_v4(),
            executor = executor.name(),
            command = %invocation.command_line(),
        );
        async {
            let output = executor.run(&invocation).await?;
            debug!(exit_code = ?output.exit_code(), "Command completed");
            Ok::<_, Error>(output)
        }
        .instrument(span)
        .await
    }
}

fn args<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.into_iter().map(str::to_string).collect()
}

fn require<'a>(operation: &'static str, argument: &'static str, value: &'a str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(Error::MissingArgument {
            operation,
            argument,
        })
    } else {
        Ok(value)
    }
}

fn require_args<I, S>(operation: &'static str, args: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    if args.is_empty() {
        Err(Error::MissingArgument {
            operation,
            argument: "args",
        })
    } else {
        Ok(args)
    }
}
