//! Plain subprocess backend.

use ardukit_core::{CommandOutput, Error, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{Executor, Invocation};

/// Spawns the program directly with tokio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    /// Create a process executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    fn name(&self) -> &'static str {
        "process"
    }

    #[tracing::instrument(
        name = "process_run",
        skip_all,
        fields(program = %invocation.program.display(), command = %invocation.command_line()),
        level = "debug"
    )]
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        // Dropping the wait future on timeout kills the child
        cmd.kill_on_drop(true);

        if let Some(dir) = &invocation.cwd {
            cmd.current_dir(dir);
        }

        let started = std::time::Instant::now();
        let child = cmd
            .spawn()
            .map_err(|e| Error::execution(&invocation.program, e))?;

        let output = match invocation.timeout {
            Some(limit) => timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| {
                    warn!(timeout_ms = limit.as_millis(), "Tool timed out, killed");
                    Error::Timeout {
                        program: invocation.program.clone(),
                        timeout: limit,
                    }
                })?,
            None => child.wait_with_output().await,
        }
        .map_err(|e| Error::execution(&invocation.program, e))?;

        debug!(
            exit_code = ?output.status.code(),
            duration_ms = started.elapsed().as_millis(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Tool finished"
        );

        Ok(CommandOutput::from_bytes(
            &output.stdout,
            &output.stderr,
            output.status.code(),
        ))
    }
}
