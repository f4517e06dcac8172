//! Spawn, wait and capture on behalf of the host.

use ardukit_core::CommandOutput;
use ardukit_core::bridge::{
    BridgeError, BridgeRequest, ERROR_CODE_SPAWN, ERROR_CODE_TIMEOUT, ERROR_CODE_WAIT,
};
use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
/// How long pipe readers get to finish once the child's process group is killed.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

type Reader = JoinHandle<io::Result<Vec<u8>>>;

/// Run the requested program to completion and capture its output.
///
/// A non-zero exit is not an error here; it is reported through
/// [`CommandOutput::exit_code`]. The timeout covers both the child's exit and
/// the draining of its pipes, so a background process that inherited them
/// cannot hold the call open.
///
/// # Errors
///
/// Returns a [`BridgeError`] with code `SPAWN` if the program cannot be
/// started, `TIMEOUT` if it outlives `timeout_ms`, or `WAIT` if waiting on
/// it or draining its pipes fails.
pub fn run(request: &BridgeRequest) -> Result<CommandOutput, BridgeError> {
    let mut command = Command::new(&request.program);
    command
        .args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(cwd) = &request.cwd {
        command.current_dir(cwd);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group, so a timeout also reaches anything the tool spawned.
        command.process_group(0);
    }

    let mut child = command.spawn().map_err(|e| {
        BridgeError::new(ERROR_CODE_SPAWN, format!("{}: {e}", request.program))
    })?;
    tracing::debug!(program = %request.program, pid = child.id(), "Spawned child");

    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let timeout = request.timeout_ms.map(Duration::from_millis);
    match settle(&mut child, [stdout.as_ref(), stderr.as_ref()], timeout) {
        Ok(status) => {
            let stdout = collect(stdout)?;
            let stderr = collect(stderr)?;
            Ok(CommandOutput::from_bytes(&stdout, &stderr, status.code()))
        }
        Err(e) => {
            terminate(&mut child);
            release([stdout, stderr]);
            if e.kind() == io::ErrorKind::TimedOut {
                tracing::warn!(program = %request.program, "Child timed out");
                Err(BridgeError::new(
                    ERROR_CODE_TIMEOUT,
                    format!("{} timed out: {e}", request.program),
                ))
            } else {
                Err(BridgeError::new(
                    ERROR_CODE_WAIT,
                    format!("{}: {e}", request.program),
                ))
            }
        }
    }
}

/// Wait until the child has exited and both pipes are drained.
///
/// Fails with [`io::ErrorKind::TimedOut`] once `timeout` has elapsed; the
/// caller is responsible for killing and reaping the child.
fn settle(
    child: &mut Child,
    readers: [Option<&Reader>; 2],
    timeout: Option<Duration>,
) -> io::Result<ExitStatus> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut exited = None;
    loop {
        if exited.is_none() {
            exited = child.try_wait()?;
        }
        if let Some(status) = exited {
            if readers.iter().flatten().all(|r| r.is_finished()) {
                return Ok(status);
            }
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            let millis = timeout.map_or(0, |t| t.as_millis());
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("killed after {millis}ms"),
            ));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill the child and everything in its process group, then reap it.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
            // SAFETY: signals the process group created at spawn; no memory is shared.
            unsafe {
                libc::kill(-pgid, libc::SIGKILL);
            }
        }
    }
    // Kill may race with a natural exit; either way reap the child.
    let _ = child.kill();
    let _ = child.wait();
}

/// Join the pipe readers, giving them [`DRAIN_GRACE`] to see end of file.
fn release(readers: [Option<Reader>; 2]) {
    let grace = Instant::now() + DRAIN_GRACE;
    for reader in readers.into_iter().flatten() {
        while !reader.is_finished() && Instant::now() < grace {
            thread::sleep(POLL_INTERVAL);
        }
        if reader.is_finished() {
            let _ = reader.join();
        } else {
            tracing::warn!("Pipe reader still blocked after kill, detaching it");
        }
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> Reader {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(reader: Option<Reader>) -> Result<Vec<u8>, BridgeError> {
    let Some(reader) = reader else {
        return Ok(Vec::new());
    };
    reader
        .join()
        .map_err(|_| BridgeError::new(ERROR_CODE_WAIT, "pipe reader thread panicked"))?
        .map_err(|e| BridgeError::new(ERROR_CODE_WAIT, format!("reading child output: {e}")))
}
