//! Argument vectors produced by each facade operation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use ardukit::{ArduinoCli, CommandOutput, Error, Executor, Invocation, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Records invocations and answers with a canned output.
#[derive(Debug)]
struct RecordingExecutor {
    name: &'static str,
    calls: Mutex<Vec<Invocation>>,
    reply: CommandOutput,
}

impl RecordingExecutor {
    fn new(name: &'static str) -> Arc<Self> {
        Self::replying(name, CommandOutput::new("ok", "", Some(0)))
    }

    fn replying(name: &'static str, reply: CommandOutput) -> Arc<Self> {
        Arc::new(Self {
            name,
            calls: Mutex::new(Vec::new()),
            reply,
        })
    }

    fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().iter().map(|inv| inv.args.clone()).collect()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.calls.lock().push(invocation.clone());
        Ok(self.reply.clone())
    }
}

struct Harness {
    cli: ArduinoCli,
    process: Arc<RecordingExecutor>,
    specialized: Arc<RecordingExecutor>,
}

fn harness() -> Harness {
    let process = RecordingExecutor::new("process-recorder");
    let specialized = RecordingExecutor::new("specialized-recorder");
    let cli = ArduinoCli::builder()
        .program("/opt/ardukit/arduino-cli")
        .process_executor(process.clone())
        .specialized_executor(specialized.clone())
        .build()
        .unwrap();
    Harness {
        cli,
        process,
        specialized,
    }
}

fn v(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn test_general_operations() {
    let h = harness();
    h.cli.version().await.unwrap();
    h.cli.board_list().await.unwrap();
    h.cli.board_list_all().await.unwrap();
    h.cli.board_search("uno").await.unwrap();
    h.cli.board_details("arduino:avr:uno").await.unwrap();
    h.cli.core_install("arduino:avr").await.unwrap();
    h.cli.core_list().await.unwrap();
    h.cli.core_update_index().await.unwrap();
    h.cli.lib_search("Servo").await.unwrap();
    h.cli.lib_install("Servo").await.unwrap();
    h.cli.lib_list().await.unwrap();
    h.cli.sketch_new("Blink").await.unwrap();
    h.cli.config_dump().await.unwrap();

    assert_eq!(
        h.process.calls(),
        vec![
            v(&["version"]),
            v(&["board", "list"]),
            v(&["board", "listall"]),
            v(&["board", "search", "uno"]),
            v(&["board", "details", "--fqbn", "arduino:avr:uno"]),
            v(&["core", "install", "arduino:avr"]),
            v(&["core", "list"]),
            v(&["core", "update-index"]),
            v(&["lib", "search", "Servo"]),
            v(&["lib", "install", "Servo"]),
            v(&["lib", "list"]),
            v(&["sketch", "new", "Blink"]),
            v(&["config", "dump"]),
        ]
    );
    assert!(h.specialized.calls().is_empty());
}

#[tokio::test]
async fn test_upload_family() {
    let h = harness();
    h.cli
        .upload_hex("/tmp/Blink.hex", "arduino:avr:uno", "/dev/ttyACM0")
        .await
        .unwrap();
    h.cli
        .compile_and_upload("Blink", "arduino:avr:uno", "/dev/ttyACM0")
        .await
        .unwrap();

    assert_eq!(
        h.process.calls(),
        vec![
            v(&[
                "upload",
                "-p",
                "/dev/ttyACM0",
                "--fqbn",
                "arduino:avr:uno",
                "--input-file",
                "/tmp/Blink.hex"
            ]),
            v(&[
                "compile",
                "--upload",
                "-p",
                "/dev/ttyACM0",
                "--fqbn",
                "arduino:avr:uno",
                "Blink"
            ]),
        ]
    );
}

#[tokio::test]
async fn test_specialized_operations() {
    let h = harness();
    h.cli.compile("Blink", "arduino:avr:uno").await.unwrap();
    h.cli
        .upload("Blink", "arduino:avr:uno", "/dev/ttyACM0")
        .await
        .unwrap();
    h.cli.exec(["board", "list", "--format", "json"]).await.unwrap();
    h.cli.exec_line("  core   search  avr ").await.unwrap();
    h.cli.exec_output(["outdated"]).await.unwrap();

    assert_eq!(
        h.specialized.calls(),
        vec![
            v(&["compile", "--fqbn", "arduino:avr:uno", "Blink"]),
            v(&["upload", "-p", "/dev/ttyACM0", "--fqbn", "arduino:avr:uno", "Blink"]),
            v(&["board", "list", "--format", "json"]),
            v(&["core", "search", "avr"]),
            v(&["outdated"]),
        ]
    );
    assert!(h.process.calls().is_empty());
}

#[tokio::test]
async fn test_arguments_are_passed_as_single_tokens() {
    let h = harness();
    h.cli.sketch_new("My Sketch; rm -rf ~").await.unwrap();
    assert_eq!(
        h.process.calls(),
        vec![v(&["sketch", "new", "My Sketch; rm -rf ~"])]
    );
}

#[tokio::test]
async fn test_missing_arguments_never_reach_the_executor() {
    let h = harness();

    let err = h.cli.board_details("").await.unwrap_err();
    assert!(matches!(
        err,
        Error::MissingArgument {
            operation: "board_details",
            argument: "fqbn"
        }
    ));
    assert!(matches!(
        h.cli.upload("Blink", "arduino:avr:uno", " ").await,
        Err(Error::MissingArgument { argument: "port", .. })
    ));
    assert!(matches!(
        h.cli.exec(Vec::<String>::new()).await,
        Err(Error::MissingArgument { operation: "exec", .. })
    ));
    assert!(matches!(
        h.cli.exec_line("   ").await,
        Err(Error::MissingArgument { .. })
    ));

    assert!(h.process.calls().is_empty());
    assert!(h.specialized.calls().is_empty());
}

#[tokio::test]
async fn test_non_zero_exit_becomes_tool_failure() {
    let failing = RecordingExecutor::replying(
        "failing",
        CommandOutput::new("", "error: board not found\n", Some(1)),
    );
    let cli = ArduinoCli::builder()
        .program("/opt/ardukit/arduino-cli")
        .process_executor(failing.clone())
        .specialized_executor(failing)
        .build()
        .unwrap();

    match cli.board_details("bogus:bogus:bogus").await.unwrap_err() {
        Error::ToolFailure {
            command,
            exit_code,
            stderr,
        } => {
            assert_eq!(command, "board details --fqbn bogus:bogus:bogus");
            assert_eq!(exit_code, Some(1));
            assert_eq!(stderr, "error: board not found");
        }
        other => panic!("expected ToolFailure, got {other:?}"),
    }

    let raw = cli.exec_output(["board", "details"]).await.unwrap();
    assert_eq!(raw.exit_code(), Some(1));
}

#[test]
fn test_invocation_carries_program_timeout_and_cwd() {
    let recorder = RecordingExecutor::new("recorder");
    let cli = ArduinoCli::builder()
        .program("/opt/ardukit/arduino-cli")
        .process_executor(recorder.clone())
        .timeout(Duration::from_secs(42))
        .current_dir("/work")
        .build()
        .unwrap();

    tokio_test::block_on(cli.version()).unwrap();

    let calls = recorder.calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].program.to_str(), Some("/opt/ardukit/arduino-cli"));
    assert_eq!(calls[0].timeout, Some(Duration::from_secs(42)));
    assert_eq!(calls[0].cwd.as_deref().and_then(|p| p.to_str()), Some("/work"));
}
