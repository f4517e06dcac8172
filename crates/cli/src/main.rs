// The binary is the one place allowed to print.
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;
mod commands;
mod errors;
mod tracing;

use ardukit::{ArduinoCli, Config, ExecutionMode, Session};
use std::io::Write;
use std::sync::Arc;
use ::tracing::Instrument;

use crate::cli::Cli;
use crate::errors::{CliError, CliResult};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let args = cli::parse();

    let code = match run(args).await {
        Ok(()) => 0,
        Err(error) => {
            let code = error.exit_code();
            let rendered = error.render();
            if !rendered.is_empty() {
                eprintln!("{rendered}");
            }
            code
        }
    };
    std::process::exit(code);
}

async fn run(args: Cli) -> CliResult<()> {
    crate::tracing::init_tracing(&args.tracing_config())?;

    let cli = facade(&args)?;
    let span = ::tracing::info_span!(
        "command",
        command = ?args.command,
        correlation_id = %crate::tracing::correlation_id(),
    );
    let stdout = commands::execute(&cli, args.command)
        .instrument(span)
        .await?;

    if !stdout.is_empty() {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{stdout}").map_err(|source| CliError::Output { source })?;
    }
    Ok(())
}

/// Layer the command-line flags over the loaded configuration and build the facade.
fn facade(args: &Cli) -> CliResult<ArduinoCli> {
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(secs) = args.timeout {
        config.timeout_secs = Some(secs);
    }
    if args.bridge {
        config.execution_mode = Some(ExecutionMode::Bridge);
    }
    ::tracing::debug!(?config, "Effective configuration");

    let session = Arc::new(Session::new(config)?);
    Ok(ArduinoCli::from_session(session)?)
}
