//! Dispatch of parsed subcommands onto the facade.

use ardukit::{ArduinoCli, CommandOutput};

use crate::cli::{BoardCommands, Commands, CoreCommands, LibCommands, SketchCommands};
use crate::errors::CliResult;

/// Run `command` and return the text to print on stdout.
#[tracing::instrument(skip(cli), level = "debug")]
pub async fn execute(cli: &ArduinoCli, command: Commands) -> CliResult<String> {
    let output: CommandOutput = match command {
        Commands::Version => cli.version().await?,
        Commands::Board { subcommand } => match subcommand {
            BoardCommands::List => cli.board_list().await?,
            BoardCommands::Listall => cli.board_list_all().await?,
            BoardCommands::Search { query } => cli.board_search(&query).await?,
            BoardCommands::Details { fqbn } => cli.board_details(&fqbn).await?,
        },
        Commands::Core { subcommand } => match subcommand {
            CoreCommands::Install { core } => cli.core_install(&core).await?,
            CoreCommands::List => cli.core_list().await?,
            CoreCommands::UpdateIndex => cli.core_update_index().await?,
        },
        Commands::Lib { subcommand } => match subcommand {
            LibCommands::Search { query } => cli.lib_search(&query).await?,
            LibCommands::Install { library } => cli.lib_install(&library).await?,
            LibCommands::List => cli.lib_list().await?,
        },
        Commands::Sketch {
            subcommand: SketchCommands::New { name },
        } => cli.sketch_new(&name).await?,
        Commands::Config => cli.config_dump().await?,
        Commands::Compile {
            fqbn,
            upload,
            port,
            sketch,
        } => match (upload, port) {
            (true, Some(port)) => cli.compile_and_upload(&sketch, &fqbn, &port).await?,
            _ => cli.compile(&sketch, &fqbn).await?,
        },
        Commands::Upload {
            fqbn,
            port,
            input_file,
            sketch,
        } => match (input_file, sketch) {
            (Some(hex), _) => cli.upload_hex(&hex, &fqbn, &port).await?,
            (None, sketch) => {
                cli.upload(sketch.as_deref().unwrap_or_default(), &fqbn, &port)
                    .await?
            }
        },
        Commands::Exec { args } => cli.exec(args).await?,
        Commands::Path => return Ok(cli.cli_path().display().to_string()),
    };

    Ok(output.into_stdout())
}
