use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::tracing::{LogLevel, TracingConfig, TracingFormat};

#[derive(Parser, Debug)]
#[command(name = "ardukit")]
#[command(about = "Run the arduino-cli embedded in ardukit without installing it")]
#[command(long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 'l',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    #[arg(long, global = true, help = "Output logs in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        value_enum,
        value_name = "FORMAT",
        conflicts_with = "json",
        help = "Log output format"
    )]
    pub log_format: Option<TracingFormat>,

    #[arg(
        long,
        global = true,
        value_name = "DIRECTIVES",
        help = "Tracing filter directives, overriding --level and RUST_LOG"
    )]
    pub log_filter: Option<String>,

    #[arg(long, global = true, value_name = "PATH", help = "Read configuration from this TOML file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "SECS", help = "Kill arduino-cli after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(long, global = true, help = "Run compile, upload and exec through the native bridge")]
    pub bridge: bool,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    #[command(about = "Show the arduino-cli version")]
    Version,
    #[command(about = "Board operations")]
    Board {
        #[command(subcommand)]
        subcommand: BoardCommands,
    },
    #[command(about = "Platform core operations")]
    Core {
        #[command(subcommand)]
        subcommand: CoreCommands,
    },
    #[command(about = "Library operations")]
    Lib {
        #[command(subcommand)]
        subcommand: LibCommands,
    },
    #[command(about = "Sketch operations")]
    Sketch {
        #[command(subcommand)]
        subcommand: SketchCommands,
    },
    #[command(about = "Dump the arduino-cli configuration")]
    Config,
    #[command(about = "Compile a sketch, optionally uploading it")]
    Compile {
        #[arg(long, help = "Fully qualified board name, e.g. arduino:avr:uno")]
        fqbn: String,
        #[arg(long, requires = "port", help = "Upload after compiling")]
        upload: bool,
        #[arg(short = 'p', long, help = "Serial port to upload to")]
        port: Option<String>,
        #[arg(help = "Sketch directory")]
        sketch: String,
    },
    #[command(about = "Upload a sketch or a prebuilt hex file")]
    Upload {
        #[arg(long, help = "Fully qualified board name, e.g. arduino:avr:uno")]
        fqbn: String,
        #[arg(short = 'p', long, help = "Serial port to upload to")]
        port: String,
        #[arg(long, value_name = "HEX", conflicts_with = "sketch", help = "Upload this file instead of a sketch")]
        input_file: Option<String>,
        #[arg(required_unless_present = "input_file", help = "Sketch directory")]
        sketch: Option<String>,
    },
    #[command(about = "Pass arguments to arduino-cli verbatim")]
    Exec {
        #[arg(
            required = true,
            trailing_var_arg = true,
            allow_hyphen_values = true,
            help = "Arguments for arduino-cli"
        )]
        args: Vec<String>,
    },
    #[command(about = "Print the path of the arduino-cli binary in use")]
    Path,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum BoardCommands {
    #[command(about = "List connected boards")]
    List,
    #[command(about = "List all known boards")]
    Listall,
    #[command(about = "Search boards by name")]
    Search { query: String },
    #[command(about = "Show details of a board")]
    Details {
        #[arg(long)]
        fqbn: String,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum CoreCommands {
    #[command(about = "Install a platform core")]
    Install { core: String },
    #[command(about = "List installed cores")]
    List,
    #[command(about = "Update the core index")]
    UpdateIndex,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum LibCommands {
    #[command(about = "Search libraries")]
    Search { query: String },
    #[command(about = "Install a library")]
    Install { library: String },
    #[command(about = "List installed libraries")]
    List,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum SketchCommands {
    #[command(about = "Create a new sketch")]
    New { name: String },
}

pub fn parse() -> Cli {
    Cli::parse()
}

impl Cli {
    /// Tracing settings selected by the global logging flags.
    pub fn tracing_config(&self) -> TracingConfig {
        let format = match (self.log_format, self.json) {
            (Some(format), _) => format,
            (None, true) => TracingFormat::Json,
            (None, false) => TracingFormat::Compact,
        };
        TracingConfig {
            format,
            level: self.level.into(),
            filter: self.log_filter.clone(),
            ..TracingConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::try_parse_from(["ardukit", "version"]).unwrap();

        assert_eq!(cli.level, LogLevel::Warn);
        assert!(!cli.json);
        assert!(!cli.bridge);
        assert!(cli.config.is_none());
        assert!(cli.timeout.is_none());
        assert_eq!(cli.command, Commands::Version);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ardukit", "board", "list", "--level", "debug", "--json", "--timeout", "30", "--bridge",
        ])
        .unwrap();
        assert_eq!(cli.level, LogLevel::Debug);
        assert!(cli.json);
        assert!(cli.bridge);
        assert_eq!(cli.timeout, Some(30));
    }

    #[test]
    fn test_log_format_selection() {
        let cli = Cli::try_parse_from(["ardukit", "version"]).unwrap();
        assert_eq!(cli.tracing_config().format, TracingFormat::Compact);

        let cli = Cli::try_parse_from(["ardukit", "--json", "version"]).unwrap();
        assert_eq!(cli.tracing_config().format, TracingFormat::Json);

        for (flag, format) in [
            ("pretty", TracingFormat::Pretty),
            ("dev", TracingFormat::Dev),
            ("compact", TracingFormat::Compact),
        ] {
            let cli = Cli::try_parse_from(["ardukit", "--log-format", flag, "version"]).unwrap();
            assert_eq!(cli.tracing_config().format, format);
        }

        assert!(
            Cli::try_parse_from(["ardukit", "--json", "--log-format", "dev", "version"]).is_err()
        );
    }

    #[test]
    fn test_log_filter_and_level() {
        let cli = Cli::try_parse_from([
            "ardukit",
            "--level",
            "debug",
            "--log-filter",
            "ardukit=trace",
            "version",
        ])
        .unwrap();
        let config = cli.tracing_config();
        assert_eq!(config.level, ::tracing::Level::DEBUG);
        assert_eq!(config.filter.as_deref(), Some("ardukit=trace"));
    }

    #[test]
    fn test_board_details_requires_fqbn() {
        assert!(Cli::try_parse_from(["ardukit", "board", "details"]).is_err());
        let cli =
            Cli::try_parse_from(["ardukit", "board", "details", "--fqbn", "arduino:avr:uno"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Board {
                subcommand: BoardCommands::Details {
                    fqbn: "arduino:avr:uno".to_string()
                }
            }
        );
    }

    #[test]
    fn test_compile_upload_requires_port() {
        assert!(
            Cli::try_parse_from(["ardukit", "compile", "--fqbn", "a:b:c", "--upload", "Blink"])
                .is_err()
        );
        let cli = Cli::try_parse_from([
            "ardukit", "compile", "--fqbn", "a:b:c", "--upload", "-p", "/dev/ttyUSB0", "Blink",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Compile { upload: true, .. }));
    }

    #[test]
    fn test_upload_sketch_or_input_file() {
        assert!(Cli::try_parse_from(["ardukit", "upload", "--fqbn", "a:b:c", "-p", "COM3"]).is_err());
        assert!(
            Cli::try_parse_from([
                "ardukit", "upload", "--fqbn", "a:b:c", "-p", "COM3", "--input-file", "x.hex",
                "Blink",
            ])
            .is_err()
        );
        let cli = Cli::try_parse_from([
            "ardukit", "upload", "--fqbn", "a:b:c", "-p", "COM3", "--input-file", "x.hex",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Upload { input_file: Some(_), sketch: None, .. }
        ));
    }

    #[test]
    fn test_exec_keeps_hyphenated_args() {
        let cli = Cli::try_parse_from([
            "ardukit", "exec", "--", "board", "list", "--format", "json",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            Commands::Exec {
                args: vec!["board", "list", "--format", "json"]
                    .into_iter()
                    .map(String::from)
                    .collect()
            }
        );
    }

    #[test]
    fn test_core_update_index_name() {
        let cli = Cli::try_parse_from(["ardukit", "core", "update-index"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Core {
                subcommand: CoreCommands::UpdateIndex
            }
        );
    }
}
