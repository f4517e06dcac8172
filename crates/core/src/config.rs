//! Configuration types for ardukit
//!
//! Values are layered: built-in defaults, then a TOML file, then `ARDUKIT_*`
//! environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{Error, Result};

/// Environment variable naming an explicit config file.
pub const ENV_CONFIG: &str = "ARDUKIT_CONFIG";
/// Environment variable overriding [`Config::cli_path`].
pub const ENV_CLI_PATH: &str = "ARDUKIT_CLI_PATH";
/// Environment variable overriding [`Config::resources_dir`].
pub const ENV_RESOURCES_DIR: &str = "ARDUKIT_RESOURCES_DIR";
/// Environment variable overriding [`Config::extract_dir`].
pub const ENV_EXTRACT_DIR: &str = "ARDUKIT_EXTRACT_DIR";
/// Environment variable overriding [`Config::timeout_secs`].
pub const ENV_TIMEOUT_SECS: &str = "ARDUKIT_TIMEOUT_SECS";
/// Environment variable overriding [`Config::execution_mode`].
pub const ENV_EXECUTION_MODE: &str = "ARDUKIT_EXECUTION_MODE";

/// How the specialised operations (compile, upload, exec) launch the tool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Spawn the tool directly as a subprocess.
    #[default]
    Process,
    /// Route through the embedded native bridge library.
    Bridge,
}

impl std::str::FromStr for ExecutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "process" => Ok(Self::Process),
            "bridge" => Ok(Self::Bridge),
            other => Err(Error::configuration(format!(
                "unknown execution mode '{other}' (expected 'process' or 'bridge')"
            ))),
        }
    }
}

/// Main configuration structure for ardukit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Use an installed arduino-cli instead of the embedded one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<PathBuf>,

    /// Serve artifacts from this directory instead of the embedded table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources_dir: Option<PathBuf>,

    /// Root under which temporary extraction directories are created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract_dir: Option<PathBuf>,

    /// Kill the tool after this many seconds. Unbounded when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Launch style for compile/upload/exec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_mode: Option<ExecutionMode>,
}

impl Config {
    /// Load configuration from the first config file found, then apply
    /// environment overrides.
    ///
    /// The file is `explicit` if given, else `$ARDUKIT_CONFIG`, else
    /// `<config dir>/ardukit/config.toml` when it exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a named file cannot be read or
    /// parsed, or if an environment override is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the file is unreadable or invalid.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&contents)
            .map_err(|e| Error::configuration(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Parse TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] on syntax or schema errors.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::configuration(e.to_string()))
    }

    /// Apply `ARDUKIT_*` overrides using `lookup` to read variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a numeric or enum override fails to parse.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = non_empty(ENV_CLI_PATH) {
            self.cli_path = Some(PathBuf::from(path));
        }
        if let Some(dir) = non_empty(ENV_RESOURCES_DIR) {
            self.resources_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(ENV_EXTRACT_DIR) {
            self.extract_dir = Some(PathBuf::from(dir));
        }
        if let Some(secs) = non_empty(ENV_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                Error::configuration(format!("{ENV_TIMEOUT_SECS}='{secs}': {e}"))
            })?;
            self.timeout_secs = Some(secs);
        }
        if let Some(mode) = non_empty(ENV_EXECUTION_MODE) {
            self.execution_mode = Some(mode.parse()?);
        }
        Ok(())
    }

    /// Configured timeout. A value of zero disables the timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Configured execution mode, defaulting to [`ExecutionMode::Process`].
    #[must_use]
    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode.unwrap_or_default()
    }
}

/// Default location of the user config file.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ardukit").join("config.toml"))
}
