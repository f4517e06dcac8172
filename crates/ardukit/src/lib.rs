//! Embedded arduino-cli for Rust.
//!
//! ardukit ships a per-platform arduino-cli binary inside your program,
//! extracts it on first use and drives it through a typed facade.
//!
//! ```ignore
//! use ardukit::ArduinoCli;
//!
//! let cli = ArduinoCli::new()?;
//! println!("{}", cli.version().await?.stdout());
//! cli.compile("Blink", "arduino:avr:uno").await?;
//! ```
//!
//! - [`Session`] holds the host platform, extractor and configuration
//! - [`executor`] runs invocations, either as subprocesses or through the
//!   native bridge library
//! - [`ArduinoCli`] maps named operations onto argument vectors

pub mod cli;
pub mod executor;
pub mod session;

pub use cli::{ArduinoCli, ArduinoCliBuilder};
pub use executor::{BridgeExecutor, Executor, Invocation, NativeBridge, ProcessExecutor};
pub use session::Session;

pub use ardukit_core::{
    Arch, Artifact, CommandOutput, Config, Error, ExecutionMode, HostPlatform, Platform, Result,
};
