//! Core types and utilities for ardukit
//!
//! Everything the other ardukit crates share lives here:
//! - [`platform`]: classification of the host OS/architecture
//! - [`error`]: the common error taxonomy
//! - [`config`]: layered configuration (defaults, TOML file, environment)
//! - [`output`]: the tagged result of running the wrapped tool
//! - [`bridge`]: the JSON protocol spoken across the native bridge boundary

pub mod bridge;
pub mod config;
pub mod error;
pub mod output;
pub mod platform;

pub use config::{Config, ExecutionMode};
pub use error::{Error, Result};
pub use output::CommandOutput;
pub use platform::{Arch, Artifact, HostPlatform, Platform};
