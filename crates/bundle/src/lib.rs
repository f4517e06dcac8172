//! Embedded arduino-cli artifacts for ardukit.
//!
//! This crate provides functionality to:
//! - Look up per-platform artifacts by resource locator ([`ResourceSource`])
//! - Extract them to fresh temporary directories, once per artifact ([`Extractor`])
//!
//! # Example
//!
//! ```ignore
//! use ardukit_bundle::{EmbeddedResources, Extractor};
//! use ardukit_core::{Artifact, HostPlatform};
//! use std::sync::Arc;
//!
//! let extractor = Extractor::new(HostPlatform::detect()?, Arc::new(EmbeddedResources::new()));
//! let cli = extractor.extract(Artifact::Cli)?;
//! ```

mod extract;
mod resources;

pub use extract::{Extractor, TEMP_DIR_PREFIX};
pub use resources::{DirectoryResources, EmbeddedResources, ResourceSource};
