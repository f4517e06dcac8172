//! Process-scoped context shared by facade instances.

use ardukit_bundle::{DirectoryResources, EmbeddedResources, Extractor, ResourceSource};
use ardukit_core::{Artifact, Config, ExecutionMode, HostPlatform, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::executor::{BridgeExecutor, Executor, NativeBridge, ProcessExecutor};

/// Host platform, artifact extractor and configuration for one process.
///
/// Extracted artifacts live as long as the session; dropping it removes
/// their temporary directories.
#[derive(Debug)]
pub struct Session {
    config: Config,
    extractor: Extractor,
    bridge: Mutex<Option<Arc<NativeBridge>>>,
}

impl Session {
    /// Create a session for the detected host.
    ///
    /// Artifacts come from `config.resources_dir` when set, otherwise from the
    /// table embedded at build time.
    ///
    /// # Errors
    ///
    /// Returns [`ardukit_core::Error::UnsupportedPlatform`] if the host OS or
    /// architecture is not recognised.
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_host(config, HostPlatform::detect()?))
    }

    /// Create a session for an explicit host platform.
    #[must_use]
    pub fn with_host(config: Config, host: HostPlatform) -> Self {
        let source: Arc<dyn ResourceSource> = match &config.resources_dir {
            Some(dir) => Arc::new(DirectoryResources::new(dir)),
            None => Arc::new(EmbeddedResources::new()),
        };
        Self::with_source(config, host, source)
    }

    /// Create a session reading artifacts from `source`.
    #[must_use]
    pub fn with_source(config: Config, host: HostPlatform, source: Arc<dyn ResourceSource>) -> Self {
        let mut extractor = Extractor::new(host, source);
        if let Some(root) = &config.extract_dir {
            extractor = extractor.with_temp_root(root);
        }
        debug!(%host, mode = ?config.execution_mode(), "Created session");
        Self {
            config,
            extractor,
            bridge: Mutex::new(None),
        }
    }

    /// Effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Host platform artifacts are resolved for.
    #[must_use]
    pub fn host(&self) -> HostPlatform {
        self.extractor.host()
    }

    /// The session's artifact extractor.
    #[must_use]
    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    /// Path of the arduino-cli binary to run.
    ///
    /// `config.cli_path` wins; otherwise the embedded binary is extracted on
    /// first use.
    ///
    /// # Errors
    ///
    /// Propagates extraction errors.
    pub fn cli_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config.cli_path {
            return Ok(path.clone());
        }
        self.extractor.extract(Artifact::Cli)
    }

    /// The loaded native bridge, extracting and loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns extraction errors or [`ardukit_core::Error::BridgeLoadFailure`].
    pub fn bridge(&self) -> Result<Arc<NativeBridge>> {
        let mut slot = self.bridge.lock();
        if let Some(bridge) = slot.as_ref() {
            return Ok(Arc::clone(bridge));
        }

        let path = self.extractor.extract(Artifact::Bridge)?;
        let bridge = Arc::new(NativeBridge::load(&path)?);
        info!(path = %path.display(), "Native bridge ready");
        *slot = Some(Arc::clone(&bridge));
        Ok(bridge)
    }

    /// Executor for the specialised operations, per `execution_mode`.
    ///
    /// # Errors
    ///
    /// In bridge mode, propagates [`Session::bridge`] errors.
    pub fn specialized_executor(&self) -> Result<Arc<dyn Executor>> {
        match self.config.execution_mode() {
            ExecutionMode::Process => Ok(Arc::new(ProcessExecutor::new())),
            ExecutionMode::Bridge => Ok(Arc::new(BridgeExecutor::new(self.bridge()?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ardukit_core::{Arch, Error, Platform};

    static TABLE: &[(&str, &[u8])] = &[("arduino-cli/linux-x86_64/arduino-cli", b"#!/bin/sh\n")];

    fn session(config: Config) -> (tempfile::TempDir, Session) {
        let temp = tempfile::TempDir::new().unwrap();
        let config = Config {
            extract_dir: Some(temp.path().to_path_buf()),
            ..config
        };
        let session = Session::with_source(
            config,
            HostPlatform::new(Platform::Linux, Arch::X86_64),
            Arc::new(EmbeddedResources::from_table(TABLE)),
        );
        (temp, session)
    }

    #[test]
    fn test_cli_path_extracts_once() {
        let (temp, session) = session(Config::default());
        let first = session.cli_path().unwrap();
        let second = session.cli_path().unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with(temp.path()));
        assert_eq!(session.extractor().extractions(), 1);
    }

    #[test]
    fn test_cli_path_override_skips_extraction() {
        let (_temp, session) = session(Config {
            cli_path: Some(PathBuf::from("/usr/local/bin/arduino-cli")),
            ..Config::default()
        });
        assert_eq!(
            session.cli_path().unwrap(),
            PathBuf::from("/usr/local/bin/arduino-cli")
        );
        assert_eq!(session.extractor().extractions(), 0);
    }

    #[test]
    fn test_missing_bridge_resource() {
        let (_temp, session) = session(Config {
            execution_mode: Some(ExecutionMode::Bridge),
            ..Config::default()
        });
        let Err(err) = session.specialized_executor() else {
            panic!("bridge mode without a bridge artifact must fail");
        };
        assert!(matches!(err, Error::ResourceNotFound { .. }));
    }

    #[test]
    fn test_process_mode_is_default() {
        let (_temp, session) = session(Config::default());
        assert_eq!(session.specialized_executor().unwrap().name(), "process");
    }
}
