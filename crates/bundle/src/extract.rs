//! Extraction of embedded artifacts to the filesystem.
//!
//! Each artifact is written to its own freshly created temporary directory
//! the first time it is requested. The resulting path is memoised until the
//! [`Extractor`] is dropped, at which point the directories are removed.

use ardukit_core::{Artifact, Error, HostPlatform, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, trace};

use crate::ResourceSource;

/// Prefix of every extraction directory.
pub const TEMP_DIR_PREFIX: &str = "ardukit_";

/// An artifact written to disk, owning its temporary directory.
#[derive(Debug)]
struct ExtractedArtifact {
    path: PathBuf,
    _dir: TempDir,
}

/// Memoising artifact extractor.
///
/// The cache lock is held for the whole check-extract-store sequence, so
/// concurrent first use of the same artifact performs a single extraction
/// and every caller observes the same path.
#[derive(Debug)]
pub struct Extractor {
    host: HostPlatform,
    source: Arc<dyn ResourceSource>,
    temp_root: Option<PathBuf>,
    cache: Mutex<HashMap<Artifact, ExtractedArtifact>>,
    extractions: AtomicUsize,
}

impl Extractor {
    /// Create an extractor for `host` reading from `source`.
    #[must_use]
    pub fn new(host: HostPlatform, source: Arc<dyn ResourceSource>) -> Self {
        Self {
            host,
            source,
            temp_root: None,
            cache: Mutex::new(HashMap::new()),
            extractions: AtomicUsize::new(0),
        }
    }

    /// Create extraction directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    /// Host platform artifacts are resolved for.
    #[must_use]
    pub fn host(&self) -> HostPlatform {
        self.host
    }

    /// Number of times bytes were actually written to disk.
    #[must_use]
    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    /// Path of an already-extracted artifact, without extracting.
    #[must_use]
    pub fn cached(&self, artifact: Artifact) -> Option<PathBuf> {
        self.cache
            .lock()
            .get(&artifact)
            .map(|extracted| extracted.path.clone())
            .filter(|path| path.exists())
    }

    /// Return the on-disk path of `artifact`, extracting it on first use.
    ///
    /// # Errors
    ///
    /// - [`Error::ResourceNotFound`] if the source has no entry for this host
    /// - [`Error::ExtractionFailure`] if the temp directory or file cannot be written
    pub fn extract(&self, artifact: Artifact) -> Result<PathBuf> {
        let mut cache = self.cache.lock();

        if let Some(extracted) = cache.get(&artifact) {
            if extracted.path.exists() {
                trace!(%artifact, path = %extracted.path.display(), "Cache hit for artifact");
                return Ok(extracted.path.clone());
            }
            debug!(%artifact, path = %extracted.path.display(), "Cached artifact vanished, re-extracting");
        }

        let locator = self.host.locator(artifact);
        let Some(bytes) = self
            .source
            .open(&locator)
            .map_err(|e| Error::extraction(&locator, PathBuf::from(&locator), e))?
        else {
            return Err(Error::resource_not_found(locator, self.source.describe()));
        };

        let dir = self.create_temp_dir(&locator)?;
        let path = dir.path().join(artifact.file_name(self.host.platform));
        std::fs::write(&path, &bytes).map_err(|e| Error::extraction(&locator, &path, e))?;

        if self.host.platform.needs_exec_bit() {
            mark_executable(&path).map_err(|e| Error::extraction(&locator, &path, e))?;
        }

        self.extractions.fetch_add(1, Ordering::SeqCst);
        debug!(
            %artifact,
            %locator,
            path = %path.display(),
            size = bytes.len(),
            "Extracted artifact"
        );

        cache.insert(
            artifact,
            ExtractedArtifact {
                path: path.clone(),
                _dir: dir,
            },
        );
        Ok(path)
    }

    fn create_temp_dir(&self, locator: &str) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        let dir = match &self.temp_root {
            Some(root) => {
                std::fs::create_dir_all(root).map_err(|e| Error::extraction(locator, root, e))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        };
        dir.map_err(|e| {
            let root = self
                .temp_root
                .clone()
                .unwrap_or_else(std::env::temp_dir);
            Error::extraction(locator, root, e)
        })
    }
}

/// Add the owner-execute bit, leaving group/other bits untouched.
#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o100);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
