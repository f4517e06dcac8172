//! Sources of the raw artifact bytes.
//!
//! Resources are addressed by locator strings of the form
//! `{category-root}/{platform}-{arch}/{filename}`, see
//! [`ardukit_core::HostPlatform::locator`].

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

mod generated {
    include!(concat!(env!("OUT_DIR"), "/embedded.rs"));
}

/// Something that can hand out artifact bytes by locator.
pub trait ResourceSource: Send + Sync + fmt::Debug {
    /// Return the bytes stored under `locator`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the resource exists but cannot be read.
    fn open(&self, locator: &str) -> io::Result<Option<Cow<'static, [u8]>>>;

    /// Short description used in error messages.
    fn describe(&self) -> String;
}

/// Artifacts compiled into the binary by `build.rs`.
#[derive(Clone, Copy)]
pub struct EmbeddedResources {
    table: &'static [(&'static str, &'static [u8])],
}

impl EmbeddedResources {
    /// The table generated for the build target.
    #[must_use]
    pub fn new() -> Self {
        Self::from_table(generated::EMBEDDED)
    }

    /// Serve resources from an explicit static table.
    #[must_use]
    pub const fn from_table(table: &'static [(&'static str, &'static [u8])]) -> Self {
        Self { table }
    }

    /// Locators present in the table.
    pub fn locators(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.table.iter().map(|(locator, _)| *locator)
    }
}

impl Default for EmbeddedResources {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EmbeddedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedResources")
            .field("locators", &self.locators().collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceSource for EmbeddedResources {
    fn open(&self, locator: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        Ok(self
            .table
            .iter()
            .find(|(name, _)| *name == locator)
            .map(|(_, bytes)| Cow::Borrowed(*bytes)))
    }

    fn describe(&self) -> String {
        format!("embedded resources ({} entries)", self.table.len())
    }
}

/// Artifacts laid out on disk under a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Serve resources from `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceSource for DirectoryResources {
    fn open(&self, locator: &str) -> io::Result<Option<Cow<'static, [u8]>>> {
        let path = self.root.join(locator);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(Cow::Owned(bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        format!("resource directory {}", self.root.display())
    }
}
