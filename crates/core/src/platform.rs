//! Platform detection and artifact naming.
//!
//! Handles mapping between:
//! - host-reported strings (e.g., "Mac OS X", "amd64", "arm64")
//! - the closed [`Platform`]/[`Arch`] sets binaries are shipped for
//! - resource locators (e.g., "arduino-cli/linux-x86_64/arduino-cli")

use std::fmt;

use crate::{Error, Result};

/// Operating systems ardukit ships binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    /// Microsoft Windows.
    Windows,
    /// Apple macOS.
    Macos,
    /// Linux (and other Unix-likes reporting as such).
    Linux,
}

impl Platform {
    /// Classify a host-reported OS name.
    ///
    /// Matching is case-insensitive and keyword based: "mac"/"darwin" map to
    /// macOS, "win" to Windows, and "nix"/"nux"/"aix" to Linux. macOS is tested
    /// first since "darwin" contains "win".
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for any other string.
    pub fn classify(os: &str) -> Result<Self> {
        let os_lower = os.to_lowercase();
        if os_lower.contains("mac") || os_lower.contains("darwin") {
            Ok(Self::Macos)
        } else if os_lower.contains("win") {
            Ok(Self::Windows)
        } else if ["nix", "nux", "aix"].iter().any(|k| os_lower.contains(k)) {
            Ok(Self::Linux)
        } else {
            Err(Error::unsupported("platform", os))
        }
    }

    /// Canonical lowercase name used in resource paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
        }
    }

    /// Whether extracted files need their executable bit set.
    #[must_use]
    pub const fn needs_exec_bit(self) -> bool {
        !matches!(self, Self::Windows)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architectures ardukit ships binaries for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86 (a.k.a. amd64).
    X86_64,
    /// 64-bit ARM (a.k.a. arm64).
    Aarch64,
    /// 32-bit ARM.
    Arm,
}

impl Arch {
    /// Classify a host-reported CPU architecture string.
    ///
    /// "amd64"/"x86_64" map to x86_64, "aarch64"/"arm64" to aarch64,
    /// and any remaining "arm" to 32-bit arm.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] for any other string.
    pub fn classify(arch: &str) -> Result<Self> {
        let arch_lower = arch.to_lowercase();
        if arch_lower.contains("amd64") || arch_lower.contains("x86_64") {
            Ok(Self::X86_64)
        } else if arch_lower.contains("aarch64") || arch_lower.contains("arm64") {
            Ok(Self::Aarch64)
        } else if arch_lower.contains("arm") {
            Ok(Self::Arm)
        } else {
            Err(Error::unsupported("architecture", arch))
        }
    }

    /// Canonical lowercase name used in resource paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::Arm => "arm",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved (platform, architecture) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostPlatform {
    /// Operating system.
    pub platform: Platform,
    /// CPU architecture.
    pub arch: Arch,
}

impl HostPlatform {
    /// Create a host platform from already-classified parts.
    #[must_use]
    pub const fn new(platform: Platform, arch: Arch) -> Self {
        Self { platform, arch }
    }

    /// Classify arbitrary host-reported OS and architecture strings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] if either string is unrecognized.
    pub fn from_strings(os: &str, arch: &str) -> Result<Self> {
        Ok(Self::new(Platform::classify(os)?, Arch::classify(arch)?))
    }

    /// Detect the platform this process is running on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedPlatform`] on hosts outside the supported set.
    pub fn detect() -> Result<Self> {
        let host = Self::from_strings(std::env::consts::OS, std::env::consts::ARCH)?;
        tracing::debug!(%host, "Detected host platform");
        Ok(host)
    }

    /// Resource locator for an artifact on this host:
    /// `{category-root}/{platform}-{arch}/{filename}`.
    #[must_use]
    pub fn locator(&self, artifact: Artifact) -> String {
        format!(
            "{}/{}/{}",
            artifact.category_root(),
            self,
            artifact.file_name(self.platform)
        )
    }
}

impl fmt::Display for HostPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}

/// Logical names of the artifacts embedded in the distributable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// The wrapped `arduino-cli` executable.
    Cli,
    /// The native bridge dynamic library.
    Bridge,
}

/// Base name of the native bridge library (without platform prefix/suffix).
pub const BRIDGE_LIBRARY_NAME: &str = "ardukit_bridge";

impl Artifact {
    /// Top-level resource directory for this artifact category.
    #[must_use]
    pub const fn category_root(self) -> &'static str {
        match self {
            Self::Cli => "arduino-cli",
            Self::Bridge => "native",
        }
    }

    /// File name of this artifact on the given platform.
    #[must_use]
    pub fn file_name(self, platform: Platform) -> String {
        match (self, platform) {
            (Self::Cli, Platform::Windows) => "arduino-cli.exe".to_string(),
            (Self::Cli, _) => "arduino-cli".to_string(),
            (Self::Bridge, Platform::Windows) => format!("{BRIDGE_LIBRARY_NAME}.dll"),
            (Self::Bridge, Platform::Macos) => format!("lib{BRIDGE_LIBRARY_NAME}.dylib"),
            (Self::Bridge, Platform::Linux) => format!("lib{BRIDGE_LIBRARY_NAME}.so"),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => f.write_str("arduino-cli"),
            Self::Bridge => f.write_str("native bridge"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_platform_keywords() {
        assert_eq!(Platform::classify("Windows 11").unwrap(), Platform::Windows);
        assert_eq!(Platform::classify("windows").unwrap(), Platform::Windows);
        assert_eq!(Platform::classify("Mac OS X").unwrap(), Platform::Macos);
        assert_eq!(Platform::classify("macos").unwrap(), Platform::Macos);
        assert_eq!(Platform::classify("Linux").unwrap(), Platform::Linux);
        assert_eq!(Platform::classify("AIX").unwrap(), Platform::Linux);
        assert_eq!(Platform::classify("unix").unwrap(), Platform::Linux);
    }

    #[test]
    fn test_darwin_is_not_windows() {
        assert_eq!(Platform::classify("Darwin").unwrap(), Platform::Macos);
    }

    #[test]
    fn test_classify_platform_unsupported() {
        for os in ["plan9", "haiku", "", "solaris"] {
            let err = Platform::classify(os).unwrap_err();
            assert!(matches!(
                err,
                Error::UnsupportedPlatform {
                    kind: "platform",
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_classify_arch_keywords() {
        assert_eq!(Arch::classify("amd64").unwrap(), Arch::X86_64);
        assert_eq!(Arch::classify("x86_64").unwrap(), Arch::X86_64);
        assert_eq!(Arch::classify("AMD64").unwrap(), Arch::X86_64);
        assert_eq!(Arch::classify("aarch64").unwrap(), Arch::Aarch64);
        assert_eq!(Arch::classify("ARM64").unwrap(), Arch::Aarch64);
        assert_eq!(Arch::classify("arm").unwrap(), Arch::Arm);
        assert_eq!(Arch::classify("armv7l").unwrap(), Arch::Arm);
    }

    #[test]
    fn test_classify_arch_unsupported() {
        for arch in ["riscv64", "x86", "x64", "s390x64", "powerpc64", "mips", ""] {
            assert!(matches!(
                Arch::classify(arch),
                Err(Error::UnsupportedPlatform {
                    kind: "architecture",
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_host_display() {
        let host = HostPlatform::new(Platform::Linux, Arch::Aarch64);
        assert_eq!(host.to_string(), "linux-aarch64");
    }

    #[test]
    fn test_locators() {
        let linux = HostPlatform::new(Platform::Linux, Arch::X86_64);
        assert_eq!(
            linux.locator(Artifact::Cli),
            "arduino-cli/linux-x86_64/arduino-cli"
        );
        assert_eq!(
            linux.locator(Artifact::Bridge),
            "native/linux-x86_64/libardukit_bridge.so"
        );

        let mac = HostPlatform::new(Platform::Macos, Arch::Aarch64);
        assert_eq!(
            mac.locator(Artifact::Bridge),
            "native/macos-aarch64/libardukit_bridge.dylib"
        );

        let win = HostPlatform::new(Platform::Windows, Arch::X86_64);
        assert_eq!(
            win.locator(Artifact::Cli),
            "arduino-cli/windows-x86_64/arduino-cli.exe"
        );
        assert_eq!(
            win.locator(Artifact::Bridge),
            "native/windows-x86_64/ardukit_bridge.dll"
        );
    }

    #[test]
    fn test_exec_bit_only_off_windows() {
        assert!(!Platform::Windows.needs_exec_bit());
        assert!(Platform::Linux.needs_exec_bit());
        assert!(Platform::Macos.needs_exec_bit());
    }

    #[test]
    fn test_from_strings() {
        let host = HostPlatform::from_strings("Mac OS X", "aarch64").unwrap();
        assert_eq!(host, HostPlatform::new(Platform::Macos, Arch::Aarch64));
        assert!(HostPlatform::from_strings("linux", "sparc").is_err());
    }

    #[test]
    fn test_detect_matches_std_consts() {
        // Only meaningful on hosts we ship binaries for
        if let Ok(host) = HostPlatform::detect() {
            assert_eq!(
                host,
                HostPlatform::from_strings(std::env::consts::OS, std::env::consts::ARCH).unwrap()
            );
        }
    }
}
