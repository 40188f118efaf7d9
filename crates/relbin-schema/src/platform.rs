//! Platform and architecture resolution.
//!
//! Release assets are named after Rust target triples, e.g.
//! `tool-x86_64-unknown-linux-gnu.tar.gz`. This module maps the identifiers a
//! host reports for its operating system and CPU onto those triple parts, and
//! fixes the archive format that goes with them.
//!
//! # Example
//!
//! ```
//! use relbin_schema::{ArchiveFormat, PlatformTarget};
//!
//! let target = PlatformTarget::resolve("linux", "x86_64").unwrap();
//! assert_eq!(target.triple(), "x86_64-unknown-linux-gnu");
//! assert_eq!(target.archive_format(), ArchiveFormat::TarGz);
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Failure to map a host identifier onto a supported target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The operating system has no published release asset.
    #[error("Unsupported OS: {0}")]
    UnsupportedPlatform(String),

    /// The CPU architecture has no published release asset.
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),
}

/// Operating system family, named by its target-triple suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// `pc-windows-msvc`
    Windows,
    /// `apple-darwin`
    MacOs,
    /// `unknown-linux-gnu`
    Linux,
}

impl Os {
    /// Vendor/OS/ABI part of the target triple.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "pc-windows-msvc",
            Self::MacOs => "apple-darwin",
            Self::Linux => "unknown-linux-gnu",
        }
    }

    /// Whether executables on this OS carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Os {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "windows" | "win32" | "cygwin" => Ok(Self::Windows),
            "macos" | "darwin" => Ok(Self::MacOs),
            "linux" => Ok(Self::Linux),
            _ => Err(PlatformError::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// CPU architecture, named by its target-triple prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// 64-bit x86
    X86_64,
    /// 64-bit ARM
    Aarch64,
    /// 32-bit x86
    I686,
}

impl Arch {
    /// Architecture part of the target triple.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
            Self::I686 => "i686",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86_64" | "x64" | "amd64" => Ok(Self::X86_64),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "x86" | "i686" | "i386" | "ia32" => Ok(Self::I686),
            _ => Err(PlatformError::UnsupportedArchitecture(s.to_string())),
        }
    }
}

/// Archive container a release asset is packed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    /// gzip-compressed tarball
    TarGz,
    /// zip archive
    Zip,
}

impl ArchiveFormat {
    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// The resolved (os, arch) pair a release asset is chosen for.
///
/// The archive format is derived from the OS rather than stored, so a Windows
/// target always pairs with zip and every other target with tar.gz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTarget {
    /// Operating system family
    pub os: Os,
    /// CPU architecture
    pub arch: Arch,
}

impl PlatformTarget {
    /// Map host identifiers onto a target.
    ///
    /// Accepts both Rust (`std::env::consts`) and Node-style names, e.g.
    /// `macos`/`darwin` or `x86_64`/`x64`. The OS is checked before the
    /// architecture.
    ///
    /// # Errors
    ///
    /// [`PlatformError::UnsupportedPlatform`] for an unknown OS,
    /// [`PlatformError::UnsupportedArchitecture`] for an unknown CPU.
    pub fn resolve(os: &str, arch: &str) -> Result<Self, PlatformError> {
        let os = os.parse()?;
        let arch = arch.parse()?;
        Ok(Self { os, arch })
    }

    /// Resolve the platform this binary is running on.
    ///
    /// # Errors
    ///
    /// Fails when compiled for a host no release asset exists for.
    pub fn current() -> Result<Self, PlatformError> {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Archive format used for this target's release asset.
    pub fn archive_format(&self) -> ArchiveFormat {
        if self.os.is_windows() {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    /// Full target triple, e.g. `aarch64-apple-darwin`.
    pub fn triple(&self) -> String {
        format!("{}-{}", self.arch, self.os)
    }

    /// File name of the executable called `name` on this target.
    pub fn executable_name(&self, name: &str) -> String {
        if self.os.is_windows() {
            format!("{name}.exe")
        } else {
            name.to_string()
        }
    }
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.triple())
    }
}
