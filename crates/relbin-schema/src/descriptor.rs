//! Package descriptor: what to install and where to put it.
//!
//! The descriptor is usually the package's own `package.json`; only the four
//! fields below are read and everything else is ignored. A `relbin.toml` with
//! the same keys is accepted as well.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::platform::PlatformTarget;

/// JSON descriptor file name, checked first.
pub const DESCRIPTOR_JSON: &str = "package.json";

/// TOML descriptor file name, checked when no JSON descriptor exists.
pub const DESCRIPTOR_TOML: &str = "relbin.toml";

/// Failure to locate, read or validate a descriptor.
#[derive(Error, Debug)]
pub enum DescriptorError {
    /// Neither descriptor file exists in the directory.
    #[error("No package.json or relbin.toml found in {}", .0.display())]
    NotFound(PathBuf),

    /// The descriptor file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// Descriptor file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The JSON descriptor is malformed or lacks a field.
    #[error("Failed to parse {}: {source}", .path.display())]
    Json {
        /// Descriptor file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },

    /// The TOML descriptor is malformed or lacks a field.
    #[error("Failed to parse {}: {source}", .path.display())]
    Toml {
        /// Descriptor file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },

    /// A field holds a value that cannot be used safely.
    #[error("Invalid descriptor: {0}")]
    Invalid(String),
}

/// The package to install.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Executable base name, also the asset name prefix
    pub name: String,
    /// Release version, embedded in the download URL as `v{version}`
    pub version: String,
    /// Base of the release-hosting URL, e.g. `https://github.com/o/r/releases`
    #[serde(alias = "releasesBaseURL", alias = "releases_url")]
    pub releases_url: String,
    /// Binary directory, relative to the install root
    #[serde(alias = "bin_dir")]
    pub bin_dir: String,
}

impl PackageDescriptor {
    /// Load the descriptor from `dir`, preferring `package.json` over
    /// `relbin.toml`.
    ///
    /// # Errors
    ///
    /// [`DescriptorError::NotFound`] when neither file exists, otherwise
    /// whatever [`from_path`](Self::from_path) reports.
    pub fn load(dir: &Path) -> Result<Self, DescriptorError> {
        let json = dir.join(DESCRIPTOR_JSON);
        if json.is_file() {
            return Self::from_path(&json);
        }
        let toml = dir.join(DESCRIPTOR_TOML);
        if toml.is_file() {
            return Self::from_path(&toml);
        }
        Err(DescriptorError::NotFound(dir.to_path_buf()))
    }

    /// Whether `dir` holds a descriptor file.
    pub fn exists_in(dir: &Path) -> bool {
        dir.join(DESCRIPTOR_JSON).is_file() || dir.join(DESCRIPTOR_TOML).is_file()
    }

    /// Read and validate a descriptor file; the format follows the extension.
    ///
    /// # Errors
    ///
    /// Read, parse and validation failures.
    pub fn from_path(path: &Path) -> Result<Self, DescriptorError> {
        let text = fs::read_to_string(path).map_err(|source| DescriptorError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let descriptor: Self = if path.extension().is_some_and(|e| e == "toml") {
            toml::from_str(&text).map_err(|source| DescriptorError::Toml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&text).map_err(|source| DescriptorError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };

        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Reject descriptors that would build a bogus URL or point the
    /// binary directory outside the install root.
    ///
    /// # Errors
    ///
    /// [`DescriptorError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.is_empty()
            || self.name == "."
            || self.name.contains(['/', '\\'])
            || self.name.contains("..")
        {
            return Err(DescriptorError::Invalid(format!(
                "name must be a plain file name, got {:?}",
                self.name
            )));
        }

        if self.version.trim().is_empty() {
            return Err(DescriptorError::Invalid("version is empty".to_string()));
        }

        let scheme = self
            .releases_url
            .split_once("://")
            .map(|(scheme, _)| scheme.to_ascii_lowercase());
        if !matches!(scheme.as_deref(), Some("http" | "https")) {
            return Err(DescriptorError::Invalid(format!(
                "releasesUrl must be an http(s) URL, got {:?}",
                self.releases_url
            )));
        }

        let bin_dir = Path::new(&self.bin_dir);
        let mut has_normal = false;
        for component in bin_dir.components() {
            match component {
                Component::Normal(_) => has_normal = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(DescriptorError::Invalid(format!(
                        "binDir must stay inside the install root, got {:?}",
                        self.bin_dir
                    )));
                }
            }
        }
        if !has_normal {
            return Err(DescriptorError::Invalid(format!(
                "binDir must name a subdirectory, got {:?}",
                self.bin_dir
            )));
        }

        Ok(())
    }

    /// Asset file name for `target`, e.g. `tool-x86_64-unknown-linux-gnu.tar.gz`.
    pub fn asset_name(&self, target: &PlatformTarget) -> String {
        format!(
            "{}-{}-{}.{}",
            self.name,
            target.arch,
            target.os,
            target.archive_format().extension()
        )
    }

    /// Download URL of the release asset for `target`:
    /// `{releasesUrl}/download/v{version}/{asset}`.
    pub fn download_url(&self, target: &PlatformTarget) -> String {
        let base = self
            .releases_url
            .strip_suffix('/')
            .unwrap_or(&self.releases_url);
        format!(
            "{base}/download/v{}/{}",
            self.version,
            self.asset_name(target)
        )
    }
}
