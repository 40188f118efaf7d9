//! On-disk layout of an install: where the binary directory, the transient
//! archive and the executable live relative to the install root.

use std::io;
use std::path::{Path, PathBuf};

use relbin_schema::{PackageDescriptor, PlatformTarget};

/// Overrides the install root for both entry points.
pub const ROOT_ENV: &str = "RELBIN_ROOT";

/// Returns the install root named by `RELBIN_ROOT`, if set and non-empty.
pub fn try_root_from_env() -> Option<PathBuf> {
    std::env::var_os(ROOT_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

/// Pick the install root for the launcher.
///
/// An explicit root wins; otherwise the launcher's own directory is used when
/// it holds a descriptor, and the working directory as a last resort.
pub fn resolve_root(explicit: Option<PathBuf>, exe_dir: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(root) = explicit {
        return root;
    }
    match exe_dir {
        Some(dir) if PackageDescriptor::exists_in(dir) => dir.to_path_buf(),
        _ => cwd.to_path_buf(),
    }
}

/// Paths derived from a descriptor, a target and an install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
    bin_dir: PathBuf,
    archive: PathBuf,
    executable: PathBuf,
}

impl InstallLayout {
    /// Compute the layout. The descriptor is expected to be validated.
    pub fn new(root: &Path, descriptor: &PackageDescriptor, target: &PlatformTarget) -> Self {
        let bin_dir = root.join(&descriptor.bin_dir);
        let archive = bin_dir.join(format!("package.{}", target.archive_format().extension()));
        let executable = bin_dir.join(target.executable_name(&descriptor.name));
        Self {
            root: root.to_path_buf(),
            bin_dir,
            archive,
            executable,
        }
    }

    /// Install root: `<root>`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Binary directory: `<root>/<binDir>`
    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Downloaded archive: `<root>/<binDir>/package.<ext>`
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Installed executable: `<root>/<binDir>/<name>[.exe]`
    pub fn executable_path(&self) -> &Path {
        &self.executable
    }

    /// Delete the binary directory if present and create it empty.
    ///
    /// # Errors
    ///
    /// Any IO error other than the directory not existing.
    pub async fn recreate_bin_dir(&self) -> io::Result<()> {
        match tokio::fs::remove_dir_all(&self.bin_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&self.bin_dir).await
    }
}
