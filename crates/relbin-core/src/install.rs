//! Install pipeline: resolve → fetch → extract → clean up.
//!
//! Every step must succeed; the first failure aborts the install and is
//! returned unchanged. If extraction fails the downloaded archive stays in
//! the binary directory for inspection.
//!
//! Two installs into the same binary directory at once are not supported:
//! both recreate the directory and the last writer wins.

use std::io;
use std::path::{Path, PathBuf};

use relbin_schema::{DescriptorError, PackageDescriptor, PlatformError, PlatformTarget};
use reqwest::Client;
use thiserror::Error;
use tracing::{info, warn};

use crate::Reporter;
use crate::io::download::{DownloadError, DownloadRequest};
use crate::io::extract::{self, ExtractError};
use crate::layout::InstallLayout;
use crate::options::InstallOptions;

/// Failure anywhere in the install pipeline.
#[derive(Error, Debug)]
pub enum InstallError {
    /// No release asset exists for this host.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// The descriptor is missing or unusable.
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Fetching the release asset failed.
    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    /// Unpacking the release asset failed.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Preparing or cleaning the binary directory failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done
        context: &'static str,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl InstallError {
    /// Create an IO error with context for better debugging.
    pub fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// URL the asset was requested from
    pub url: String,
    /// Binary directory that was populated
    pub bin_dir: PathBuf,
    /// Expected executable path
    pub executable: PathBuf,
    /// Whether the executable exists after extraction
    pub executable_found: bool,
    /// Size of the downloaded archive
    pub bytes: u64,
    /// Number of non-directory entries extracted
    pub files: usize,
}

/// Runs installs with a shared client, options and reporter.
#[derive(Debug)]
pub struct Installer<'a, R: Reporter + ?Sized> {
    client: &'a Client,
    options: &'a InstallOptions,
    reporter: &'a R,
}

impl<'a, R: Reporter + ?Sized> Installer<'a, R> {
    /// Create an installer.
    pub fn new(client: &'a Client, options: &'a InstallOptions, reporter: &'a R) -> Self {
        Self {
            client,
            options,
            reporter,
        }
    }

    /// Install `descriptor` for `target` under `root`.
    ///
    /// # Errors
    ///
    /// The first failing step, see [`InstallError`].
    pub async fn install(
        &self,
        descriptor: &PackageDescriptor,
        target: PlatformTarget,
        root: &Path,
    ) -> Result<InstallReport, InstallError> {
        descriptor.validate()?;

        let layout = InstallLayout::new(root, descriptor, &target);
        let url = descriptor.download_url(&target);
        info!(name = %descriptor.name, version = %descriptor.version, %target, "installing");
        self.reporter
            .installing(&descriptor.name, &descriptor.version);

        layout
            .recreate_bin_dir()
            .await
            .map_err(|e| InstallError::io("Failed to prepare binary directory", e))?;

        self.reporter.downloading(&descriptor.name, &url);
        let bytes = DownloadRequest::new(self.client, &url, layout.archive_path(), self.reporter)
            .with_max_redirects(self.options.max_redirects)
            .execute()
            .await?;

        self.reporter
            .extracting(layout.archive_path(), layout.bin_dir());
        let files = extract::extract(
            layout.archive_path(),
            layout.bin_dir(),
            target.archive_format(),
        )
        .await?;

        tokio::fs::remove_file(layout.archive_path())
            .await
            .map_err(|e| InstallError::io("Failed to remove downloaded archive", e))?;

        let executable_found = layout.executable_path().is_file();
        if !executable_found {
            warn!(path = %layout.executable_path().display(), "executable missing after extraction");
            self.reporter.warning(&format!(
                "{} was not found in the release archive",
                layout.executable_path().display()
            ));
        }

        self.reporter.done(
            &descriptor.name,
            &descriptor.version,
            layout.executable_path(),
        );

        Ok(InstallReport {
            url,
            bin_dir: layout.bin_dir().to_path_buf(),
            executable: layout.executable_path().to_path_buf(),
            executable_found,
            bytes,
            files: files.len(),
        })
    }
}
