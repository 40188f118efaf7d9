//! Install command - fetch and unpack the release asset

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use relbin_core::io::download::build_client;
use relbin_core::{InstallOptions, InstallReport, Installer, Reporter};
use relbin_schema::{PackageDescriptor, PlatformTarget};

use crate::InstallCli;

/// Merge command-line flags over the environment-derived options.
pub fn options_from_cli(cli: &InstallCli) -> InstallOptions {
    let mut options = InstallOptions::from_env();
    if let Some(secs) = cli.timeout {
        options = options.with_timeout_secs(secs);
    }
    if let Some(hops) = cli.max_redirects {
        options.max_redirects = hops;
    }
    options
}

/// Install root: `--root`/`RELBIN_ROOT`, else the working directory.
pub fn install_root(cli: &InstallCli) -> Result<PathBuf> {
    match &cli.root {
        Some(root) => Ok(root.clone()),
        None => std::env::current_dir().context("Failed to read current directory"),
    }
}

/// Install the package described in `root` for `target`.
pub async fn install<R: Reporter + ?Sized>(
    root: &Path,
    target: PlatformTarget,
    options: &InstallOptions,
    reporter: &R,
) -> Result<InstallReport> {
    // Descriptor and client errors already name what failed
    let descriptor = PackageDescriptor::load(root)?;
    let client = build_client(options)?;

    let report = Installer::new(&client, options, reporter)
        .install(&descriptor, target, root)
        .await?;

    tracing::debug!(
        url = %report.url,
        bytes = report.bytes,
        files = report.files,
        "install complete"
    );
    Ok(report)
}
