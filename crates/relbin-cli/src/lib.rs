//! relbin - install and launch prebuilt release binaries
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
//!
//! Two entry points share this library:
//!
//! - `relbin-install` reads the package descriptor from the install root,
//!   downloads the release asset for the host and unpacks it into the
//!   binary directory.
//! - `relbin-run` starts the installed executable with the caller's
//!   arguments and exits with the child's status.

pub mod cmd;
pub mod ui;

use clap::Parser;
use std::path::PathBuf;

use relbin_core::layout::ROOT_ENV;
use relbin_core::options::{MAX_REDIRECTS_ENV, TIMEOUT_ENV};

/// Version reported by both binaries, derived from git tags at build time.
pub const VERSION: &str = env!("RELBIN_VERSION");

#[derive(Debug, Parser)]
#[command(name = "relbin-install")]
#[command(author, version = VERSION, about = "Download and unpack the release binary for this platform")]
pub struct InstallCli {
    /// Install root holding the package descriptor
    #[arg(long, env = ROOT_ENV)]
    pub root: Option<PathBuf>,

    /// Whole-request timeout in seconds (0 disables it)
    #[arg(long, env = TIMEOUT_ENV)]
    pub timeout: Option<u64>,

    /// Maximum redirect hops per download
    #[arg(long, env = MAX_REDIRECTS_ENV)]
    pub max_redirects: Option<usize>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Install tracing for a binary. Output goes to stderr so it never mixes
/// with progress lines or a launched child's stdout.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}
