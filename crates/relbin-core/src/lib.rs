//! Core library for relbin.
//!
//! Installs a prebuilt release binary described by a
//! [`PackageDescriptor`](relbin_schema::PackageDescriptor) and launches it
//! afterwards.
//!
//! # Architecture
//!
//! - **Resolver**: [`PlatformTarget`](relbin_schema::PlatformTarget) picks the
//!   asset triple and archive format for the host.
//! - **Fetcher**: [`io::download`] streams the asset to disk, following a
//!   bounded number of redirects.
//! - **Extractor**: [`io::extract`] unpacks tar.gz or zip, refusing entries
//!   that escape the destination.
//! - **Pipeline**: [`install::Installer`] wires the three together and
//!   [`launch`] runs the installed executable.
//!
//! # Directory Layout
//!
//! ```text
//! <root>/
//! ├── package.json        # descriptor (or relbin.toml)
//! └── <binDir>/
//!     ├── <name>[.exe]    # extracted executable
//!     └── package.tar.gz  # transient archive, removed after extraction
//! ```

pub mod install;
pub mod io;
pub mod launch;
pub mod layout;
pub mod options;
pub mod reporter;

pub use install::{InstallError, InstallReport, Installer};
pub use launch::{LaunchError, launch};
pub use layout::InstallLayout;
pub use options::InstallOptions;
pub use reporter::{NullReporter, Reporter};

/// User Agent string for release downloads
pub const USER_AGENT: &str = concat!("relbin/", env!("CARGO_PKG_VERSION"));
