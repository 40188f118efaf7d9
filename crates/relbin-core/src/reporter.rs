//! Reporter trait for dependency injection
//!
//! This trait allows the install pipeline to report progress and status
//! without being coupled to a specific console implementation.

use std::path::Path;

/// Receives progress and status events from the install pipeline.
pub trait Reporter: Send + Sync {
    /// An install of `name` at `version` has started.
    fn installing(&self, name: &str, version: &str);

    /// The release asset for `name` is about to be fetched from `url`.
    fn downloading(&self, name: &str, url: &str);

    /// Bytes received so far for the current download.
    fn progress(&self, current: u64, total: Option<u64>);

    /// The downloaded archive is being unpacked into `dest`.
    fn extracting(&self, archive: &Path, dest: &Path);

    /// The install finished; `executable` is where the binary should live.
    fn done(&self, name: &str, version: &str, executable: &Path);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn installing(&self, name: &str, version: &str) {
        (**self).installing(name, version);
    }
    fn downloading(&self, name: &str, url: &str) {
        (**self).downloading(name, url);
    }
    fn progress(&self, current: u64, total: Option<u64>) {
        (**self).progress(current, total);
    }
    fn extracting(&self, archive: &Path, dest: &Path) {
        (**self).extracting(archive, dest);
    }
    fn done(&self, name: &str, version: &str, executable: &Path) {
        (**self).done(name, version, executable);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn installing(&self, _: &str, _: &str) {}
    fn downloading(&self, _: &str, _: &str) {}
    fn progress(&self, _: u64, _: Option<u64>) {}
    fn extracting(&self, _: &Path, _: &Path) {}
    fn done(&self, _: &str, _: &str, _: &Path) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
