//! Run the installed executable and mirror its exit status.

use std::ffi::OsStr;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::debug;

use crate::layout::InstallLayout;

/// Exit code used when the executable is not installed.
pub const EXIT_NOT_INSTALLED: i32 = 127;

/// Exit code used when the executable exists but could not be started.
pub const EXIT_SPAWN_FAILED: i32 = 126;

/// The launcher could not start the child at all.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// Nothing at the expected executable path.
    #[error("{name} is not installed (expected {})", .path.display())]
    NotInstalled {
        /// Package name
        name: String,
        /// Expected executable path
        path: PathBuf,
    },

    /// The executable exists but the OS refused to start it.
    #[error("Failed to start {}: {source}", .path.display())]
    Spawn {
        /// Executable path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Exit code the launcher should report for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotInstalled { .. } => EXIT_NOT_INSTALLED,
            Self::Spawn { .. } => EXIT_SPAWN_FAILED,
        }
    }
}

/// Run the executable from `layout` with `args` and wait for it.
///
/// The child runs in the binary directory and inherits stdin, stdout and
/// stderr. Arguments are passed through untouched.
///
/// # Errors
///
/// [`LaunchError`] when the child could not be started. A child that runs
/// and fails is not an error; its code is returned.
pub fn launch<I, S>(name: &str, layout: &InstallLayout, args: I) -> Result<i32, LaunchError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let executable = layout.executable_path();
    if !executable.is_file() {
        return Err(LaunchError::NotInstalled {
            name: name.to_string(),
            path: executable.to_path_buf(),
        });
    }

    debug!(path = %executable.display(), "launching");
    let status = Command::new(executable)
        .args(args)
        .current_dir(layout.bin_dir())
        .status()
        .map_err(|source| LaunchError::Spawn {
            path: executable.to_path_buf(),
            source,
        })?;

    Ok(exit_code(status))
}

/// Translate a child's status into the launcher's own exit code.
///
/// On Unix a child killed by signal `N` maps to `128 + N`, as shells do.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            tracing::warn!(signal, name = signal_name(signal), "child terminated by signal");
            return 128 + signal;
        }
    }

    1
}

#[cfg(unix)]
fn signal_name(signal: i32) -> &'static str {
    match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        6 => "SIGABRT",
        8 => "SIGFPE",
        9 => "SIGKILL",
        11 => "SIGSEGV",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        _ => "unknown",
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use relbin_schema::{PackageDescriptor, PlatformTarget};
    use std::os::unix::fs::{PermissionsExt, symlink};
    use tempfile::{TempDir, tempdir};

    /// Layout for a package called `tool` whose executable is `/bin/sh`.
    fn sh_layout() -> (TempDir, InstallLayout) {
        let root = tempdir().unwrap();
        let layout = unlinked_layout(&root);
        std::fs::create_dir_all(layout.bin_dir()).unwrap();
        symlink("/bin/sh", layout.executable_path()).unwrap();
        (root, layout)
    }

    fn unlinked_layout(root: &TempDir) -> InstallLayout {
        let descriptor = PackageDescriptor {
            name: "tool".to_string(),
            version: "1.0.0".to_string(),
            releases_url: "https://example.com/releases".to_string(),
            bin_dir: "bin".to_string(),
        };
        let target = PlatformTarget::resolve("linux", "x86_64").unwrap();
        InstallLayout::new(root.path(), &descriptor, &target)
    }

    #[test]
    fn test_exit_code_is_propagated() {
        let (_root, layout) = sh_layout();
        assert_eq!(launch("tool", &layout, ["-c", "exit 3"]).unwrap(), 3);
        assert_eq!(launch("tool", &layout, ["-c", "true"]).unwrap(), 0);
    }

    #[test]
    fn test_args_and_cwd_are_forwarded() {
        let (_root, layout) = sh_layout();
        let script = r#"pwd > out.txt; printf '%s\n' "$@" >> out.txt"#;

        let code = launch(
            "tool",
            &layout,
            ["-c", script, "sh", "two words", "--flag=x", ""],
        )
        .unwrap();
        assert_eq!(code, 0);

        let out = std::fs::read_to_string(layout.bin_dir().join("out.txt")).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        let bin_dir = std::fs::canonicalize(layout.bin_dir()).unwrap();
        assert_eq!(lines[0], bin_dir.to_str().unwrap());
        assert_eq!(&lines[1..], ["two words", "--flag=x", ""]);
    }

    #[test]
    fn test_signal_maps_to_128_plus_n() {
        let (_root, layout) = sh_layout();
        let code = launch("tool", &layout, ["-c", "kill -TERM $$"]).unwrap();
        assert_eq!(code, 128 + 15);
    }

    #[test]
    fn test_missing_executable_is_not_installed() {
        let root = tempdir().unwrap();
        let layout = unlinked_layout(&root);

        let err = launch("tool", &layout, Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, LaunchError::NotInstalled { .. }));
        assert_eq!(err.exit_code(), EXIT_NOT_INSTALLED);
    }

    #[test]
    fn test_non_executable_file_is_spawn_error() {
        let root = tempdir().unwrap();
        let layout = unlinked_layout(&root);
        std::fs::create_dir_all(layout.bin_dir()).unwrap();
        std::fs::write(layout.executable_path(), b"not a program").unwrap();
        std::fs::set_permissions(
            layout.executable_path(),
            std::fs::Permissions::from_mode(0o644),
        )
        .unwrap();

        let err = launch("tool", &layout, Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert_eq!(err.exit_code(), EXIT_SPAWN_FAILED);
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(signal_name(9), "SIGKILL");
        assert_eq!(signal_name(15), "SIGTERM");
        assert_eq!(signal_name(64), "unknown");
    }
}
