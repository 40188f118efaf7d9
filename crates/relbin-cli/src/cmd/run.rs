//! Run command - start the installed executable

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use relbin_core::InstallLayout;
use relbin_core::launch::{self, LaunchError};
use relbin_core::layout::{resolve_root, try_root_from_env};
use relbin_schema::{PackageDescriptor, PlatformTarget};

/// Exit code when the launcher cannot work out what to run.
pub const EXIT_CONFIG: i32 = 2;

/// Install root the launcher uses: `RELBIN_ROOT`, the launcher's own
/// directory if it holds a descriptor, else the working directory.
pub fn launcher_root() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_root(try_root_from_env(), exe_dir.as_deref(), &cwd)
}

/// Launch the package installed under `root` and return the exit code
/// the launcher should exit with.
pub fn run(root: &Path, target: PlatformTarget, args: Vec<OsString>) -> i32 {
    let descriptor = match PackageDescriptor::load(root) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            eprintln!("relbin-run: {e}");
            return EXIT_CONFIG;
        }
    };

    let layout = InstallLayout::new(root, &descriptor, &target);
    match launch::launch(&descriptor.name, &layout, args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("relbin-run: {e}");
            if matches!(e, LaunchError::NotInstalled { .. }) {
                eprintln!("relbin-run: run relbin-install to install it");
            }
            e.exit_code()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn linux() -> PlatformTarget {
        PlatformTarget::resolve("linux", "x86_64").unwrap()
    }

    #[test]
    fn test_missing_descriptor_is_config_error() {
        let root = tempdir().unwrap();
        assert_eq!(run(root.path(), linux(), Vec::new()), EXIT_CONFIG);
    }

    #[test]
    fn test_invalid_descriptor_is_config_error() {
        let root = tempdir().unwrap();
        std::fs::write(
            root.path().join("package.json"),
            r#"{"name":"tool","version":"1.0.0","releasesUrl":"https://example.com/r","binDir":".."}"#,
        )
        .unwrap();
        assert_eq!(run(root.path(), linux(), Vec::new()), EXIT_CONFIG);
    }

    #[test]
    fn test_valid_descriptor_without_install_is_127() {
        let root = tempdir().unwrap();
        std::fs::write(
            root.path().join("package.json"),
            r#"{"name":"tool","version":"1.0.0","releasesUrl":"https://example.com/r","binDir":"bin"}"#,
        )
        .unwrap();
        assert_eq!(run(root.path(), linux(), Vec::new()), 127);
    }
}
