//! Archive extraction module
//!
//! Handles the two release formats, tar.gz and zip. Every entry is checked
//! against the destination before anything is written: absolute paths,
//! `..` escapes and symlinks pointing outside are refused.

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use relbin_schema::ArchiveFormat;
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

/// Failure to unpack a release archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Reading the archive or writing an entry failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file extension names no known archive format.
    #[error("Unsupported archive format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// An entry is absolute or resolves outside the destination.
    #[error("Archive entry escapes the destination directory: {}", .0.display())]
    PathTraversal(PathBuf),

    /// The zip container is malformed.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Information about an extracted file
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to extraction root
    pub relative_path: PathBuf,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
    /// Whether this is an executable
    pub is_executable: bool,
}

/// Detect archive format from file extension
///
/// Only used for archives whose format was not fixed by the resolver.
pub fn detect_format(path: &Path) -> Option<ArchiveFormat> {
    let path_str = path.to_string_lossy().to_lowercase();

    if path_str.ends_with(".tar.gz") || path_str.ends_with(".tgz") || path_str.ends_with(".gz") {
        Some(ArchiveFormat::TarGz)
    } else if path_str.ends_with(".zip") {
        Some(ArchiveFormat::Zip)
    } else {
        None
    }
}

/// Extract `archive_path` into `dest_dir` on the blocking pool.
///
/// # Errors
///
/// IO and archive errors, and [`ExtractError::PathTraversal`] for entries
/// that would land outside `dest_dir`.
pub async fn extract(
    archive_path: &Path,
    dest_dir: &Path,
    format: ArchiveFormat,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let archive_path = archive_path.to_path_buf();
    let dest_dir = dest_dir.to_path_buf();

    tokio::task::spawn_blocking(move || match format {
        ArchiveFormat::TarGz => extract_tar_gz(&archive_path, &dest_dir),
        ArchiveFormat::Zip => extract_zip(&archive_path, &dest_dir),
    })
    .await
    .map_err(io::Error::other)?
}

/// Extract an archive, picking the format from its extension.
///
/// # Errors
///
/// [`ExtractError::UnsupportedFormat`] when the extension is not recognised,
/// otherwise as [`extract`].
pub async fn extract_auto(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let format = detect_format(archive_path)
        .ok_or_else(|| ExtractError::UnsupportedFormat(archive_path.to_path_buf()))?;
    extract(archive_path, dest_dir, format).await
}

/// Extract a tar.gz archive to a destination directory
///
/// # Errors
///
/// See [`extract`].
pub fn extract_tar_gz(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let reader = BufReader::new(file);
    let gz_decoder = flate2::read::GzDecoder::new(reader);

    extract_tar(gz_decoder, dest_dir)
}

/// Extract a tar archive from a reader
fn extract_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<Vec<ExtractedFile>, ExtractError> {
    fs::create_dir_all(dest_dir)?;

    let mut archive = tar::Archive::new(reader);
    let mut extracted_files = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let relative_path = enclosed_path(&entry_path)?;
        let entry_type = entry.header().entry_type();

        // Symlink targets resolve against the entry's parent, hard links
        // against the archive root.
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            if let Some(target) = entry.link_name()?.map(std::borrow::Cow::into_owned) {
                let base = if entry_type.is_symlink() {
                    relative_path.parent().unwrap_or(Path::new(""))
                } else {
                    Path::new("")
                };
                enclosed_path(&base.join(&target))
                    .map_err(|_| ExtractError::PathTraversal(entry_path.clone()))?;
            }
        }

        if relative_path.as_os_str().is_empty() {
            continue;
        }

        debug!(path = %relative_path.display(), "unpacking");
        // unpack_in also refuses to write through symlinks that leave dest_dir
        if !entry.unpack_in(dest_dir)? {
            return Err(ExtractError::PathTraversal(entry_path));
        }

        if entry_type.is_dir() {
            continue;
        }

        let is_executable = entry
            .header()
            .mode()
            .is_ok_and(|m| m & 0o111 != 0);

        extracted_files.push(ExtractedFile {
            absolute_path: dest_dir.join(&relative_path),
            relative_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Extract a zip archive
///
/// # Errors
///
/// See [`extract`].
pub fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    fs::create_dir_all(dest_dir)?;
    let mut extracted_files = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let Some(relative_path) = file.enclosed_name() else {
            return Err(ExtractError::PathTraversal(PathBuf::from(file.name())));
        };

        let absolute_path = dest_dir.join(&relative_path);
        if file.is_dir() {
            fs::create_dir_all(&absolute_path)?;
            continue;
        }

        if let Some(p) = absolute_path.parent() {
            fs::create_dir_all(p)?;
        }

        // Replace rather than follow a symlink left by an earlier install.
        if fs::symlink_metadata(&absolute_path).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(&absolute_path)?;
        }

        debug!(path = %relative_path.display(), "unpacking");
        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut file, &mut outfile)?;

        #[cfg(unix)]
        let is_executable = if let Some(mode) = file.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode & 0o777))?;
            mode & 0o111 != 0
        } else {
            false
        };
        #[cfg(not(unix))]
        let is_executable = false;

        extracted_files.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted_files)
}

/// Normalise an archive path lexically, failing if it is absolute or climbs
/// above the extraction root.
fn enclosed_path(path: &Path) -> Result<PathBuf, ExtractError> {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(ExtractError::PathTraversal(path.to_path_buf()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal(path.to_path_buf()));
            }
        }
    }
    Ok(normalized)
}
