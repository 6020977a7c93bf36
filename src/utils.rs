//! Utility functions for destination paths

use crate::error::{Error, Result};
use crate::types::JobId;
use std::path::{Component, Path, PathBuf};

/// Resolve the destination file for an identifier, confined to `dir`
///
/// The identifier is treated as a relative path with `/` (and, on Windows,
/// `\`) separators. Absolute paths, parent-directory components and drive
/// prefixes are rejected so that no identifier can write outside `dir`.
///
/// # Examples
///
/// ```
/// use commons_dl::utils::resolve_destination;
/// use std::path::Path;
///
/// let path = resolve_destination(Path::new("/data"), "maps/Europe.svg").unwrap();
/// assert_eq!(path, Path::new("/data/maps/Europe.svg"));
/// assert!(resolve_destination(Path::new("/data"), "../etc/passwd").is_err());
/// ```
pub fn resolve_destination(dir: &Path, identifier: &str) -> Result<PathBuf> {
    let unsafe_path = |reason: &str| Error::UnsafePath {
        identifier: identifier.to_string(),
        reason: reason.to_string(),
    };

    let mut relative = PathBuf::new();
    for component in Path::new(identifier).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir => return Err(unsafe_path("contains a parent directory component")),
            Component::RootDir | Component::Prefix(_) => {
                return Err(unsafe_path("is an absolute path"));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(unsafe_path("does not name a file"));
    }
    if identifier.ends_with('/') {
        return Err(unsafe_path("names a directory"));
    }

    Ok(dir.join(relative))
}

/// Temporary sibling of `destination` that a job writes before renaming into place
///
/// The job id keeps concurrent jobs for duplicate identifiers from sharing a file.
pub fn partial_path(destination: &Path, job_id: JobId) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.part", name, job_id))
}

/// Make sure the destination directory exists and accepts new files
///
/// Creates the directory (and parents) if missing, then creates and removes a
/// probe file. Any failure is [`Error::DestinationUnavailable`].
pub async fn ensure_destination(dir: &Path) -> Result<()> {
    let unavailable = |reason: String| Error::DestinationUnavailable {
        path: dir.to_path_buf(),
        reason,
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| unavailable(format!("cannot create directory: {}", e)))?;

    let metadata = tokio::fs::metadata(dir)
        .await
        .map_err(|e| unavailable(format!("cannot stat directory: {}", e)))?;
    if !metadata.is_dir() {
        return Err(unavailable("not a directory".to_string()));
    }

    let probe = dir.join(format!(".commons-dl-probe-{}", std::process::id()));
    tokio::fs::write(&probe, b"")
        .await
        .map_err(|e| unavailable(format!("not writable: {}", e)))?;
    if let Err(e) = tokio::fs::remove_file(&probe).await {
        tracing::warn!(path = %probe.display(), error = %e, "Failed to remove write probe");
    }

    Ok(())
}
