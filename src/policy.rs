//! Existing-file policy: decides whether a work item needs downloading at all

use std::path::Path;

use crate::types::Mode;

/// True iff `mode` is [`Mode::Resume`] and a regular file already exists at `destination`
///
/// Symlinks are followed. Any metadata failure (missing file, permission
/// denied, name too long) counts as "not present": the download is attempted
/// and the write step reports the real problem.
pub async fn should_skip(destination: &Path, mode: Mode) -> bool {
    if mode == Mode::Restart {
        return false;
    }
    match tokio::fs::metadata(destination).await {
        Ok(metadata) => metadata.is_file(),
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(
                    path = %destination.display(),
                    error = %e,
                    "Could not stat destination, attempting download"
                );
            }
            false
        }
    }
}
