// ─── Local Cache ───
// Maps an artifact file name to a present/absent file under the work dir.
// Presence is purely by name; there is no content validation.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};

/// Create the launcher work directory if missing. Idempotent.
pub async fn ensure_work_dir(path: &Path) -> LauncherResult<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })
}

/// Look for a cached artifact whose name exactly equals `filename`.
///
/// Returns `Ok(None)` when no entry matches. Partial matches never count.
pub async fn resolve_path(work_dir: &Path, filename: &str) -> LauncherResult<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(work_dir)
        .await
        .map_err(|source| LauncherError::Io {
            path: work_dir.to_path_buf(),
            source,
        })?;

    while let Some(entry) = entries.next_entry().await.map_err(|source| LauncherError::Io {
        path: work_dir.to_path_buf(),
        source,
    })? {
        if entry.file_name().to_string_lossy() == filename {
            return Ok(Some(entry.path()));
        }
    }

    info!("Artifact {filename} not cached in {:?}", work_dir);
    Ok(None)
}
