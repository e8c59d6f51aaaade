//! Small filesystem helpers shared by the file-backed stores.

use std::path::{Path, PathBuf};

use crate::error::{StorageError, StorageResult};

/// Write `data` to `path` through a sibling temp file and a rename, so a
/// crash never leaves a half-written file behind.
pub(crate) async fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    let tmp_path = tmp_path_for(path)?;

    tokio::fs::write(&tmp_path, data).await.map_err(|e| {
        StorageError::WriteFailed(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(StorageError::WriteFailed(format!(
            "Failed to move {} into place: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

fn tmp_path_for(path: &Path) -> StorageResult<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        StorageError::WriteFailed(format!("Not a file path: {}", path.display()))
    })?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".tmp");
    Ok(path.with_file_name(tmp_name))
}
