use std::path::{Path, PathBuf};

use tokio::fs;

/// Write `data` to `dest` via a sibling temp file and a rename.
///
/// The temp file lives in the destination directory so the rename never
/// crosses filesystems. It is removed again if any step fails.
pub(crate) async fn write_atomic(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp = temp_path(dest);

    if let Err(e) = fs::write(&temp, data).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    if let Err(e) = fs::rename(&temp, dest).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }

    Ok(())
}

fn temp_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}
