use std::path::{Path, PathBuf};

use tokio::{
    fs::{File, OpenOptions, create_dir_all, remove_file, rename},
    io::AsyncWriteExt as _,
};

pub async fn exists(path: impl AsRef<Path>) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.tmp-{}", file_name, uuid::Uuid::new_v4().simple()))
}

/// Writes `data` next to `path` under a temporary name, syncs it and renames it over `path`.
///
/// Readers observe either the previous file or the complete new one.
pub async fn write_atomic(path: impl AsRef<Path>, data: impl AsRef<[u8]>) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).await?;
    }

    let tmp = temp_sibling(path);
    let result = async {
        let mut file: File = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp)
            .await?;
        file.write_all(data.as_ref()).await?;
        file.sync_all().await?;
        drop(file);
        rename(&tmp, path).await
    }
    .await;

    if result.is_err() {
        let _ = remove_file(&tmp).await;
    }
    result
}
