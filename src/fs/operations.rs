use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use tokio::{fs::File, io::AsyncWriteExt};

/// Path of the scratch file used while replacing `path`.
pub fn scratch_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("state"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Path of the lock file guarding `path`. It is never replaced, so a lock on it outlives the
/// renames done by [write_atomically].
pub fn lock_path(path: &Path) -> PathBuf {
    path.with_extension("lock")
}

/// Opens the lock file guarding `path`, creating it if needed. Readers lock it shared, writers
/// exclusive.
pub async fn open_lock(path: &Path) -> Result<File> {
    let lock = lock_path(path);
    File::options()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock)
        .await
        .with_context(|| format!("Failed to open lock {}", lock.display()))
}

/// Replaces the contents of `path` so that readers see either the old or the new data, never a
/// partial write. The data is written into a scratch file next to the target which is then
/// renamed over it. The whole replacement happens under the exclusive lock from [open_lock].
pub async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let lock = open_lock(path).await?;
    lock.lock_exclusive()?;
    let replaced = replace(path, contents).await;
    lock.unlock_async().await?;
    replaced
}

async fn replace(path: &Path, contents: &[u8]) -> Result<()> {
    let scratch = scratch_path(path);

    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&scratch)
        .await
        .with_context(|| format!("Failed to open {}", scratch.display()))?;
    file.write_all(contents)
        .await
        .with_context(|| format!("Failed to write {}", scratch.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", scratch.display()))?;
    drop(file);

    tokio::fs::rename(&scratch, path)
        .await
        .with_context(|| format!("Failed to move {} into place", scratch.display()))?;
    Ok(())
}
