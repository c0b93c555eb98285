use std::{io::ErrorKind, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tracing::{debug, info};

use crate::{
    fs::operations::{open_lock, write_atomically},
    store::{entities::StoreState, DEFAULT_DURATION},
    utils::clock::Clock,
};

use super::{migration, StateStorage, STORAGE_KEY};

/// The main realization of [StateStorage]. Keeps the document in `<dir>/cronox.json`.
pub struct FileStateStorage {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FileStateStorage {
    pub fn new(dir: PathBuf, clock: Arc<dyn Clock>) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
            clock,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads the document under a shared lock, so a concurrent save is either fully visible or
    /// not at all.
    async fn read_document(&self) -> Result<Option<String>> {
        let lock = open_lock(&self.path).await?;
        lock.lock_shared()?;
        let read = tokio::fs::read_to_string(&self.path).await;
        lock.unlock_async().await?;

        match read {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl StateStorage for FileStateStorage {
    async fn load(&self) -> Result<StoreState> {
        debug!("Loading state from {:?}", self.path);
        let content = self
            .read_document()
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        match content {
            Some(content) if !content.trim().is_empty() => {
                migration::decode(&content, self.clock.time(), DEFAULT_DURATION)
                    .with_context(|| format!("Failed to load {}", self.path.display()))
            }
            _ => {
                info!("No saved state in {:?}, starting empty", self.path);
                Ok(StoreState::default())
            }
        }
    }

    async fn save(&self, state: &StoreState) -> Result<()> {
        let document = migration::encode(state)?;
        write_atomically(&self.path, &document).await?;
        debug!(
            "Saved {} activities and {} history entries to {:?}",
            state.activities.len(),
            state.history.len(),
            self.path
        );
        Ok(())
    }
}
