//! Keeps [StoreState] on disk between runs.
//!  - State lives in a single JSON document named after [STORAGE_KEY].
//!  - Documents carry a version. Older unversioned shapes are upgraded by [migration] on load.
//!  - Nothing saves implicitly. Callers save after they are done with a batch of mutations.

pub mod file_storage;
pub mod migration;

use anyhow::Result;
use async_trait::async_trait;

use crate::store::entities::StoreState;

/// Fixed name the state is stored under.
pub const STORAGE_KEY: &str = "cronox";

/// Interface for abstracting where the state is kept.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateStorage: Send + Sync {
    /// Reads the stored state. A store that was never saved loads as empty.
    async fn load(&self) -> Result<StoreState>;

    async fn save(&self, state: &StoreState) -> Result<()>;
}
