//! Content-addressed storage network seam.
//!
//! The upload gateway only needs the handful of client operations below: inspect and
//! select spaces, log an account in, create and provision a space, upload a blob.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod http;
pub mod memory;

pub use http::HttpStorage;
pub use memory::MemoryStorage;

use crate::infra::config::StorageBackend;

/// Identifier of a storage space (a DID in the storage network).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SpaceId(pub String);

/// Identifier of a storage account.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AccountId(pub String);

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait StorageNetwork: Send + Sync {
    /// The space uploads currently go to, if one is selected.
    async fn current_space(&self) -> anyhow::Result<Option<SpaceId>>;

    async fn spaces(&self) -> anyhow::Result<Vec<SpaceId>>;

    async fn set_current_space(&self, space: &SpaceId) -> anyhow::Result<()>;

    async fn accounts(&self) -> anyhow::Result<Vec<AccountId>>;

    /// Logs in with an email identity. May fail until the account is verified.
    async fn login(&self, email: &str) -> anyhow::Result<AccountId>;

    /// Creates a space named `name`, saves it and selects it as current.
    async fn create_space(&self, name: &str) -> anyhow::Result<SpaceId>;

    async fn provision(&self, account: &AccountId, space: &SpaceId) -> anyhow::Result<()>;

    /// Uploads `bytes` to the current space and returns the content identifier.
    async fn upload_file(&self, bytes: Vec<u8>) -> anyhow::Result<String>;
}

/// Builds the storage client selected by configuration.
pub fn from_backend(backend: &StorageBackend) -> anyhow::Result<Arc<dyn StorageNetwork>> {
    Ok(match backend {
        StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        StorageBackend::Http { api_url } => Arc::new(HttpStorage::new(api_url.clone())?),
    })
}
