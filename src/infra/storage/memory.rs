//! Process-local storage network. Content identifiers are `sha256-<hex digest>`.

use anyhow::anyhow;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use super::{AccountId, SpaceId, StorageNetwork};

#[derive(Default)]
struct State {
    current: Option<SpaceId>,
    spaces: Vec<SpaceId>,
    accounts: Vec<AccountId>,
    provisioned: Vec<(AccountId, SpaceId)>,
    blobs: HashMap<String, Vec<u8>>,
    login_error: Option<String>,
    upload_error: Option<String>,
    spaces_created: usize,
}

#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<State>,
}

pub fn content_id(bytes: &[u8]) -> String {
    format!("sha256-{}", hex::encode(Sha256::digest(bytes)))
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every `login` fail with `message` (e.g. an unverified account).
    pub fn with_login_error(self, message: impl Into<String>) -> Self {
        self.lock().login_error = Some(message.into());
        self
    }

    pub fn with_upload_error(self, message: impl Into<String>) -> Self {
        self.lock().upload_error = Some(message.into());
        self
    }

    /// Pre-registers an account, as if a previous login had succeeded.
    pub fn with_account(self, account: AccountId) -> Self {
        self.lock().accounts.push(account);
        self
    }

    /// Pre-registers a space without selecting it.
    pub fn with_space(self, space: SpaceId) -> Self {
        self.lock().spaces.push(space);
        self
    }

    pub fn spaces_created(&self) -> usize {
        self.lock().spaces_created
    }

    pub fn is_provisioned(&self, account: &AccountId, space: &SpaceId) -> bool {
        self.lock()
            .provisioned
            .iter()
            .any(|(a, s)| a == account && s == space)
    }

    pub fn blob(&self, cid: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(cid).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StorageNetwork for MemoryStorage {
    async fn current_space(&self) -> anyhow::Result<Option<SpaceId>> {
        Ok(self.lock().current.clone())
    }

    async fn spaces(&self) -> anyhow::Result<Vec<SpaceId>> {
        Ok(self.lock().spaces.clone())
    }

    async fn set_current_space(&self, space: &SpaceId) -> anyhow::Result<()> {
        let mut state = self.lock();
        if !state.spaces.contains(space) {
            return Err(anyhow!("unknown space {}", space));
        }
        state.current = Some(space.clone());
        Ok(())
    }

    async fn accounts(&self) -> anyhow::Result<Vec<AccountId>> {
        Ok(self.lock().accounts.clone())
    }

    async fn login(&self, email: &str) -> anyhow::Result<AccountId> {
        let mut state = self.lock();
        if let Some(message) = &state.login_error {
            return Err(anyhow!("{}", message));
        }
        let account = AccountId(format!("did:mailto:{}", email));
        if !state.accounts.contains(&account) {
            state.accounts.push(account.clone());
        }
        Ok(account)
    }

    async fn create_space(&self, name: &str) -> anyhow::Result<SpaceId> {
        let mut state = self.lock();
        let space = SpaceId(format!("did:mem:{}", name));
        state.spaces.push(space.clone());
        state.current = Some(space.clone());
        state.spaces_created += 1;
        Ok(space)
    }

    async fn provision(&self, account: &AccountId, space: &SpaceId) -> anyhow::Result<()> {
        let mut state = self.lock();
        if !state.accounts.contains(account) {
            return Err(anyhow!("unknown account {}", account));
        }
        state.provisioned.push((account.clone(), space.clone()));
        Ok(())
    }

    async fn upload_file(&self, bytes: Vec<u8>) -> anyhow::Result<String> {
        let mut state = self.lock();
        if let Some(message) = &state.upload_error {
            return Err(anyhow!("{}", message));
        }
        if state.current.is_none() {
            return Err(anyhow!("no current space selected"));
        }
        let cid = content_id(&bytes);
        state.blobs.insert(cid.clone(), bytes);
        Ok(cid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_requires_a_selected_space() {
        let storage = MemoryStorage::new();
        assert!(storage.upload_file(b"x".to_vec()).await.is_err());

        let space = storage.create_space("one").await.unwrap();
        assert_eq!(storage.current_space().await.unwrap(), Some(space));
        let cid = storage.upload_file(b"x".to_vec()).await.unwrap();
        assert!(cid.starts_with("sha256-"));
        assert_eq!(storage.blob(&cid).unwrap(), b"x");
    }

    #[tokio::test]
    async fn identical_content_gets_identical_id() {
        assert_eq!(content_id(b"report"), content_id(b"report"));
        assert_ne!(content_id(b"report"), content_id(b"report2"));
    }

    #[tokio::test]
    async fn login_error_is_reported() {
        let storage = MemoryStorage::new().with_login_error("Account not verified");
        let err = storage.login("ops@plant.example").await.unwrap_err();
        assert!(err.to_string().contains("Account not verified"));
    }
}
