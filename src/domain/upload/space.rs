//! Idempotent storage space bootstrap.

use anyhow::Context;
use rand::Rng;
use tokio::sync::Mutex;

use crate::infra::storage::{SpaceId, StorageNetwork};

pub const SPACE_NAME_PREFIX: &str = "cert-portal";

fn new_space_name() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!(
        "{}-{}-{:08x}",
        SPACE_NAME_PREFIX,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

/// Makes sure uploads have a space to go to, creating at most one per process.
///
/// The whole check-then-create sequence runs under one lock and the outcome is cached,
/// so concurrent uploads never race into creating two spaces. Failures are not cached.
#[derive(Default)]
pub struct SpaceBootstrap {
    slot: Mutex<Option<SpaceId>>,
}

impl SpaceBootstrap {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn cached(&self) -> Option<SpaceId> {
        self.slot.lock().await.clone()
    }

    pub async fn ensure_space(
        &self,
        storage: &dyn StorageNetwork,
        email: &str,
    ) -> anyhow::Result<SpaceId> {
        let mut slot = self.slot.lock().await;
        if let Some(space) = slot.as_ref() {
            return Ok(space.clone());
        }

        let space = Self::find_or_create(storage, email).await?;
        *slot = Some(space.clone());
        Ok(space)
    }

    async fn find_or_create(storage: &dyn StorageNetwork, email: &str) -> anyhow::Result<SpaceId> {
        if let Some(current) = storage.current_space().await? {
            tracing::debug!(space = %current, "reusing current storage space");
            return Ok(current);
        }

        if let Some(first) = storage.spaces().await?.into_iter().next() {
            storage.set_current_space(&first).await?;
            tracing::info!(space = %first, "selected existing storage space");
            return Ok(first);
        }

        let account = match storage.accounts().await?.into_iter().next() {
            Some(account) => account,
            None => storage
                .login(email)
                .await
                .context("storage login failed")?,
        };

        let name = new_space_name();
        let space = storage
            .create_space(&name)
            .await
            .with_context(|| format!("failed to create space {}", name))?;
        storage
            .provision(&account, &space)
            .await
            .with_context(|| format!("failed to provision space {} to {}", space, account))?;
        tracing::info!(space = %space, account = %account, "created storage space");
        Ok(space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_names_are_prefixed_and_unique() {
        let a = new_space_name();
        let b = new_space_name();
        assert!(a.starts_with("cert-portal-"));
        assert_eq!(a.split('-').count(), 4);
        assert_ne!(a, b);
    }
}
