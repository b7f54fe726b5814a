//! REST gateway in front of the storage network client.
//!
//! Gateway routes (JSON unless noted):
//! - `GET  /spaces`                  → `{ "spaces": [did], "current": did | null }`
//! - `PUT  /spaces/current`          ← `{ "did" }`
//! - `GET  /accounts`                → `{ "accounts": [did] }`
//! - `POST /login`                   ← `{ "email" }` → `{ "did" }`
//! - `POST /spaces`                  ← `{ "name" }` → `{ "did" }` (saved and selected)
//! - `POST /spaces/{did}/provision`  ← `{ "account" }`
//! - `POST /upload` (multipart `file`) → `{ "cid" }`
//!
//! Non-2xx answers carry `{ "error": string }`; that message becomes the error text so
//! callers can recognise verification failures.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{AccountId, SpaceId, StorageNetwork};

#[derive(Deserialize)]
struct SpacesResponse {
    #[serde(default)]
    spaces: Vec<SpaceId>,
    #[serde(default)]
    current: Option<SpaceId>,
}

#[derive(Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    accounts: Vec<AccountId>,
}

#[derive(Deserialize)]
struct DidResponse {
    did: String,
}

#[derive(Deserialize)]
struct CidResponse {
    cid: String,
}

#[derive(Deserialize)]
struct GatewayError {
    error: String,
}

pub struct HttpStorage {
    http: reqwest::Client,
    base_url: String,
}

impl HttpStorage {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> anyhow::Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GatewayError>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            return Err(anyhow!("{} failed ({}): {}", what, status, message));
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("{} returned an unexpected body", what))
    }

    async fn expect_success(response: reqwest::Response, what: &str) -> anyhow::Result<()> {
        Self::read::<serde_json::Value>(response, what).await.map(|_| ())
    }

    async fn spaces_listing(&self) -> anyhow::Result<SpacesResponse> {
        let response = self.http.get(self.url("/spaces")).send().await?;
        Self::read(response, "list spaces").await
    }
}

#[async_trait]
impl StorageNetwork for HttpStorage {
    async fn current_space(&self) -> anyhow::Result<Option<SpaceId>> {
        Ok(self.spaces_listing().await?.current)
    }

    async fn spaces(&self) -> anyhow::Result<Vec<SpaceId>> {
        Ok(self.spaces_listing().await?.spaces)
    }

    async fn set_current_space(&self, space: &SpaceId) -> anyhow::Result<()> {
        let response = self
            .http
            .put(self.url("/spaces/current"))
            .json(&json!({ "did": space }))
            .send()
            .await?;
        Self::expect_success(response, "select space").await
    }

    async fn accounts(&self) -> anyhow::Result<Vec<AccountId>> {
        let response = self.http.get(self.url("/accounts")).send().await?;
        let body: AccountsResponse = Self::read(response, "list accounts").await?;
        Ok(body.accounts)
    }

    async fn login(&self, email: &str) -> anyhow::Result<AccountId> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&json!({ "email": email }))
            .send()
            .await?;
        let body: DidResponse = Self::read(response, "login").await?;
        Ok(AccountId(body.did))
    }

    async fn create_space(&self, name: &str) -> anyhow::Result<SpaceId> {
        let response = self
            .http
            .post(self.url("/spaces"))
            .json(&json!({ "name": name }))
            .send()
            .await?;
        let body: DidResponse = Self::read(response, "create space").await?;
        Ok(SpaceId(body.did))
    }

    async fn provision(&self, account: &AccountId, space: &SpaceId) -> anyhow::Result<()> {
        let response = self
            .http
            .post(self.url(&format!("/spaces/{}/provision", space)))
            .json(&json!({ "account": account }))
            .send()
            .await?;
        Self::expect_success(response, "provision space").await
    }

    async fn upload_file(&self, bytes: Vec<u8>) -> anyhow::Result<String> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name("upload.bin");
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let body: CidResponse = Self::read(response, "upload").await?;
        Ok(body.cid)
    }
}
