use anyhow::anyhow;
use async_trait::async_trait;
use primitive_types::U256;
use serde::Deserialize;
use serde_json::json;

use crate::domain::aggregate::HashAggregator;

/// Where the verification flow obtains an equipment fingerprint.
///
/// Returns the hash text as produced by the source. Error messages are shown to the user
/// as they are.
#[async_trait]
pub trait FingerprintSource: Send + Sync {
    async fn fingerprint(&self, equipment_id: U256) -> anyhow::Result<String>;
}

#[async_trait]
impl FingerprintSource for HashAggregator {
    async fn fingerprint(&self, equipment_id: U256) -> anyhow::Result<String> {
        let fp = HashAggregator::fingerprint(self, equipment_id).await?;
        Ok(fp.to_string())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HashReply {
    #[serde(default)]
    final_hash: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client of a running portal's `/hash-generation` route.
pub struct HashServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl HashServiceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FingerprintSource for HashServiceClient {
    async fn fingerprint(&self, equipment_id: U256) -> anyhow::Result<String> {
        let response = self
            .http
            .post(format!("{}/hash-generation", self.base_url))
            .json(&json!({ "equipmentId": equipment_id.to_string() }))
            .send()
            .await
            .map_err(|e| anyhow!("Hash service unreachable: {}", e))?;

        let status = response.status();
        let reply: HashReply = response
            .json()
            .await
            .map_err(|_| anyhow!("Hash service error ({})", status))?;
        if !status.is_success() {
            return Err(anyhow!(reply
                .error
                .unwrap_or_else(|| format!("Hash service error ({})", status))));
        }
        reply
            .final_hash
            .ok_or_else(|| anyhow!("Invalid hash received from the hash service."))
    }
}
