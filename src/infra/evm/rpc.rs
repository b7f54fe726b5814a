// Ethereum JSON-RPC transport (reqwest). Only the handful of methods the portal needs.

use anyhow::{anyhow, Context};
use primitive_types::{H160, H256};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Deserialize, Debug)]
struct RpcResponse {
    #[serde(default)]
    result: JsonValue,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RPC error {}: {}", self.code, self.message)?;
        if let Some(data) = &self.data {
            write!(f, " ({})", data)?;
        }
        Ok(())
    }
}

impl std::error::Error for RpcError {}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Log {
    pub address: H160,
    pub topics: Vec<H256>,
    pub data: String,
    #[serde(default)]
    pub transaction_hash: Option<H256>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_hash: H256,
    /// `0x1` on success, `0x0` when reverted.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub logs: Vec<Log>,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => parse_quantity(status).map(|v| v == 1).unwrap_or(false),
            // Pre-Byzantium receipts carry no status.
            None => true,
        }
    }
}

pub fn decode_hex_data(data: &str) -> anyhow::Result<Vec<u8>> {
    let s = data.strip_prefix("0x").unwrap_or(data);
    hex::decode(s).with_context(|| format!("invalid hex data: {}", data))
}

pub fn parse_quantity(quantity: &str) -> anyhow::Result<u64> {
    let s = quantity
        .strip_prefix("0x")
        .ok_or_else(|| anyhow!("quantity is not 0x-prefixed: {}", quantity))?;
    u64::from_str_radix(s, 16).with_context(|| format!("invalid quantity: {}", quantity))
}

fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Thin JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: JsonValue,
    ) -> anyhow::Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{} request to {} failed", method, self.url))?
            .error_for_status()?
            .json::<RpcResponse>()
            .await
            .with_context(|| format!("{} returned a malformed JSON-RPC response", method))?;

        if let Some(error) = response.error {
            return Err(anyhow::Error::new(error).context(format!("{} rejected", method)));
        }
        serde_json::from_value(response.result)
            .with_context(|| format!("{} returned an unexpected result shape", method))
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn call(&self, to: H160, data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let result: String = self
            .request(
                "eth_call",
                json!([{ "to": to, "data": hex_data(data) }, "latest"]),
            )
            .await?;
        decode_hex_data(&result)
    }

    /// `eth_sendTransaction` from an account managed by the node.
    pub async fn send_transaction(
        &self,
        from: H160,
        to: H160,
        data: &[u8],
    ) -> anyhow::Result<H256> {
        self.request(
            "eth_sendTransaction",
            json!([{ "from": from, "to": to, "data": hex_data(data) }]),
        )
        .await
    }

    pub async fn transaction_receipt(&self, tx_hash: H256) -> anyhow::Result<Option<Receipt>> {
        self.request("eth_getTransactionReceipt", json!([tx_hash]))
            .await
    }

    pub async fn block_number(&self) -> anyhow::Result<u64> {
        let quantity: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    pub async fn chain_id(&self) -> anyhow::Result<u64> {
        let quantity: String = self.request("eth_chainId", json!([])).await?;
        parse_quantity(&quantity)
    }

    pub async fn code_at(&self, address: H160) -> anyhow::Result<Vec<u8>> {
        let code: String = self
            .request("eth_getCode", json!([address, "latest"]))
            .await?;
        decode_hex_data(&code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x7a69").unwrap(), 31337);
        assert!(parse_quantity("12").is_err());
    }

    #[test]
    fn receipt_status() {
        let receipt: Receipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x0",
            "logs": []
        }))
        .unwrap();
        assert!(!receipt.succeeded());

        let receipt: Receipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "status": "0x1"
        }))
        .unwrap();
        assert!(receipt.succeeded());
        assert!(receipt.logs.is_empty());
    }

    #[test]
    fn rpc_error_display_includes_data() {
        let err = RpcError {
            code: 3,
            message: "execution reverted".into(),
            data: Some(json!("0x08c379a0")),
        };
        assert_eq!(
            err.to_string(),
            "RPC error 3: execution reverted (\"0x08c379a0\")"
        );
    }
}
