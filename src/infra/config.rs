//! Centralized configuration (environment variables + defaults).
//!
//! Every setting has its own accessor; [`PortalConfig::from_env`] collects them once at
//! startup so the rest of the service receives plain values.

use anyhow::{anyhow, Context};
use primitive_types::H160;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::domain::model::parse_address;

pub const DEFAULT_HARDHAT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Chain id of the local Hardhat/Anvil node.
pub const LOCAL_CHAIN_ID: u64 = 31337;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(name: &str) -> anyhow::Result<String> {
    optional(name).ok_or_else(|| anyhow!("{} must be set", name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChain {
    Local,
    Sepolia,
}

impl LedgerChain {
    pub fn expected_chain_id(self) -> u64 {
        match self {
            LedgerChain::Local => LOCAL_CHAIN_ID,
            LedgerChain::Sepolia => SEPOLIA_CHAIN_ID,
        }
    }
}

impl std::str::FromStr for LedgerChain {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "hardhat" => Ok(LedgerChain::Local),
            "sepolia" => Ok(LedgerChain::Sepolia),
            other => Err(anyhow!("LEDGER_CHAIN must be 'local' or 'sepolia', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Http { api_url: String },
}

/// Fingerprint salt. `None` leaves the hash route answering with a configuration error.
pub fn final_hash_salt() -> Option<String> {
    optional("FINAL_HASH_SALT")
}

/// Login identity for the storage network.
pub fn storage_login_email() -> Option<String> {
    optional("STORAGE_LOGIN_EMAIL")
}

pub fn ledger_chain() -> anyhow::Result<LedgerChain> {
    optional("LEDGER_CHAIN").map_or(Ok(LedgerChain::Local), |v| v.parse())
}

/// RPC endpoint for the selected chain.
pub fn ledger_rpc_url(chain: LedgerChain) -> anyhow::Result<String> {
    match chain {
        LedgerChain::Local => {
            Ok(optional("HARDHAT_RPC_URL").unwrap_or_else(|| DEFAULT_HARDHAT_RPC_URL.to_string()))
        }
        LedgerChain::Sepolia => required("SEPOLIA_RPC_URL"),
    }
}

/// Address of the certification implementation contract (required).
pub fn certification_contract() -> anyhow::Result<H160> {
    let raw = required("CERTIFICATION_CONTRACT_ADDRESS")?;
    parse_address(&raw).map_err(|e| anyhow!("CERTIFICATION_CONTRACT_ADDRESS is invalid: {}", e))
}

/// Address of the storage contract answering `hasRole`. Defaults to the certification
/// contract for single-contract deployments.
pub fn roles_contract(certification: H160) -> anyhow::Result<H160> {
    match optional("ROLES_CONTRACT_ADDRESS") {
        Some(raw) => parse_address(&raw)
            .map_err(|e| anyhow!("ROLES_CONTRACT_ADDRESS is invalid: {}", e)),
        None => Ok(certification),
    }
}

pub fn storage_backend() -> anyhow::Result<StorageBackend> {
    match optional("STORAGE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
        None | Some("memory") => Ok(StorageBackend::Memory),
        Some("http") => Ok(StorageBackend::Http {
            api_url: required("STORAGE_API_URL")?,
        }),
        Some(other) => Err(anyhow!("STORAGE_BACKEND must be 'memory' or 'http', got '{}'", other)),
    }
}

/// Directory for upload temporary files (`~` is expanded).
pub fn upload_tmp_dir() -> PathBuf {
    match optional("UPLOAD_TMP_DIR") {
        Some(dir) => PathBuf::from(shellexpand::tilde(&dir).to_string()),
        None => std::env::temp_dir(),
    }
}

pub fn bind_addr() -> anyhow::Result<SocketAddr> {
    let raw = optional("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
    raw.parse()
        .with_context(|| format!("BIND_ADDR is not a socket address: {}", raw))
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub final_hash_salt: Option<String>,
    pub storage_login_email: Option<String>,
    pub ledger_chain: LedgerChain,
    pub ledger_rpc_url: String,
    pub certification_contract: H160,
    pub roles_contract: H160,
    pub storage_backend: StorageBackend,
    pub upload_tmp_dir: PathBuf,
    pub bind_addr: SocketAddr,
}

impl PortalConfig {
    /// Loads `.env` (if present) and reads every setting from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let ledger_chain = ledger_chain()?;
        let certification_contract = certification_contract()?;
        Ok(Self {
            final_hash_salt: final_hash_salt(),
            storage_login_email: storage_login_email(),
            ledger_chain,
            ledger_rpc_url: ledger_rpc_url(ledger_chain)?,
            certification_contract,
            roles_contract: roles_contract(certification_contract)?,
            storage_backend: storage_backend()?,
            upload_tmp_dir: upload_tmp_dir(),
            bind_addr: bind_addr()?,
        })
    }

    /// Configuration for a local node and in-memory storage, used by tests and demos.
    pub fn local(certification_contract: H160) -> Self {
        Self {
            final_hash_salt: None,
            storage_login_email: None,
            ledger_chain: LedgerChain::Local,
            ledger_rpc_url: DEFAULT_HARDHAT_RPC_URL.to_string(),
            certification_contract,
            roles_contract: certification_contract,
            storage_backend: StorageBackend::Memory,
            upload_tmp_dir: std::env::temp_dir(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
        }
    }
}
