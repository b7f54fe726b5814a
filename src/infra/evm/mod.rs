//! Ledger access over Ethereum JSON-RPC.

pub mod abi;
pub mod client;
pub mod rpc;

pub use client::CertificationLedger;
pub use rpc::RpcClient;
