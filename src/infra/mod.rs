pub mod config;
pub mod evm;
pub mod storage;
pub mod telemetry;
