use chrono::{DateTime, Utc};
use primitive_types::{H256, U256};
use serde::Serialize;

use super::{serde_u256, Address};

/// `IntegrityVerified(uint256 indexed equipmentId, bytes32 calculatedHash, bool isValid,
/// address checker, uint256 timestamp)`, emitted by `checkAndLogEquipmentIntegrity`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IntegrityVerified {
    #[serde(with = "serde_u256")]
    pub equipment_id: U256,
    pub calculated_hash: H256,
    /// `None` when the encoded flag is neither 0 nor 1.
    pub is_valid: Option<bool>,
    pub checker: Address,
    pub timestamp: Option<DateTime<Utc>>,
    pub transaction_hash: H256,
}
