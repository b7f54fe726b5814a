//! Domain model: ledger records, the integrity event and the document-set fingerprint.

use primitive_types::{H160, H256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub mod entities;
pub mod events;

pub use entities::{
    Actor, CertificationStep, Document, DocumentStatus, DocumentType, Equipment,
    EquipmentStatus, Plant,
};
pub use events::IntegrityVerified;

/// A ledger account address.
pub type Address = H160;

/// Parses a ledger identifier supplied by a caller: a non-negative base-10 integer that
/// fits in `uint256`. Surrounding whitespace is ignored.
pub fn parse_ledger_id(raw: &str) -> Result<U256, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("The id is empty.".to_string());
    }
    if trimmed.starts_with('-') {
        return Err("The id must be a positive number or zero.".to_string());
    }
    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{}' is not a base-10 integer.", trimmed));
    }
    U256::from_dec_str(trimmed).map_err(|_| "The id does not fit in 256 bits.".to_string())
}

/// Parses a `0x`-prefixed (or bare) 20-byte hex address.
pub fn parse_address(raw: &str) -> Result<Address, String> {
    let s = raw.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).map_err(|_| "invalid hex".to_string())?;
    if bytes.len() != 20 {
        return Err("expected 20-byte hex address".to_string());
    }
    Ok(H160::from_slice(&bytes))
}

/// Deterministic 32-byte digest of an equipment's document set plus the server salt.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub H256);

impl Fingerprint {
    pub fn as_h256(&self) -> H256 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .trim()
            .strip_prefix("0x")
            .ok_or_else(|| "expected a 0x-prefixed hash".to_string())?;
        if hex_part.len() != 64 {
            return Err("expected 64 hex characters".to_string());
        }
        let bytes = hex::decode(hex_part).map_err(|_| "invalid hex".to_string())?;
        Ok(Fingerprint(H256::from_slice(&bytes)))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Serializes `U256` ledger integers as base-10 strings (ids exceed JSON's safe range).
pub mod serde_u256 {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_ledger_id(&s).map_err(serde::de::Error::custom)
    }
}
