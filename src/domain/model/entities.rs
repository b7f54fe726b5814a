//! Records owned by the certification ledger, as this service reads them.

use chrono::{DateTime, Utc};
use primitive_types::{H256, U256};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{serde_u256, Address};

/// Converts a ledger timestamp (unix seconds, `0` meaning "never") into a UTC date.
pub fn ledger_time(seconds: U256) -> Option<DateTime<Utc>> {
    if seconds.is_zero() || seconds > U256::from(i64::MAX as u64) {
        return None;
    }
    DateTime::from_timestamp(seconds.as_u64() as i64, 0)
}

macro_rules! ledger_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant = $value),+
        }

        impl TryFrom<u8> for $name {
            type Error = anyhow::Error;

            fn try_from(value: u8) -> anyhow::Result<Self> {
                match value {
                    $($value => Ok($name::$variant),)+
                    other => Err(anyhow::anyhow!(
                        "unknown {} discriminant: {}",
                        stringify!($name),
                        other
                    )),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

ledger_enum!(
    /// Position of a piece of equipment in the certification workflow.
    CertificationStep {
        Registered = 0,
        DocumentsPending = 1,
        ReadyForReview = 2,
        UnderReview = 3,
        Certified = 4,
        Rejected = 5,
    }
);

ledger_enum!(DocumentType {
    Certification = 0,
    LabReport = 1,
    TechFile = 2,
    Compliance = 3,
    RegulatoryReview = 4,
});

ledger_enum!(DocumentStatus {
    Submitted = 0,
    Pending = 1,
    Rejected = 2,
    Deprecated = 3,
});

ledger_enum!(EquipmentStatus {
    Registered = 0,
    Pending = 1,
    Certified = 2,
    Rejected = 3,
    Deprecated = 4,
});

impl std::str::FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "certification" => Ok(DocumentType::Certification),
            "lab_report" => Ok(DocumentType::LabReport),
            "tech_file" => Ok(DocumentType::TechFile),
            "compliance" => Ok(DocumentType::Compliance),
            "regulatory_review" => Ok(DocumentType::RegulatoryReview),
            other => Err(anyhow::anyhow!("unknown document type: {}", other)),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Plant {
    #[serde(with = "serde_u256")]
    #[schema(value_type = String)]
    pub id: U256,
    pub name: String,
    pub description: String,
    pub location: String,
    #[schema(value_type = Option<String>)]
    pub registered_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Actor {
    #[serde(with = "serde_u256")]
    #[schema(value_type = String)]
    pub id: U256,
    pub name: String,
    #[schema(value_type = String)]
    pub address: Address,
    /// Ledger role id (`bytes32`).
    #[schema(value_type = String)]
    pub role: H256,
    #[schema(value_type = Option<String>)]
    pub registered_at: Option<DateTime<Utc>>,
    #[serde(with = "serde_u256")]
    #[schema(value_type = String)]
    pub plant_id: U256,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Equipment {
    #[serde(with = "serde_u256")]
    #[schema(value_type = String)]
    pub id: U256,
    pub name: String,
    pub description: String,
    pub current_step: CertificationStep,
    pub status: EquipmentStatus,
    #[schema(value_type = Option<String>)]
    pub registered_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub certified_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub pending_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub deprecated_at: Option<DateTime<Utc>>,
    #[schema(value_type = String)]
    pub final_certification_hash: H256,
    pub rejection_reason: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct Document {
    #[serde(with = "serde_u256")]
    #[schema(value_type = String)]
    pub id: U256,
    pub name: String,
    pub description: String,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    #[schema(value_type = String)]
    pub submitter: Address,
    #[schema(value_type = Option<String>)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub rejected_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub pending_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub deprecated_at: Option<DateTime<Utc>>,
    /// Content identifier of the file in the storage network (ledger field `ipfsHash`).
    pub content_id: String,
}
