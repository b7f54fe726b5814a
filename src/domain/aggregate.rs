//! Document hash aggregation: one deterministic fingerprint per equipment document set.

use futures::future::join_all;
use primitive_types::U256;
use std::sync::Arc;

use crate::crypto::hashing;
use crate::domain::ledger::LedgerReader;
use crate::domain::model::{parse_ledger_id, Fingerprint};
use crate::error::{PortalError, PortalResult};

pub const MSG_SALT_MISSING: &str = "Hash salt missing.";
pub const MSG_MISSING_EQUIPMENT_ID: &str = "Missing or invalid equipmentId";
pub const MSG_INVALID_EQUIPMENT_ID: &str =
    "Invalid equipmentId format. Must be a non-negative integer.";
pub const MSG_NO_DOCUMENTS: &str = "No documents found for this equipment to generate hash.";
pub const MSG_NO_CONTENT_IDS: &str =
    "Failed to retrieve content identifiers for linked documents.";
pub const MSG_INTERNAL: &str = "Internal server error during hash generation.";

/// Validates a caller-supplied equipment id (`None` when the field was absent).
pub fn parse_equipment_id(raw: Option<&str>) -> PortalResult<U256> {
    let raw = raw.ok_or_else(|| PortalError::validation(MSG_MISSING_EQUIPMENT_ID))?;
    parse_ledger_id(raw).map_err(|reason| PortalError::Validation {
        message: MSG_INVALID_EQUIPMENT_ID.to_string(),
        details: Some(reason),
    })
}

pub struct HashAggregator {
    ledger: Arc<dyn LedgerReader>,
    salt: Option<String>,
}

impl HashAggregator {
    pub fn new(ledger: Arc<dyn LedgerReader>, salt: Option<String>) -> Self {
        Self { ledger, salt }
    }

    /// Fails with a configuration error when no salt is set.
    pub fn check_configured(&self) -> PortalResult<&str> {
        self.salt
            .as_deref()
            .ok_or_else(|| PortalError::Configuration(MSG_SALT_MISSING.to_string()))
    }

    /// Computes the fingerprint of the documents attached to `equipment_id`.
    ///
    /// Details that fail to load, or carry no content identifier, are skipped; the call
    /// only fails when none of the attached documents yields one.
    pub async fn fingerprint(&self, equipment_id: U256) -> PortalResult<Fingerprint> {
        let salt = self.check_configured()?;

        let document_ids = self
            .ledger
            .equipment_document_ids(equipment_id)
            .await
            .map_err(|e| PortalError::upstream(MSG_INTERNAL, &e))?;
        if document_ids.is_empty() {
            return Err(PortalError::NotFound(MSG_NO_DOCUMENTS.to_string()));
        }

        let lookups = document_ids
            .iter()
            .map(|id| self.ledger.document_content_id(*id));
        let content_ids: Vec<String> = join_all(lookups)
            .await
            .into_iter()
            .zip(&document_ids)
            .filter_map(|(result, id)| match result {
                Ok(cid) if !cid.is_empty() => Some(cid),
                Ok(_) => {
                    tracing::warn!(document_id = %id, "document has no content identifier");
                    None
                }
                Err(e) => {
                    tracing::warn!(document_id = %id, "document lookup failed: {:#}", e);
                    None
                }
            })
            .collect();

        if content_ids.is_empty() {
            return Err(PortalError::Aggregation(MSG_NO_CONTENT_IDS.to_string()));
        }

        tracing::info!(
            equipment_id = %equipment_id,
            documents = document_ids.len(),
            hashed = content_ids.len(),
            "fingerprint computed"
        );
        Ok(Fingerprint(hashing::fingerprint(salt, &content_ids)))
    }

    /// Validates `raw` and computes its fingerprint.
    pub async fn fingerprint_for(&self, raw: Option<&str>) -> PortalResult<Fingerprint> {
        self.check_configured()?;
        let equipment_id = parse_equipment_id(raw)?;
        self.fingerprint(equipment_id).await
    }
}
