//! Seams to the certification ledger.
//!
//! Reads and writes are split so that components only depend on what they use: the hash
//! aggregator and role resolver need a [`LedgerReader`], the verification flow and the
//! `portalctl` workflows need a [`LedgerWriter`].

use async_trait::async_trait;
use primitive_types::{H256, U256};

use crate::domain::model::{
    Actor, Address, Document, DocumentType, Equipment, Fingerprint, IntegrityVerified, Plant,
};

#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn all_plants(&self) -> anyhow::Result<Vec<Plant>>;

    async fn equipment_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Equipment>>;

    /// Ordered ids of the documents attached to a piece of equipment.
    async fn equipment_document_ids(&self, equipment_id: U256) -> anyhow::Result<Vec<U256>>;

    async fn document(&self, document_id: U256) -> anyhow::Result<Document>;

    /// Content identifier of a document. Unlike [`LedgerReader::document`] it does not
    /// depend on the document's other fields being decodable.
    async fn document_content_id(&self, document_id: U256) -> anyhow::Result<String> {
        Ok(self.document(document_id).await?.content_id)
    }

    async fn documents_for_equipment(&self, equipment_id: U256) -> anyhow::Result<Vec<Document>>;

    async fn documents_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Document>>;

    async fn actors_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Actor>>;

    /// Role membership check on the access-control contract.
    async fn has_role(&self, role: H256, account: Address) -> anyhow::Result<bool>;

    /// Latest block height, used as a liveness probe.
    async fn block_number(&self) -> anyhow::Result<u64>;
}

/// Outcome of a certification decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificationDecision {
    Approve { final_hash: Fingerprint },
    Reject { reason: String },
}

/// A state-changing call on the certification contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    RegisterPlant {
        name: String,
        description: String,
        location: String,
        is_active: bool,
    },
    RegisterPlantOperator {
        operator: Address,
        plant_id: U256,
        name: String,
    },
    RegisterEquipment {
        name: String,
        description: String,
        plant_id: U256,
    },
    RegisterDocument {
        equipment_id: U256,
        doc_type: DocumentType,
        name: String,
        description: String,
        content_id: String,
    },
    EquipmentReadyForReview {
        equipment_id: U256,
    },
    ReviewEquipment {
        equipment_id: U256,
    },
    FinalizeCertification {
        equipment_id: U256,
        decision: CertificationDecision,
    },
    CheckAndLogEquipmentIntegrity {
        equipment_id: U256,
        calculated_hash: Fingerprint,
    },
}

impl LedgerCall {
    /// Contract function name, for logs and error messages.
    pub fn function_name(&self) -> &'static str {
        match self {
            LedgerCall::RegisterPlant { .. } => "registerPlant",
            LedgerCall::RegisterPlantOperator { .. } => "registerPlantOperator",
            LedgerCall::RegisterEquipment { .. } => "registerEquipment",
            LedgerCall::RegisterDocument { .. } => "registerDocument",
            LedgerCall::EquipmentReadyForReview { .. } => "equipmentIsReadyForReview",
            LedgerCall::ReviewEquipment { .. } => "reviewEquipment",
            LedgerCall::FinalizeCertification { .. } => "finalizeCertification",
            LedgerCall::CheckAndLogEquipmentIntegrity { .. } => "checkAndLogEquipmentIntegrity",
        }
    }
}

/// What the ledger currently knows about a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOutcome {
    /// Not yet included in a block.
    Pending,
    Reverted,
    Mined {
        integrity_events: Vec<IntegrityVerified>,
    },
}

#[async_trait]
pub trait LedgerWriter: Send + Sync {
    /// Submits `call` from `from` and returns the transaction hash once the node accepted it.
    async fn submit(&self, from: Address, call: LedgerCall) -> anyhow::Result<H256>;

    async fn transaction_outcome(&self, tx_hash: H256) -> anyhow::Result<TxOutcome>;
}
