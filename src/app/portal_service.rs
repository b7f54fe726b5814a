//! The portal service: the components the HTTP surface exposes, wired to one ledger
//! reader and one storage client.

use primitive_types::U256;
use std::sync::Arc;

use crate::domain::aggregate::HashAggregator;
use crate::domain::ledger::LedgerReader;
use crate::domain::model::{parse_ledger_id, Actor, Address, Document, Equipment, Fingerprint, Plant};
use crate::domain::roles::{AccessDecision, AccessGuard, Role, RoleResolver, Section};
use crate::domain::upload::UploadGateway;
use crate::error::{PortalError, PortalResult};
use crate::infra::config::PortalConfig;
use crate::infra::evm::CertificationLedger;
use crate::infra::storage::{self, StorageNetwork};

const MSG_LEDGER_READ: &str = "Failed to read from the ledger.";

fn ledger_read_error(e: anyhow::Error) -> PortalError {
    PortalError::upstream(MSG_LEDGER_READ, &e)
}

fn parse_id(raw: &str, what: &str) -> PortalResult<U256> {
    parse_ledger_id(raw).map_err(|reason| PortalError::Validation {
        message: format!("Invalid {} id. Must be a non-negative integer.", what),
        details: Some(reason),
    })
}

pub struct PortalService {
    ledger: Arc<dyn LedgerReader>,
    aggregator: HashAggregator,
    uploads: UploadGateway,
    access: AccessGuard,
}

impl PortalService {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        storage: Arc<dyn StorageNetwork>,
        config: &PortalConfig,
    ) -> Self {
        Self {
            aggregator: HashAggregator::new(ledger.clone(), config.final_hash_salt.clone()),
            uploads: UploadGateway::new(
                storage,
                config.storage_login_email.clone(),
                config.upload_tmp_dir.clone(),
            ),
            access: AccessGuard::new(RoleResolver::new(ledger.clone())),
            ledger,
        }
    }

    /// Builds the service against the configured JSON-RPC node and storage backend.
    pub fn from_config(config: &PortalConfig) -> anyhow::Result<Self> {
        let ledger = Arc::new(CertificationLedger::from_config(config)?);
        let storage = storage::from_backend(&config.storage_backend)?;
        Ok(Self::new(ledger, storage, config))
    }

    pub fn aggregator(&self) -> &HashAggregator {
        &self.aggregator
    }

    pub fn uploads(&self) -> &UploadGateway {
        &self.uploads
    }

    pub async fn generate_final_hash(&self, equipment_id: Option<&str>) -> PortalResult<Fingerprint> {
        self.aggregator.fingerprint_for(equipment_id).await
    }

    pub async fn account_role(&self, account: Address) -> PortalResult<Role> {
        self.access.resolver().resolve(Some(account)).await
    }

    pub async fn check_access(
        &self,
        account: Option<Address>,
        section: Section,
    ) -> PortalResult<AccessDecision> {
        self.access.check(account, section).await
    }

    /// Latest block height; fails when the ledger node is unreachable.
    pub async fn ledger_height(&self) -> anyhow::Result<u64> {
        self.ledger.block_number().await
    }

    pub async fn plants(&self) -> PortalResult<Vec<Plant>> {
        self.ledger.all_plants().await.map_err(ledger_read_error)
    }

    pub async fn plant_equipment(&self, plant_id: &str) -> PortalResult<Vec<Equipment>> {
        let id = parse_id(plant_id, "plant")?;
        self.ledger
            .equipment_by_plant(id)
            .await
            .map_err(ledger_read_error)
    }

    pub async fn plant_documents(&self, plant_id: &str) -> PortalResult<Vec<Document>> {
        let id = parse_id(plant_id, "plant")?;
        self.ledger
            .documents_by_plant(id)
            .await
            .map_err(ledger_read_error)
    }

    pub async fn plant_actors(&self, plant_id: &str) -> PortalResult<Vec<Actor>> {
        let id = parse_id(plant_id, "plant")?;
        self.ledger.actors_by_plant(id).await.map_err(ledger_read_error)
    }

    pub async fn equipment_documents(&self, equipment_id: &str) -> PortalResult<Vec<Document>> {
        let id = parse_id(equipment_id, "equipment")?;
        self.ledger
            .documents_for_equipment(id)
            .await
            .map_err(ledger_read_error)
    }
}
