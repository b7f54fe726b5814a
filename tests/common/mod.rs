//! Shared fakes and helpers for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use primitive_types::{H160, H256, U256};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use nuclear_cert_portal::domain::ledger::{LedgerCall, LedgerReader, LedgerWriter, TxOutcome};
use nuclear_cert_portal::domain::model::{
    Actor, Address, Document, DocumentStatus, DocumentType, Equipment, IntegrityVerified, Plant,
};
use nuclear_cert_portal::infra::storage::StorageNetwork;
use nuclear_cert_portal::transport::http::{create_router, AppState};
use nuclear_cert_portal::{PortalConfig, PortalService};

pub const SALT: &str = "s3cr3t";
pub const EMAIL: &str = "ops@plant.example";

pub fn contract() -> H160 {
    H160::repeat_byte(0xcc)
}

pub fn account(byte: u8) -> Address {
    H160::repeat_byte(byte)
}

pub fn document(id: u64, content_id: &str) -> Document {
    Document {
        id: U256::from(id),
        name: format!("doc-{}", id),
        description: String::new(),
        doc_type: DocumentType::TechFile,
        status: DocumentStatus::Submitted,
        submitter: account(0x0d),
        submitted_at: None,
        rejected_at: None,
        pending_at: None,
        deprecated_at: None,
        content_id: content_id.to_string(),
    }
}

pub fn integrity_event(equipment_id: u64, tx_hash: H256, is_valid: Option<bool>) -> IntegrityVerified {
    IntegrityVerified {
        equipment_id: U256::from(equipment_id),
        calculated_hash: H256::repeat_byte(0xee),
        is_valid,
        checker: account(0x0a),
        timestamp: None,
        transaction_hash: tx_hash,
    }
}

#[derive(Default)]
struct LedgerState {
    document_ids: HashMap<U256, Vec<U256>>,
    documents: HashMap<U256, Document>,
    failing_documents: HashSet<U256>,
    document_ids_error: Option<String>,
    roles: HashSet<(H256, Address)>,
    role_probe_error: Option<String>,
    role_probes: usize,
    plants: Vec<Plant>,
    equipment: HashMap<U256, Vec<Equipment>>,
    actors: HashMap<U256, Vec<Actor>>,
    block_number: Option<u64>,
    submissions: Vec<(Address, LedgerCall)>,
    submit_error: Option<String>,
    outcomes: Vec<TxOutcome>,
    polls: usize,
}

/// In-memory ledger: scripted reads, recorded writes.
#[derive(Default)]
pub struct FakeLedger {
    state: Mutex<LedgerState>,
}

pub const TX_HASH: H256 = H256([0x77; 32]);

impl FakeLedger {
    pub fn new() -> Self {
        let ledger = Self::default();
        ledger.state.lock().unwrap().block_number = Some(1234);
        ledger
    }

    /// Attaches `documents` (id, content id) to `equipment_id`, in that order.
    pub fn with_documents(self, equipment_id: u64, documents: &[(u64, &str)]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let ids = documents.iter().map(|(id, _)| U256::from(*id)).collect();
            state.document_ids.insert(U256::from(equipment_id), ids);
            for (id, cid) in documents {
                state.documents.insert(U256::from(*id), document(*id, cid));
            }
        }
        self
    }

    pub fn with_failing_document(self, document_id: u64) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_documents
            .insert(U256::from(document_id));
        self
    }

    pub fn with_document_ids_error(self, message: &str) -> Self {
        self.state.lock().unwrap().document_ids_error = Some(message.to_string());
        self
    }

    pub fn with_role(self, role: H256, account: Address) -> Self {
        self.state.lock().unwrap().roles.insert((role, account));
        self
    }

    pub fn with_role_probe_error(self, message: &str) -> Self {
        self.state.lock().unwrap().role_probe_error = Some(message.to_string());
        self
    }

    pub fn with_plants(self, plants: Vec<Plant>) -> Self {
        self.state.lock().unwrap().plants = plants;
        self
    }

    pub fn with_equipment(self, plant_id: u64, equipment: Vec<Equipment>) -> Self {
        self.state
            .lock()
            .unwrap()
            .equipment
            .insert(U256::from(plant_id), equipment);
        self
    }

    pub fn unreachable(self) -> Self {
        self.state.lock().unwrap().block_number = None;
        self
    }

    pub fn with_submit_error(self, message: &str) -> Self {
        self.state.lock().unwrap().submit_error = Some(message.to_string());
        self
    }

    /// Outcomes returned by successive polls; the last one repeats.
    pub fn with_outcomes(self, outcomes: Vec<TxOutcome>) -> Self {
        self.state.lock().unwrap().outcomes = outcomes;
        self
    }

    pub fn submissions(&self) -> Vec<(Address, LedgerCall)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn role_probes(&self) -> usize {
        self.state.lock().unwrap().role_probes
    }
}

#[async_trait]
impl LedgerReader for FakeLedger {
    async fn all_plants(&self) -> anyhow::Result<Vec<Plant>> {
        Ok(self.state.lock().unwrap().plants.clone())
    }

    async fn equipment_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Equipment>> {
        let state = self.state.lock().unwrap();
        Ok(state.equipment.get(&plant_id).cloned().unwrap_or_default())
    }

    async fn equipment_document_ids(&self, equipment_id: U256) -> anyhow::Result<Vec<U256>> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.document_ids_error {
            anyhow::bail!("{}", message);
        }
        Ok(state.document_ids.get(&equipment_id).cloned().unwrap_or_default())
    }

    async fn document(&self, document_id: U256) -> anyhow::Result<Document> {
        let state = self.state.lock().unwrap();
        if state.failing_documents.contains(&document_id) {
            anyhow::bail!("execution reverted: document {}", document_id);
        }
        state
            .documents
            .get(&document_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown document {}", document_id))
    }

    async fn documents_for_equipment(&self, equipment_id: U256) -> anyhow::Result<Vec<Document>> {
        let state = self.state.lock().unwrap();
        let ids = state.document_ids.get(&equipment_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| state.documents.get(id).cloned())
            .collect())
    }

    async fn documents_by_plant(&self, _plant_id: U256) -> anyhow::Result<Vec<Document>> {
        let state = self.state.lock().unwrap();
        let mut docs: Vec<Document> = state.documents.values().cloned().collect();
        docs.sort_by_key(|d| d.id);
        Ok(docs)
    }

    async fn actors_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Actor>> {
        let state = self.state.lock().unwrap();
        Ok(state.actors.get(&plant_id).cloned().unwrap_or_default())
    }

    async fn has_role(&self, role: H256, account: Address) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.role_probes += 1;
        if let Some(message) = &state.role_probe_error {
            anyhow::bail!("{}", message);
        }
        Ok(state.roles.contains(&(role, account)))
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        self.state
            .lock()
            .unwrap()
            .block_number
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }
}

#[async_trait]
impl LedgerWriter for FakeLedger {
    async fn submit(&self, from: Address, call: LedgerCall) -> anyhow::Result<H256> {
        let mut state = self.state.lock().unwrap();
        if let Some(message) = &state.submit_error {
            anyhow::bail!("{}", message);
        }
        state.submissions.push((from, call));
        Ok(TX_HASH)
    }

    async fn transaction_outcome(&self, _tx_hash: H256) -> anyhow::Result<TxOutcome> {
        let mut state = self.state.lock().unwrap();
        let index = state.polls.min(state.outcomes.len().saturating_sub(1));
        state.polls += 1;
        Ok(state.outcomes.get(index).cloned().unwrap_or(TxOutcome::Pending))
    }
}

pub fn config(salt: Option<&str>, email: Option<&str>, tmp_dir: &Path) -> PortalConfig {
    let mut config = PortalConfig::local(contract());
    config.final_hash_salt = salt.map(str::to_string);
    config.storage_login_email = email.map(str::to_string);
    config.upload_tmp_dir = tmp_dir.to_path_buf();
    config
}

pub fn app(
    ledger: Arc<dyn LedgerReader>,
    storage: Arc<dyn StorageNetwork>,
    config: &PortalConfig,
) -> Router {
    let portal = PortalService::new(ledger, storage, config);
    create_router(AppState {
        portal: Arc::new(portal),
    })
}

/// Serves `router` on an ephemeral port and returns its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

pub async fn send(router: Router, request: Request<Body>) -> (u16, serde_json::Value) {
    let response: Response<Body> = router.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

pub fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub const BOUNDARY: &str = "portal-test-boundary";

/// Multipart body with one field named `field_name` holding `bytes`.
pub fn multipart_post(uri: &str, field_name: &str, bytes: &[u8]) -> Request<Body> {
    multipart_fields(uri, &[(field_name, bytes)])
}

/// Multipart body with the given `(name, bytes)` fields, in order.
pub fn multipart_fields(uri: &str, fields: &[(&str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, bytes) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"report.pdf\"\r\n",
                name
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
