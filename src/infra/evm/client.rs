// Responsible for all communication with the certification contracts.

use async_trait::async_trait;
use primitive_types::{H160, H256, U256};

use crate::crypto::hashing::event_topic;
use crate::domain::ledger::{CertificationDecision, LedgerCall, LedgerReader, LedgerWriter, TxOutcome};
use crate::domain::model::entities::ledger_time;
use crate::domain::model::{
    Actor, Address, Document, Equipment, IntegrityVerified, Plant,
};
use crate::infra::config::PortalConfig;
use crate::infra::evm::abi::{encode_call, AbiReader, Token};
use crate::infra::evm::rpc::{decode_hex_data, Log, RpcClient};

pub const INTEGRITY_VERIFIED_EVENT: &str =
    "IntegrityVerified(uint256,bytes32,bool,address,uint256)";

pub fn decode_plant(t: AbiReader<'_>) -> anyhow::Result<Plant> {
    Ok(Plant {
        id: t.uint(0)?,
        name: t.string(1)?,
        description: t.string(2)?,
        location: t.string(3)?,
        registered_at: ledger_time(t.uint(4)?),
        is_active: t.bool(5)?,
    })
}

pub fn decode_actor(t: AbiReader<'_>) -> anyhow::Result<Actor> {
    Ok(Actor {
        id: t.uint(0)?,
        name: t.string(1)?,
        address: t.address(2)?,
        role: t.bytes32(3)?,
        registered_at: ledger_time(t.uint(4)?),
        plant_id: t.uint(5)?,
    })
}

pub fn decode_equipment(t: AbiReader<'_>) -> anyhow::Result<Equipment> {
    Ok(Equipment {
        id: t.uint(0)?,
        name: t.string(1)?,
        description: t.string(2)?,
        current_step: t.uint8(3)?.try_into()?,
        status: t.uint8(4)?.try_into()?,
        registered_at: ledger_time(t.uint(5)?),
        certified_at: ledger_time(t.uint(6)?),
        rejected_at: ledger_time(t.uint(7)?),
        pending_at: ledger_time(t.uint(8)?),
        deprecated_at: ledger_time(t.uint(9)?),
        final_certification_hash: t.bytes32(10)?,
        rejection_reason: t.string(11)?,
    })
}

pub fn decode_document(t: AbiReader<'_>) -> anyhow::Result<Document> {
    Ok(Document {
        id: t.uint(0)?,
        name: t.string(1)?,
        description: t.string(2)?,
        doc_type: t.uint8(3)?.try_into()?,
        status: t.uint8(4)?.try_into()?,
        submitter: t.address(5)?,
        submitted_at: ledger_time(t.uint(6)?),
        rejected_at: ledger_time(t.uint(7)?),
        pending_at: ledger_time(t.uint(8)?),
        deprecated_at: ledger_time(t.uint(9)?),
        content_id: t.string(10)?,
    })
}

/// Reads only the content identifier of a document tuple, ignoring the other fields.
pub fn decode_document_content_id(t: AbiReader<'_>) -> anyhow::Result<String> {
    t.string(10)
}

/// Decodes an `IntegrityVerified` log emitted by `contract`. Returns `None` for any other log.
pub fn decode_integrity_log(
    contract: H160,
    tx_hash: H256,
    log: &Log,
) -> anyhow::Result<Option<IntegrityVerified>> {
    if log.address != contract
        || log.topics.first() != Some(&event_topic(INTEGRITY_VERIFIED_EVENT))
    {
        return Ok(None);
    }
    let equipment_topic = log
        .topics
        .get(1)
        .ok_or_else(|| anyhow::anyhow!("IntegrityVerified log without equipmentId topic"))?;
    let data = decode_hex_data(&log.data)?;
    let fields = AbiReader::new(&data);

    Ok(Some(IntegrityVerified {
        equipment_id: U256::from_big_endian(equipment_topic.as_bytes()),
        calculated_hash: fields.bytes32(0)?,
        is_valid: fields.bool_lenient(1)?,
        checker: fields.address(2)?,
        timestamp: ledger_time(fields.uint(3)?),
        transaction_hash: log.transaction_hash.unwrap_or(tx_hash),
    }))
}

/// Encodes a state-changing call into contract call data.
pub fn call_data(call: &LedgerCall) -> Vec<u8> {
    match call {
        LedgerCall::RegisterPlant {
            name,
            description,
            location,
            is_active,
        } => encode_call(
            "registerPlant(string,string,string,bool)",
            &[
                Token::String(name.clone()),
                Token::String(description.clone()),
                Token::String(location.clone()),
                Token::Bool(*is_active),
            ],
        ),
        LedgerCall::RegisterPlantOperator {
            operator,
            plant_id,
            name,
        } => encode_call(
            "registerPlantOperator(address,uint256,string)",
            &[
                Token::Address(*operator),
                Token::Uint(*plant_id),
                Token::String(name.clone()),
            ],
        ),
        LedgerCall::RegisterEquipment {
            name,
            description,
            plant_id,
        } => encode_call(
            "registerEquipment(string,string,uint256)",
            &[
                Token::String(name.clone()),
                Token::String(description.clone()),
                Token::Uint(*plant_id),
            ],
        ),
        LedgerCall::RegisterDocument {
            equipment_id,
            doc_type,
            name,
            description,
            content_id,
        } => encode_call(
            "registerDocument(uint256,uint8,string,string,string)",
            &[
                Token::Uint(*equipment_id),
                Token::Uint(U256::from(u8::from(*doc_type))),
                Token::String(name.clone()),
                Token::String(description.clone()),
                Token::String(content_id.clone()),
            ],
        ),
        LedgerCall::EquipmentReadyForReview { equipment_id } => encode_call(
            "equipmentIsReadyForReview(uint256)",
            &[Token::Uint(*equipment_id)],
        ),
        LedgerCall::ReviewEquipment { equipment_id } => {
            encode_call("reviewEquipment(uint256)", &[Token::Uint(*equipment_id)])
        }
        LedgerCall::FinalizeCertification {
            equipment_id,
            decision,
        } => {
            let (approve, hash, reason) = match decision {
                CertificationDecision::Approve { final_hash } => {
                    (true, final_hash.as_h256(), String::new())
                }
                CertificationDecision::Reject { reason } => (false, H256::zero(), reason.clone()),
            };
            encode_call(
                "finalizeCertification(uint256,bool,bytes32,string)",
                &[
                    Token::Uint(*equipment_id),
                    Token::Bool(approve),
                    Token::FixedBytes32(hash),
                    Token::String(reason),
                ],
            )
        }
        LedgerCall::CheckAndLogEquipmentIntegrity {
            equipment_id,
            calculated_hash,
        } => encode_call(
            "checkAndLogEquipmentIntegrity(uint256,bytes32)",
            &[
                Token::Uint(*equipment_id),
                Token::FixedBytes32(calculated_hash.as_h256()),
            ],
        ),
    }
}

/// Ledger client for the certification implementation contract and the access-control
/// (storage) contract that answers `hasRole`.
pub struct CertificationLedger {
    rpc: RpcClient,
    certification_contract: H160,
    roles_contract: H160,
}

impl CertificationLedger {
    pub fn new(rpc: RpcClient, certification_contract: H160, roles_contract: H160) -> Self {
        Self {
            rpc,
            certification_contract,
            roles_contract,
        }
    }

    pub fn from_config(config: &PortalConfig) -> anyhow::Result<Self> {
        let rpc = RpcClient::new(config.ledger_rpc_url.clone())?;
        Ok(Self::new(
            rpc,
            config.certification_contract,
            config.roles_contract,
        ))
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn read(&self, signature: &str, args: &[Token]) -> anyhow::Result<Vec<u8>> {
        self.rpc
            .call(self.certification_contract, &encode_call(signature, args))
            .await
    }
}

#[async_trait]
impl LedgerReader for CertificationLedger {
    async fn all_plants(&self) -> anyhow::Result<Vec<Plant>> {
        let data = self.read("getAllPlants()", &[]).await?;
        AbiReader::new(&data).tuple_array(0, decode_plant)
    }

    async fn equipment_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Equipment>> {
        let data = self
            .read("getEquipmentByPlant(uint256)", &[Token::Uint(plant_id)])
            .await?;
        AbiReader::new(&data).tuple_array(0, decode_equipment)
    }

    async fn equipment_document_ids(&self, equipment_id: U256) -> anyhow::Result<Vec<U256>> {
        let data = self
            .read("getEquipmentDocuments(uint256)", &[Token::Uint(equipment_id)])
            .await?;
        AbiReader::new(&data).uint_array(0)
    }

    async fn document(&self, document_id: U256) -> anyhow::Result<Document> {
        let data = self
            .read("getDocument(uint256)", &[Token::Uint(document_id)])
            .await?;
        decode_document(AbiReader::new(&data).tuple(0)?)
    }

    async fn document_content_id(&self, document_id: U256) -> anyhow::Result<String> {
        let data = self
            .read("getDocument(uint256)", &[Token::Uint(document_id)])
            .await?;
        decode_document_content_id(AbiReader::new(&data).tuple(0)?)
    }

    async fn documents_for_equipment(&self, equipment_id: U256) -> anyhow::Result<Vec<Document>> {
        let data = self
            .read("getAllDocumentsForEquipment(uint256)", &[Token::Uint(equipment_id)])
            .await?;
        AbiReader::new(&data).tuple_array(0, decode_document)
    }

    async fn documents_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Document>> {
        let data = self
            .read("getDocumentsByPlant(uint256)", &[Token::Uint(plant_id)])
            .await?;
        AbiReader::new(&data).tuple_array(0, decode_document)
    }

    async fn actors_by_plant(&self, plant_id: U256) -> anyhow::Result<Vec<Actor>> {
        let data = self
            .read("getAllActorsWithRolesByPlant(uint256)", &[Token::Uint(plant_id)])
            .await?;
        AbiReader::new(&data).tuple_array(0, decode_actor)
    }

    async fn has_role(&self, role: H256, account: Address) -> anyhow::Result<bool> {
        let data = encode_call(
            "hasRole(bytes32,address)",
            &[Token::FixedBytes32(role), Token::Address(account)],
        );
        let ret = self.rpc.call(self.roles_contract, &data).await?;
        AbiReader::new(&ret).bool(0)
    }

    async fn block_number(&self) -> anyhow::Result<u64> {
        self.rpc.block_number().await
    }
}

#[async_trait]
impl LedgerWriter for CertificationLedger {
    async fn submit(&self, from: Address, call: LedgerCall) -> anyhow::Result<H256> {
        let tx_hash = self
            .rpc
            .send_transaction(from, self.certification_contract, &call_data(&call))
            .await?;
        tracing::info!(
            function = call.function_name(),
            tx = %format!("{:?}", tx_hash),
            "transaction submitted"
        );
        Ok(tx_hash)
    }

    async fn transaction_outcome(&self, tx_hash: H256) -> anyhow::Result<TxOutcome> {
        let receipt = match self.rpc.transaction_receipt(tx_hash).await? {
            Some(r) => r,
            None => return Ok(TxOutcome::Pending),
        };
        if !receipt.succeeded() {
            return Ok(TxOutcome::Reverted);
        }

        let mut integrity_events = Vec::new();
        for log in &receipt.logs {
            match decode_integrity_log(self.certification_contract, tx_hash, log) {
                Ok(Some(event)) => integrity_events.push(event),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping undecodable IntegrityVerified log: {:#}", e),
            }
        }
        Ok(TxOutcome::Mined { integrity_events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{DocumentStatus, DocumentType, Fingerprint};
    use crate::infra::evm::abi::testing::{encode_return, string, uint, Value};

    fn document_tuple(id: u64, cid: &str) -> Value {
        Value::Tuple(vec![
            uint(id),
            string("Weld report"),
            string("Primary loop weld inspection"),
            uint(1),
            uint(0),
            Value::Token(Token::Address(H160::repeat_byte(0x42))),
            uint(1_700_000_000),
            uint(0),
            uint(0),
            uint(0),
            string(cid),
        ])
    }

    #[test]
    fn decodes_single_document_return() {
        let data = encode_return(vec![document_tuple(5, "bafyDoc")]);
        let doc = decode_document(AbiReader::new(&data).tuple(0).unwrap()).unwrap();
        assert_eq!(doc.id, U256::from(5));
        assert_eq!(doc.doc_type, DocumentType::LabReport);
        assert_eq!(doc.status, DocumentStatus::Submitted);
        assert_eq!(doc.submitter, H160::repeat_byte(0x42));
        assert_eq!(doc.content_id, "bafyDoc");
        assert!(doc.rejected_at.is_none());
        assert_eq!(doc.submitted_at.unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn decodes_document_arrays() {
        let data = encode_return(vec![Value::Array(vec![
            document_tuple(1, "cidA"),
            document_tuple(2, "cidB"),
        ])]);
        let docs = AbiReader::new(&data)
            .tuple_array(0, decode_document)
            .unwrap();
        let cids: Vec<_> = docs.iter().map(|d| d.content_id.as_str()).collect();
        assert_eq!(cids, vec!["cidA", "cidB"]);
    }

    #[test]
    fn unknown_enum_discriminant_fails_decoding() {
        let mut fields = vec![uint(1), string("n"), string("d"), uint(9)];
        fields.extend((0..6).map(|_| uint(0)));
        fields.push(string("cid"));
        let data = encode_return(vec![Value::Tuple(fields)]);
        assert!(decode_document(AbiReader::new(&data).tuple(0).unwrap()).is_err());
        assert_eq!(
            decode_document_content_id(AbiReader::new(&data).tuple(0).unwrap()).unwrap(),
            "cid"
        );
    }

    fn integrity_log(contract: H160, valid_word: u64) -> Log {
        let data = crate::infra::evm::abi::encode(&[
            Token::FixedBytes32(H256::repeat_byte(0xaa)),
            Token::Uint(U256::from(valid_word)),
            Token::Address(H160::repeat_byte(0x01)),
            Token::Uint(U256::from(1_700_000_123u64)),
        ]);
        let mut equipment_topic = [0u8; 32];
        U256::from(7).to_big_endian(&mut equipment_topic);
        Log {
            address: contract,
            topics: vec![
                event_topic(INTEGRITY_VERIFIED_EVENT),
                H256::from(equipment_topic),
            ],
            data: format!("0x{}", hex::encode(data)),
            transaction_hash: None,
        }
    }

    #[test]
    fn decodes_integrity_event() {
        let contract = H160::repeat_byte(0x99);
        let tx = H256::repeat_byte(0x33);
        let event = decode_integrity_log(contract, tx, &integrity_log(contract, 1))
            .unwrap()
            .unwrap();
        assert_eq!(event.equipment_id, U256::from(7));
        assert_eq!(event.calculated_hash, H256::repeat_byte(0xaa));
        assert_eq!(event.is_valid, Some(true));
        assert_eq!(event.checker, H160::repeat_byte(0x01));
        assert_eq!(event.transaction_hash, tx);
    }

    #[test]
    fn malformed_validity_flag_is_indeterminate() {
        let contract = H160::repeat_byte(0x99);
        let event = decode_integrity_log(contract, H256::zero(), &integrity_log(contract, 7))
            .unwrap()
            .unwrap();
        assert_eq!(event.is_valid, None);
    }

    #[test]
    fn ignores_logs_from_other_contracts() {
        let log = integrity_log(H160::repeat_byte(0x01), 1);
        assert!(decode_integrity_log(H160::repeat_byte(0x99), H256::zero(), &log)
            .unwrap()
            .is_none());
    }

    #[test]
    fn finalize_rejection_encodes_zero_hash_and_reason() {
        let data = call_data(&LedgerCall::FinalizeCertification {
            equipment_id: U256::from(3),
            decision: CertificationDecision::Reject {
                reason: "Missing lab report".into(),
            },
        });
        let args = AbiReader::new(&data[4..]);
        assert_eq!(args.uint(0).unwrap(), U256::from(3));
        assert!(!args.bool(1).unwrap());
        assert_eq!(args.bytes32(2).unwrap(), H256::zero());
        assert_eq!(args.string(3).unwrap(), "Missing lab report");
    }

    #[test]
    fn integrity_check_call_carries_fingerprint() {
        let fp = Fingerprint(H256::repeat_byte(0x5c));
        let data = call_data(&LedgerCall::CheckAndLogEquipmentIntegrity {
            equipment_id: U256::from(7),
            calculated_hash: fp,
        });
        assert_eq!(
            &data[..4],
            &crate::crypto::hashing::selector("checkAndLogEquipmentIntegrity(uint256,bytes32)")
        );
        let args = AbiReader::new(&data[4..]);
        assert_eq!(args.bytes32(1).unwrap(), fp.as_h256());
    }
}
