// Command-line client for the portal's workflows: role lookup, integrity verification,
// registration and certification decisions.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use primitive_types::{H256, U256};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use nuclear_cert_portal::domain::aggregate::HashAggregator;
use nuclear_cert_portal::domain::ledger::{
    CertificationDecision, LedgerCall, LedgerWriter, TxOutcome,
};
use nuclear_cert_portal::domain::model::{
    parse_address, parse_ledger_id, Address, DocumentType, Fingerprint,
};
use nuclear_cert_portal::domain::roles::RoleResolver;
use nuclear_cert_portal::domain::verify::{
    FingerprintSource, HashServiceClient, IntegrityVerifier, VerificationState,
};
use nuclear_cert_portal::infra::evm::CertificationLedger;
use nuclear_cert_portal::infra::telemetry;
use nuclear_cert_portal::PortalConfig;

#[derive(Parser)]
#[command(name = "portalctl")]
#[command(about = "Nuclear equipment certification portal client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of a running portal API server
    #[arg(long, global = true, env = "PORTAL_URL", default_value = "http://127.0.0.1:3000")]
    portal_url: String,

    /// Account that sends transactions (must be unlocked on the node)
    #[arg(long, global = true, env = "PORTAL_ACCOUNT")]
    account: Option<String>,

    /// Seconds to wait for a transaction to be mined
    #[arg(long, global = true, default_value = "120")]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the portal role of an account
    Role {
        /// Account address (0x...)
        address: String,
    },

    /// Check an equipment's documents against its certified fingerprint
    Verify {
        /// Equipment id
        equipment_id: String,

        /// Compute the fingerprint in-process (needs FINAL_HASH_SALT) instead of asking the portal
        #[arg(long)]
        local: bool,
    },

    /// Register a plant
    RegisterPlant {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        location: String,
        /// Register the plant as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// Register a plant operator
    RegisterOperator {
        /// Operator account address
        operator: String,
        #[arg(long)]
        plant_id: String,
        #[arg(long)]
        name: String,
    },

    /// Register a piece of equipment at a plant
    RegisterEquipment {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        plant_id: String,
    },

    /// Upload a file through the portal and register it as an equipment document
    SubmitDocument {
        equipment_id: String,
        /// File to upload (at most 10 MiB)
        file: PathBuf,
        /// certification, lab-report, tech-file, compliance, regulatory-review
        #[arg(long = "type")]
        doc_type: DocumentType,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Mark an equipment as ready for review
    RequestReview { equipment_id: String },

    /// Start reviewing an equipment
    StartReview { equipment_id: String },

    /// Approve or reject an equipment's certification
    Finalize {
        equipment_id: String,
        /// Approve: the final hash is computed from the equipment's documents
        #[arg(long, conflicts_with = "reject", required_unless_present = "reject")]
        approve: bool,
        /// Reject with a reason
        #[arg(long, value_name = "REASON")]
        reject: Option<String>,
        /// Compute the final hash in-process (needs FINAL_HASH_SALT)
        #[arg(long)]
        local: bool,
    },
}

#[derive(Deserialize)]
struct UploadReply {
    cid: Option<String>,
    error: Option<String>,
}

fn id_arg(raw: &str) -> anyhow::Result<U256> {
    parse_ledger_id(raw).map_err(|e| anyhow!("invalid id '{}': {}", raw, e))
}

fn account_arg(cli: &Cli) -> anyhow::Result<Address> {
    let raw = cli
        .account
        .as_deref()
        .ok_or_else(|| anyhow!("--account (or PORTAL_ACCOUNT) is required for this command"))?;
    parse_address(raw).map_err(|e| anyhow!("invalid account '{}': {}", raw, e))
}

fn fingerprint_source(
    cli: &Cli,
    config: &PortalConfig,
    ledger: &Arc<CertificationLedger>,
    local: bool,
) -> Arc<dyn FingerprintSource> {
    if local {
        Arc::new(HashAggregator::new(
            ledger.clone(),
            config.final_hash_salt.clone(),
        ))
    } else {
        Arc::new(HashServiceClient::new(cli.portal_url.clone()))
    }
}

async fn wait_mined(
    ledger: &CertificationLedger,
    tx_hash: H256,
    timeout: Duration,
) -> anyhow::Result<()> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match ledger.transaction_outcome(tx_hash).await? {
            TxOutcome::Mined { .. } => return Ok(()),
            TxOutcome::Reverted => return Err(anyhow!("transaction {:?} reverted", tx_hash)),
            TxOutcome::Pending if tokio::time::Instant::now() >= deadline => {
                return Err(anyhow!("transaction {:?} not mined after {:?}", tx_hash, timeout))
            }
            TxOutcome::Pending => tokio::time::sleep(Duration::from_millis(500)).await,
        }
    }
}

async fn send(cli: &Cli, ledger: &CertificationLedger, call: LedgerCall) -> anyhow::Result<()> {
    let from = account_arg(cli)?;
    let function = call.function_name();
    let tx_hash = ledger.submit(from, call).await?;
    println!("> {} sent: {:?}", function, tx_hash);
    wait_mined(ledger, tx_hash, Duration::from_secs(cli.timeout_secs)).await?;
    println!("> {} mined.", function);
    Ok(())
}

async fn upload_file(portal_url: &str, path: &Path) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let form = reqwest::multipart::Form::new()
        .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name));

    let response = reqwest::Client::new()
        .post(format!("{}/upload", portal_url.trim_end_matches('/')))
        .multipart(form)
        .send()
        .await?;
    let status = response.status();
    let reply: UploadReply = response.json().await?;
    match (status.is_success(), reply.cid, reply.error) {
        (true, Some(cid), _) => Ok(cid),
        (_, _, Some(error)) => Err(anyhow!("upload failed ({}): {}", status, error)),
        _ => Err(anyhow!("upload failed ({})", status)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = PortalConfig::from_env()?;
    telemetry::init();
    let ledger = Arc::new(CertificationLedger::from_config(&config)?);

    match &cli.command {
        Commands::Role { address } => {
            let account =
                parse_address(address).map_err(|e| anyhow!("invalid address: {}", e))?;
            let role = RoleResolver::new(ledger.clone()).resolve(Some(account)).await?;
            println!("{:?}: {:?}", account, role);
            let sections: Vec<_> = role.sections().into_iter().map(|s| s.as_str()).collect();
            println!("sections: {}", sections.join(", "));
        }

        Commands::Verify { equipment_id, local } => {
            let account = match cli.account.as_deref() {
                Some(raw) => Some(
                    parse_address(raw).map_err(|e| anyhow!("invalid account '{}': {}", raw, e))?,
                ),
                None => None,
            };
            let verifier = IntegrityVerifier::new(
                fingerprint_source(&cli, &config, &ledger, *local),
                ledger.clone(),
            )
            .with_timeout(Duration::from_secs(cli.timeout_secs));

            let cancel = CancellationToken::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_ctrl_c.cancel();
                }
            });

            let outcome = verifier
                .verify(account, equipment_id, &cancel, |state| println!("> {}", state))
                .await;
            match outcome {
                VerificationState::Resolved { event: Some(e), .. } => {
                    println!("  checker={:?} calculated_hash={:?}", e.checker, e.calculated_hash)
                }
                VerificationState::Resolved { .. } => {}
                other => return Err(anyhow!("verification did not complete: {}", other)),
            }
        }

        Commands::RegisterPlant {
            name,
            description,
            location,
            inactive,
        } => {
            let call = LedgerCall::RegisterPlant {
                name: name.clone(),
                description: description.clone(),
                location: location.clone(),
                is_active: !inactive,
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::RegisterOperator {
            operator,
            plant_id,
            name,
        } => {
            let call = LedgerCall::RegisterPlantOperator {
                operator: parse_address(operator)
                    .map_err(|e| anyhow!("invalid operator address: {}", e))?,
                plant_id: id_arg(plant_id)?,
                name: name.clone(),
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::RegisterEquipment {
            name,
            description,
            plant_id,
        } => {
            let call = LedgerCall::RegisterEquipment {
                name: name.clone(),
                description: description.clone(),
                plant_id: id_arg(plant_id)?,
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::SubmitDocument {
            equipment_id,
            file,
            doc_type,
            name,
            description,
        } => {
            let equipment_id = id_arg(equipment_id)?;
            account_arg(&cli)?;
            let cid = upload_file(&cli.portal_url, file).await?;
            println!("> uploaded {} -> {}", file.display(), cid);
            let call = LedgerCall::RegisterDocument {
                equipment_id,
                doc_type: *doc_type,
                name: name.clone(),
                description: description.clone(),
                content_id: cid,
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::RequestReview { equipment_id } => {
            let call = LedgerCall::EquipmentReadyForReview {
                equipment_id: id_arg(equipment_id)?,
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::StartReview { equipment_id } => {
            let call = LedgerCall::ReviewEquipment {
                equipment_id: id_arg(equipment_id)?,
            };
            send(&cli, &ledger, call).await?;
        }

        Commands::Finalize {
            equipment_id,
            approve,
            reject,
            local,
        } => {
            let id = id_arg(equipment_id)?;
            let decision = match (approve, reject) {
                (true, _) => {
                    let hash = fingerprint_source(&cli, &config, &ledger, *local)
                        .fingerprint(id)
                        .await?;
                    let final_hash: Fingerprint = hash
                        .parse()
                        .map_err(|e| anyhow!("invalid final hash '{}': {}", hash, e))?;
                    println!("> final hash {}", final_hash);
                    CertificationDecision::Approve { final_hash }
                }
                (false, Some(reason)) => CertificationDecision::Reject {
                    reason: reason.clone(),
                },
                (false, None) => return Err(anyhow!("pass --approve or --reject <REASON>")),
            };
            send(
                &cli,
                &ledger,
                LedgerCall::FinalizeCertification {
                    equipment_id: id,
                    decision,
                },
            )
            .await?;
        }
    }

    Ok(())
}
