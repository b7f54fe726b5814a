use clap::Parser;

use nuclear_cert_portal::infra::config::{PortalConfig, StorageBackend};
use nuclear_cert_portal::infra::evm::RpcClient;

/// Checks configuration and ledger connectivity before starting the portal.
#[derive(Parser, Debug)]
#[command(name = "preflight")]
struct Args {
    /// Do not fail when FINAL_HASH_SALT or STORAGE_LOGIN_EMAIL is missing.
    #[arg(long)]
    allow_missing_secrets: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = PortalConfig::from_env()?;

    println!("> Preflight:");
    println!("  LEDGER_CHAIN={:?}", config.ledger_chain);
    println!("  RPC URL={}", config.ledger_rpc_url);
    println!("  CERTIFICATION_CONTRACT_ADDRESS={:?}", config.certification_contract);
    println!("  ROLES_CONTRACT_ADDRESS={:?}", config.roles_contract);
    match &config.storage_backend {
        StorageBackend::Memory => println!("  STORAGE_BACKEND=memory"),
        StorageBackend::Http { api_url } => println!("  STORAGE_BACKEND=http ({})", api_url),
    }
    println!("  UPLOAD_TMP_DIR={}", config.upload_tmp_dir.display());

    let mut missing = Vec::new();
    if config.final_hash_salt.is_none() {
        missing.push("FINAL_HASH_SALT");
    }
    if config.storage_login_email.is_none() {
        missing.push("STORAGE_LOGIN_EMAIL");
    }
    if missing.is_empty() {
        println!("  Salt and storage identity are set.");
    } else if args.allow_missing_secrets {
        eprintln!("  Warning: not set: {}", missing.join(", "));
    } else {
        return Err(anyhow::anyhow!("required settings missing: {}", missing.join(", ")));
    }

    // Basic RPC connectivity
    let client = RpcClient::new(config.ledger_rpc_url.clone())?;
    let chain_id = client.chain_id().await?;
    let expected = config.ledger_chain.expected_chain_id();
    println!("  Chain id: {}", chain_id);
    if chain_id != expected {
        return Err(anyhow::anyhow!(
            "connected to chain {} but LEDGER_CHAIN={:?} expects {}",
            chain_id,
            config.ledger_chain,
            expected
        ));
    }
    let height = client.block_number().await?;
    println!("  Latest block: {}", height);

    // Contract code existence
    for (name, address) in [
        ("certification", config.certification_contract),
        ("roles", config.roles_contract),
    ] {
        let code = client.code_at(address).await?;
        if code.is_empty() {
            return Err(anyhow::anyhow!(
                "no contract code at {:?} ({} contract)",
                address,
                name
            ));
        }
        println!("  {} contract deployed ({} bytes of code).", name, code.len());
    }

    println!("> Preflight OK.");
    Ok(())
}
