// src/bin/api_server.rs

use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use nuclear_cert_portal::infra::telemetry;
use nuclear_cert_portal::transport;
use nuclear_cert_portal::{PortalConfig, PortalService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = PortalConfig::from_env()?;
    telemetry::init();

    // --- Service Initialization ---
    tracing::info!(
        chain = ?config.ledger_chain,
        rpc = %config.ledger_rpc_url,
        certification = ?config.certification_contract,
        roles = ?config.roles_contract,
        storage = ?config.storage_backend,
        "initializing PortalService"
    );
    if config.final_hash_salt.is_none() {
        tracing::warn!("FINAL_HASH_SALT is not set; /hash-generation will answer 500");
    }
    if config.storage_login_email.is_none() {
        tracing::warn!("STORAGE_LOGIN_EMAIL is not set; /upload will answer 500");
    }
    let portal = PortalService::from_config(&config)?;
    match portal.ledger_height().await {
        Ok(height) => tracing::info!(block = height, "ledger reachable"),
        Err(e) => tracing::warn!("ledger not reachable at startup (continuing): {:#}", e),
    }

    let app_state = transport::http::AppState {
        portal: Arc::new(portal),
    };

    // --- API Server Initialization ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("API server listening on http://{}", config.bind_addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received (Ctrl+C)");
            }
        })
        .await?;

    tracing::info!("graceful shutdown complete");
    Ok(())
}
