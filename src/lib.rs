pub mod app;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod infra;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::portal_service::PortalService;
pub use crypto::hashing::{fingerprint, keccak256};
pub use domain::model::Fingerprint;
pub use error::{PortalError, PortalResult};
pub use infra::config::PortalConfig;
