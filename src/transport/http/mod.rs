pub mod router;
pub mod types;
pub mod handlers {
    pub mod hash;
    pub mod health;
    pub mod ledger;
    pub mod roles;
    pub mod upload;
}

pub use router::{create_router, ApiDoc};
pub use types::AppState;
