pub mod aggregate;
pub mod ledger;
pub mod model;
pub mod roles;
pub mod upload;
pub mod verify;
