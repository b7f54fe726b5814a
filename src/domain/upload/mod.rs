//! Single-file upload to the storage network.

pub mod gateway;
pub mod space;

pub use gateway::{StagedUpload, UploadGateway, MAX_UPLOAD_BYTES};
pub use space::SpaceBootstrap;
