use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::space::SpaceBootstrap;
use crate::error::{PortalError, PortalResult};
use crate::infra::storage::StorageNetwork;

/// Largest accepted upload, inclusive (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

pub const MSG_EMAIL_MISSING: &str = "Storage login email missing.";
pub const MSG_NO_FILE: &str = "No file uploaded.";
pub const MSG_TOO_LARGE: &str = "File size exceeds the 10MB limit.";
pub const MSG_BAD_CONTENT_TYPE: &str = "Invalid Content-Type. Expected multipart/form-data.";
pub const MSG_PROCESSING: &str = "Error processing file upload.";
pub const MSG_CLIENT_INIT: &str = "Storage network client initialization failed.";
pub const MSG_UPLOAD_FAILED: &str = "Failed to upload file to the storage network.";

const VERIFICATION_MARKERS: [&str; 3] = ["Verification email", "expired", "Account not verified"];

/// Whether a storage error means the login identity has not been verified yet.
pub fn is_verification_error(message: &str) -> bool {
    VERIFICATION_MARKERS.iter().any(|m| message.contains(m))
}

fn space_setup_error(email: &str, cause: &anyhow::Error) -> PortalError {
    let chain = format!("{:#}", cause);
    let message = if is_verification_error(&chain) {
        format!(
            "Storage network initialization failed. Check the inbox of {} for a verification \
             link from the storage network (or contact the administrator).",
            email
        )
    } else {
        MSG_CLIENT_INIT.to_string()
    };
    PortalError::SpaceSetup {
        message,
        details: Some(chain),
    }
}

/// An upload being received into a temporary file.
///
/// The file is removed when the value is dropped, whatever the outcome of the upload.
pub struct StagedUpload {
    temp: NamedTempFile,
    writer: tokio::fs::File,
    size: u64,
}

impl StagedUpload {
    fn create_in(dir: &Path) -> std::io::Result<Self> {
        let temp = NamedTempFile::new_in(dir)?;
        let writer = tokio::fs::File::from_std(temp.reopen()?);
        Ok(Self {
            temp,
            writer,
            size: 0,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Appends a chunk, rejecting the upload once it grows past [`MAX_UPLOAD_BYTES`].
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> PortalResult<()> {
        self.size += chunk.len() as u64;
        if self.size > MAX_UPLOAD_BYTES {
            return Err(PortalError::PayloadTooLarge(MSG_TOO_LARGE.to_string()));
        }
        self.writer
            .write_all(chunk)
            .await
            .map_err(|e| PortalError::upstream(MSG_PROCESSING, &anyhow::Error::from(e)))
    }

    async fn finish(&mut self) -> PortalResult<Vec<u8>> {
        self.writer
            .flush()
            .await
            .map_err(|e| PortalError::upstream(MSG_PROCESSING, &anyhow::Error::from(e)))?;
        tokio::fs::read(self.temp.path())
            .await
            .map_err(|e| PortalError::upstream(MSG_PROCESSING, &anyhow::Error::from(e)))
    }

    fn discard(self) {
        let path = self.temp.path().to_path_buf();
        drop(self.writer);
        if let Err(e) = self.temp.close() {
            tracing::warn!(path = %path.display(), "temporary upload file not deleted: {}", e);
        }
    }
}

pub struct UploadGateway {
    storage: Arc<dyn StorageNetwork>,
    bootstrap: SpaceBootstrap,
    login_email: Option<String>,
    tmp_dir: PathBuf,
}

impl UploadGateway {
    pub fn new(
        storage: Arc<dyn StorageNetwork>,
        login_email: Option<String>,
        tmp_dir: PathBuf,
    ) -> Self {
        Self {
            storage,
            bootstrap: SpaceBootstrap::new(),
            login_email,
            tmp_dir,
        }
    }

    pub fn bootstrap(&self) -> &SpaceBootstrap {
        &self.bootstrap
    }

    fn login_email(&self) -> PortalResult<&str> {
        self.login_email
            .as_deref()
            .ok_or_else(|| PortalError::Configuration(MSG_EMAIL_MISSING.to_string()))
    }

    /// Fails with a configuration error when no storage login identity is set.
    pub fn check_configured(&self) -> PortalResult<()> {
        self.login_email().map(|_| ())
    }

    /// Checks configuration and opens a temporary file for the incoming upload.
    pub fn stage(&self) -> PortalResult<StagedUpload> {
        self.login_email()?;
        StagedUpload::create_in(&self.tmp_dir)
            .map_err(|e| PortalError::upstream(MSG_PROCESSING, &anyhow::Error::from(e)))
    }

    /// Relays a fully received upload to the storage network and returns its content id.
    pub async fn store(&self, mut staged: StagedUpload) -> PortalResult<String> {
        let result = self.relay(&mut staged).await;
        staged.discard();
        result
    }

    async fn relay(&self, staged: &mut StagedUpload) -> PortalResult<String> {
        let email = self.login_email()?;
        let bytes = staged.finish().await?;

        self.bootstrap
            .ensure_space(self.storage.as_ref(), email)
            .await
            .map_err(|e| space_setup_error(email, &e))?;

        let cid = self
            .storage
            .upload_file(bytes)
            .await
            .map_err(|e| PortalError::upstream(MSG_UPLOAD_FAILED, &e))?;
        tracing::info!(cid = %cid, size = staged.size(), "file uploaded");
        Ok(cid)
    }

    /// Convenience for callers holding the whole file in memory.
    pub async fn upload_bytes(&self, bytes: &[u8]) -> PortalResult<String> {
        let mut staged = self.stage()?;
        staged.write_chunk(bytes).await?;
        self.store(staged).await
    }
}
