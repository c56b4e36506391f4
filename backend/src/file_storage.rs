//! Gallery file operations on top of an [`ObjectStore`]

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    listing::{list_signed_objects, SignedObject},
    object_store::{ObjectStore, PresignedUrl, StoreResult},
    payload::DecodedPayload,
};

/// File storage service shared by every request handler
pub struct FileStorage {
    store: Arc<dyn ObjectStore>,
    presigned_url_expiry: Duration,
}

impl FileStorage {
    /// Creates a new file storage service
    ///
    /// # Arguments
    ///
    /// * `store` - Object store holding the files
    /// * `presigned_url_expiry` - Validity of every minted download URL
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, presigned_url_expiry: Duration) -> Self {
        Self {
            store,
            presigned_url_expiry,
        }
    }

    /// Validity of minted download URLs
    #[must_use]
    pub const fn presigned_url_expiry(&self) -> Duration {
        self.presigned_url_expiry
    }

    /// Lists every file with a fresh download URL
    ///
    /// # Errors
    ///
    /// Returns the first listing or presigning error; no partial listing is returned
    pub async fn list_files(&self) -> StoreResult<Vec<SignedObject>> {
        let files = list_signed_objects(self.store.as_ref(), self.presigned_url_expiry).await?;
        debug!(count = files.len(), "listed files");
        Ok(files)
    }

    /// Stores `payload` under `name`, replacing any existing file, and returns
    /// a download URL for it.
    ///
    /// # Errors
    ///
    /// Returns a store error if the write fails, in which case no URL is minted,
    /// or if presigning fails after a successful write.
    pub async fn upload_file(
        &self,
        name: &str,
        payload: DecodedPayload,
    ) -> StoreResult<PresignedUrl> {
        let size = payload.bytes.len();
        let content_type = payload.media_type.as_ref().map(ToString::to_string);

        self.store
            .put_object(name, payload.bytes, content_type.as_deref())
            .await?;
        info!(name, size, "stored file");

        self.store.presign_get(name, self.presigned_url_expiry).await
    }

    /// Removes the file stored under `name`; missing files are not an error
    ///
    /// # Errors
    ///
    /// Returns a store error if the delete fails
    pub async fn delete_file(&self, name: &str) -> StoreResult<()> {
        self.store.delete_object(name).await?;
        info!(name, "deleted file");
        Ok(())
    }
}
