/// Blob Store Manager
///
/// Coordinates identifier generation, name handling and the disk backend.
use crate::{
    blob_store::{
        disk::{CommitOutcome, DiskBlobBackend, TempUpload},
        id::{IdGenerator, NanoIdGenerator},
        naming, RetrievedBlob, StoredObject,
    },
    error::{RelayError, RelayResult},
    metrics,
};
use futures::Stream;
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;

/// Names tried per upload before giving up
pub const MAX_NAME_ATTEMPTS: usize = 5;

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// Directory holding stored objects; must already exist
    pub root: PathBuf,

    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

/// Main blob store manager
///
/// Cheap to clone and safe to share: every call works on its own paths and
/// the filesystem is the only shared state.
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStoreConfig,
    backend: DiskBlobBackend,
    ids: Arc<dyn IdGenerator>,
}

impl BlobStore {
    /// Create a blob store that names objects with random nanoid-style tokens
    pub fn new(config: BlobStoreConfig) -> Self {
        Self::with_generator(config, Arc::new(NanoIdGenerator::default()))
    }

    /// Create a blob store with a custom identifier source
    pub fn with_generator(config: BlobStoreConfig, ids: Arc<dyn IdGenerator>) -> Self {
        let backend = DiskBlobBackend::new(config.root.clone());
        Self { config, backend, ids }
    }

    pub fn backend(&self) -> &DiskBlobBackend {
        &self.backend
    }

    /// Store an upload and return the persisted object
    ///
    /// Either the whole body ends up retrievable under the returned name or
    /// nothing is left behind. Only the extension of `original_filename` is
    /// kept.
    pub async fn store<S, B, E>(&self, body: S, original_filename: Option<&str>) -> RelayResult<StoredObject>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let result = self.store_upload(body, original_filename).await;

        match &result {
            Ok(object) => {
                metrics::record_upload("success", object.size_bytes);
                tracing::info!(
                    stored_name = %object.stored_name,
                    size_bytes = object.size_bytes,
                    "Stored upload"
                );
            }
            Err(e) => {
                metrics::record_upload(outcome_label(e), 0);
                tracing::warn!(error = %e, "Upload failed");
            }
        }

        result
    }

    async fn store_upload<S, B, E>(&self, body: S, original_filename: Option<&str>) -> RelayResult<StoredObject>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let extension = naming::extension_of(original_filename);

        // Draw the first name before touching the body
        let mut attempt = 1;
        let mut id = self.ids.generate()?;
        let mut temp = loop {
            if let Some(temp) = self.backend.create_temp(&id).await? {
                break temp;
            }
            name_taken(&id, attempt)?;
            attempt += 1;
            id = self.ids.generate()?;
        };

        let result = self.write_and_commit(&mut temp, body, id, extension, attempt).await;
        temp.discard().await;
        result
    }

    /// Write the body once, then link it under the first free name
    ///
    /// `attempt` continues the count from temp file creation, so the whole
    /// upload draws at most `MAX_NAME_ATTEMPTS` identifiers.
    async fn write_and_commit<S, B, E>(
        &self,
        temp: &mut TempUpload,
        body: S,
        mut id: String,
        extension: String,
        mut attempt: usize,
    ) -> RelayResult<StoredObject>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let size = temp.write_stream(body, self.config.max_upload_size).await?;

        loop {
            let object = StoredObject::new(id, extension.clone(), size);
            match self.backend.commit(temp, &object.stored_name).await? {
                CommitOutcome::Committed => return Ok(object),
                CommitOutcome::NameTaken => {
                    name_taken(&object.stored_name, attempt)?;
                    attempt += 1;
                    id = self.ids.generate()?;
                }
            }
        }
    }

    /// Open a stored object by name
    ///
    /// The name is validated before any path is built; a rejected name is
    /// `InvalidIdentifier` and never reaches the filesystem.
    pub async fn retrieve(&self, stored_name: &str) -> RelayResult<RetrievedBlob> {
        let name = validated(stored_name)?;

        let Some((file, size_bytes)) = self.backend.open(name).await? else {
            tracing::debug!(stored_name = %name, "Stored object not found");
            return Err(RelayError::NotFound(name.to_string()));
        };

        Ok(RetrievedBlob {
            stored_name: name.to_string(),
            extension: naming::extension_of_stored(name).to_string(),
            size_bytes,
            file,
        })
    }

    /// Check whether an object is currently stored under `stored_name`
    pub async fn exists(&self, stored_name: &str) -> RelayResult<bool> {
        let name = validated(stored_name)?;
        self.backend.exists(name).await
    }

    /// Check that the root directory is a writable directory
    pub async fn check_root(&self) -> RelayResult<()> {
        let metadata = tokio::fs::metadata(&self.config.root)
            .await
            .map_err(RelayError::ReadFailed)?;

        if !metadata.is_dir() {
            return Err(RelayError::Config("upload root is not a directory".to_string()));
        }
        if metadata.permissions().readonly() {
            return Err(RelayError::Config("upload root is read-only".to_string()));
        }

        Ok(())
    }
}

fn validated(stored_name: &str) -> RelayResult<&str> {
    naming::validate_stored_name(stored_name).map_err(|reason| {
        tracing::debug!(%reason, "Rejected stored name");
        RelayError::InvalidIdentifier(reason.to_string())
    })
}

/// Record a clash on a generated name; fails once the attempts are used up
fn name_taken(name: &str, attempt: usize) -> RelayResult<()> {
    metrics::record_id_collision();

    if attempt >= MAX_NAME_ATTEMPTS {
        tracing::warn!(candidate = %name, attempts = MAX_NAME_ATTEMPTS, "Could not find a free name for upload");
        return Err(RelayError::StorageExhausted {
            attempts: MAX_NAME_ATTEMPTS,
        });
    }

    tracing::warn!(candidate = %name, attempt, "Generated name already exists, retrying");
    Ok(())
}

fn outcome_label(error: &RelayError) -> &'static str {
    match error {
        RelayError::InvalidInput(_) => "invalid_input",
        RelayError::TooLarge { .. } => "too_large",
        RelayError::StorageExhausted { .. } => "storage_exhausted",
        RelayError::RandomnessUnavailable(_) => "randomness_unavailable",
        _ => "write_failed",
    }
}
