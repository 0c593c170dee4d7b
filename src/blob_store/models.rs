/// Blob storage data models
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::fs::File;

/// One persisted upload
///
/// Identity is `stored_name`. Nothing else about the upload (the original
/// filename in particular) is retained on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    pub id: String,
    pub extension: String,
    pub stored_name: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

impl StoredObject {
    pub fn new(id: String, extension: String, size_bytes: u64) -> Self {
        let stored_name = format!("{}{}", id, extension);
        Self {
            id,
            extension,
            stored_name,
            size_bytes,
            created_at: Utc::now(),
        }
    }
}

/// An open stored object, ready to stream
#[derive(Debug)]
pub struct RetrievedBlob {
    pub stored_name: String,
    pub extension: String,
    pub size_bytes: u64,
    pub file: File,
}

/// Upload response for API clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub stored_name: String,
    pub size: u64,
    pub download_url: String,
    pub view_url: String,
}
