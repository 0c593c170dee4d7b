/// Disk-based blob storage backend
use crate::error::{RelayError, RelayResult};
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Temp uploads live next to the objects so the final link stays on one filesystem
pub const TEMP_PREFIX: &str = ".upload-";
pub const TEMP_SUFFIX: &str = ".part";

/// Disk storage backend
///
/// Stores objects as a flat directory of `<id><extension>` files. Uploads are
/// written to a hidden temp file first and linked into place only once
/// complete, so a reader can never observe a partial object.
#[derive(Debug, Clone)]
pub struct DiskBlobBackend {
    base_path: PathBuf,
}

/// Outcome of linking a finished temp file under its final name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NameTaken,
}

impl DiskBlobBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Path of a stored object. `stored_name` must already be validated.
    fn blob_path(&self, stored_name: &str) -> PathBuf {
        self.base_path.join(stored_name)
    }

    fn temp_path(&self, tag: &str) -> PathBuf {
        self.base_path
            .join(format!("{}{}{}", TEMP_PREFIX, tag, TEMP_SUFFIX))
    }

    /// Create an empty temp file for a new upload
    ///
    /// Returns `None` when a temp file for `tag` already exists; another
    /// upload's temp file is never opened or replaced.
    pub async fn create_temp(&self, tag: &str) -> RelayResult<Option<TempUpload>> {
        let path = self.temp_path(tag);
        let file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(None),
            Err(e) => return Err(RelayError::WriteFailed(e)),
        };

        Ok(Some(TempUpload {
            path,
            file: Some(file),
            armed: true,
        }))
    }

    /// Link a finished temp file under `stored_name` without replacing anything
    ///
    /// A hard link fails with `AlreadyExists` instead of clobbering, which a
    /// plain rename would not do.
    pub async fn commit(&self, temp: &TempUpload, stored_name: &str) -> RelayResult<CommitOutcome> {
        let target = self.blob_path(stored_name);

        match fs::hard_link(&temp.path, &target).await {
            Ok(()) => Ok(CommitOutcome::Committed),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(CommitOutcome::NameTaken),
            Err(e) => Err(RelayError::WriteFailed(e)),
        }
    }

    /// Open a stored object for reading
    ///
    /// Returns `None` when nothing (or something other than a regular file)
    /// lives under the name.
    pub async fn open(&self, stored_name: &str) -> RelayResult<Option<(File, u64)>> {
        let path = self.blob_path(stored_name);

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RelayError::ReadFailed(e)),
        };

        let metadata = file.metadata().await.map_err(RelayError::ReadFailed)?;
        if !metadata.is_file() {
            return Ok(None);
        }

        Ok(Some((file, metadata.len())))
    }

    /// Check whether a stored object exists
    pub async fn exists(&self, stored_name: &str) -> RelayResult<bool> {
        match fs::metadata(self.blob_path(stored_name)).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RelayError::ReadFailed(e)),
        }
    }

    /// Remove temp files orphaned by a crash
    ///
    /// Only safe before the store starts accepting uploads: it cannot tell an
    /// orphan from an upload in progress.
    pub async fn sweep_temp_files(&self) -> RelayResult<usize> {
        let mut entries = fs::read_dir(&self.base_path)
            .await
            .map_err(RelayError::ReadFailed)?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await.map_err(RelayError::ReadFailed)? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if !(name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)) {
                continue;
            }

            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "Failed to remove orphaned temp upload");
                }
            }
        }

        Ok(removed)
    }
}

/// An upload being written to a hidden temp file
///
/// The temp file is removed when this value is dropped, including when the
/// owning future is cancelled mid-write.
#[derive(Debug)]
pub struct TempUpload {
    path: PathBuf,
    file: Option<File>,
    armed: bool,
}

impl TempUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain `stream` into the temp file and flush it to disk
    ///
    /// Fails with `InvalidInput` if the stream errors and `TooLarge` once more
    /// than `max_size` bytes arrive. Returns the number of bytes written.
    pub async fn write_stream<S, B, E>(&mut self, stream: S, max_size: u64) -> RelayResult<u64>
    where
        S: Stream<Item = Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RelayError::Internal("temp upload already closed".to_string()))?;

        futures::pin_mut!(stream);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| RelayError::InvalidInput(format!("Failed to read upload: {}", e)))?;
            let chunk = chunk.as_ref();

            written += chunk.len() as u64;
            if written > max_size {
                return Err(RelayError::TooLarge { limit: max_size });
            }

            file.write_all(chunk).await.map_err(RelayError::WriteFailed)?;
        }

        file.flush().await.map_err(RelayError::WriteFailed)?;
        file.sync_all().await.map_err(RelayError::WriteFailed)?;
        self.file = None;

        Ok(written)
    }

    /// Remove the temp file
    pub async fn discard(mut self) {
        self.file = None;
        if let Err(e) = fs::remove_file(&self.path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temp upload");
            }
        }
        self.armed = false;
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        // Synchronous unlink: a cancelled upload's temp file is gone by the
        // time its task is reported finished, with or without a runtime.
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::tempdir;

    fn ok_chunks(chunks: &[&'static [u8]]) -> impl Stream<Item = Result<&'static [u8], std::io::Error>> {
        stream::iter(
            chunks
                .iter()
                .copied()
                .map(Ok::<_, std::io::Error>)
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_write_commit_and_open() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let mut temp = backend.create_temp("abc").await.unwrap().unwrap();
        let written = temp
            .write_stream(ok_chunks(&[b"hello ", b"world"]), 1024)
            .await
            .unwrap();
        assert_eq!(written, 11);

        assert_eq!(backend.commit(&temp, "abc.txt").await.unwrap(), CommitOutcome::Committed);
        let temp_path = temp.path().to_path_buf();
        temp.discard().await;
        assert!(!temp_path.exists());

        let (_, size) = backend.open("abc.txt").await.unwrap().unwrap();
        assert_eq!(size, 11);
        assert_eq!(std::fs::read(dir.path().join("abc.txt")).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_commit_never_overwrites() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());
        std::fs::write(dir.path().join("taken.txt"), b"original").unwrap();

        let mut temp = backend.create_temp("t1").await.unwrap().unwrap();
        temp.write_stream(ok_chunks(&[b"intruder"]), 1024).await.unwrap();

        assert_eq!(backend.commit(&temp, "taken.txt").await.unwrap(), CommitOutcome::NameTaken);
        assert_eq!(std::fs::read(dir.path().join("taken.txt")).unwrap(), b"original");
    }

    #[tokio::test]
    async fn test_drop_removes_temp_file() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let mut temp = backend.create_temp("dropme").await.unwrap().unwrap();
        temp.write_stream(ok_chunks(&[b"partial"]), 1024).await.unwrap();
        let path = temp.path().to_path_buf();
        assert!(path.exists());

        drop(temp);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_stream_error_is_invalid_input() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let body = stream::iter(vec![
            Ok(&b"first"[..]),
            Err(std::io::Error::new(ErrorKind::UnexpectedEof, "connection reset")),
        ]);

        let mut temp = backend.create_temp("broken").await.unwrap().unwrap();
        let result = temp.write_stream(body, 1024).await;
        assert!(matches!(result, Err(RelayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let mut temp = backend.create_temp("big").await.unwrap().unwrap();
        let result = temp.write_stream(ok_chunks(&[b"12345", b"6789"]), 8).await;
        assert!(matches!(result, Err(RelayError::TooLarge { limit: 8 })));
    }

    #[tokio::test]
    async fn test_temp_tag_clash_leaves_other_upload_alone() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        let mut first = backend.create_temp("same").await.unwrap().unwrap();
        first.write_stream(ok_chunks(&[b"in flight"]), 1024).await.unwrap();

        assert!(backend.create_temp("same").await.unwrap().is_none());
        assert_eq!(std::fs::read(first.path()).unwrap(), b"in flight");
    }

    #[tokio::test]
    async fn test_open_missing_and_directory() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());
        std::fs::create_dir(dir.path().join("subdir")).unwrap();

        assert!(backend.open("nothing.bin").await.unwrap().is_none());
        assert!(backend.open("subdir").await.unwrap().is_none());
        assert!(!backend.exists("subdir").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweep_temp_files() {
        let dir = tempdir().unwrap();
        let backend = DiskBlobBackend::new(dir.path().to_path_buf());

        std::fs::write(dir.path().join(".upload-orphan1.part"), b"x").unwrap();
        std::fs::write(dir.path().join(".upload-orphan2.part"), b"y").unwrap();
        std::fs::write(dir.path().join("keep.txt"), b"z").unwrap();

        assert_eq!(backend.sweep_temp_files().await.unwrap(), 2);
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join(".upload-orphan1.part").exists());
    }
}
