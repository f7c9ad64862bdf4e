//! On-disk blob storage.

use super::{new_reference, validate_reference, BlobStore, BlobWriter};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use connect_types::IdGenerator;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Attempts at finding an unused reference before giving up.
const MAX_STORE_ATTEMPTS: usize = 8;

/// Stores each upload as one file in a flat directory.
pub struct DiskBlobStore {
    root: PathBuf,
    ids: Arc<dyn IdGenerator>,
    prefix_len: usize,
}

impl std::fmt::Debug for DiskBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskBlobStore")
            .field("root", &self.root)
            .field("prefix_len", &self.prefix_len)
            .finish_non_exhaustive()
    }
}

impl DiskBlobStore {
    /// Open a store rooted at `root`, creating the directory if missing.
    pub async fn open(
        root: impl Into<PathBuf>,
        ids: Arc<dyn IdGenerator>,
        prefix_len: usize,
    ) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Blob store directory: {:?}", root);
        Ok(Self {
            root,
            ids,
            prefix_len,
        })
    }

    /// Directory files are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn create(&self, suggested_name: &str) -> StorageResult<Box<dyn BlobWriter>> {
        for _ in 0..MAX_STORE_ATTEMPTS {
            let reference = new_reference(self.ids.as_ref(), self.prefix_len, suggested_name);
            let path = self.root.join(&reference);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    return Ok(Box::new(DiskBlobWriter {
                        file: Some(file),
                        path,
                        reference,
                        written: 0,
                    }))
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!("Storage reference {} taken, retrying", reference);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free storage reference for {suggested_name:?}"),
        )))
    }

    async fn retrieve(&self, reference: &str) -> StorageResult<Vec<u8>> {
        validate_reference(reference)?;

        match tokio::fs::read(self.root.join(reference)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound {
                reference: reference.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Upload streaming straight into its final file.
///
/// The file is created up front with `create_new`, which reserves the
/// reference. Discarding removes it again.
struct DiskBlobWriter {
    file: Option<File>,
    path: PathBuf,
    reference: String,
    written: u64,
}

impl DiskBlobWriter {
    fn open_file(&mut self) -> StorageResult<&mut File> {
        self.file.as_mut().ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                format!("upload {} already finished", self.reference),
            ))
        })
    }
}

#[async_trait]
impl BlobWriter for DiskBlobWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<()> {
        self.open_file()?.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written
    }

    async fn commit(&mut self) -> StorageResult<String> {
        self.open_file()?.flush().await?;
        self.file = None;
        tracing::debug!("Stored {} bytes as {}", self.written, self.reference);
        Ok(self.reference.clone())
    }

    async fn discard(&mut self) {
        if self.file.take().is_none() {
            return;
        }
        if let Err(e) = tokio::fs::remove_file(&self.path).await {
            tracing::warn!("Failed to remove abandoned upload {:?}: {}", self.path, e);
        } else {
            tracing::debug!("Discarded upload {} after {} bytes", self.reference, self.written);
        }
    }
}
