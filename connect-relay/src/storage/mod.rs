//! Blob storage for uploaded files.
//!
//! The relay core never sees file bytes: the HTTP layer stores an upload
//! here and pushes only the returned storage reference and the original
//! filename.

mod disk;
mod memory;

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use connect_types::IdGenerator;

/// Trait for blob storage backends.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Start a new blob under a reference derived from `suggested_name`.
    ///
    /// Bytes are fed through the returned writer as they arrive, so an upload
    /// never has to sit in memory as a whole.
    async fn create(&self, suggested_name: &str) -> StorageResult<Box<dyn BlobWriter>>;

    /// Store raw bytes in one go.
    ///
    /// Returns the storage reference to hand out to devices.
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> StorageResult<String> {
        let mut writer = self.create(suggested_name).await?;
        if let Err(e) = writer.write_chunk(bytes).await {
            writer.discard().await;
            return Err(e);
        }
        writer.commit().await
    }

    /// Fetch the bytes stored under `reference`.
    ///
    /// Returns `NotFound` if nothing is stored there, `InvalidReference` if the
    /// reference is malformed.
    async fn retrieve(&self, reference: &str) -> StorageResult<Vec<u8>>;
}

/// An upload in progress.
///
/// Exactly one of [`commit`](BlobWriter::commit) or
/// [`discard`](BlobWriter::discard) ends the upload. A discarded blob is never
/// retrievable.
#[async_trait]
pub trait BlobWriter: Send {
    /// Append the next piece of the upload.
    async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<()>;

    /// Bytes written so far.
    fn written(&self) -> u64;

    /// Finish the upload and return its storage reference.
    async fn commit(&mut self) -> StorageResult<String>;

    /// Abandon the upload and release whatever it holds.
    async fn discard(&mut self);
}

/// Reduce an untrusted upload name to a single safe path component.
///
/// Directory parts are stripped; names that end up empty, `.` or `..` become
/// `file`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .replace('\0', "");

    match base.as_str() {
        "" | "." | ".." => "file".to_string(),
        _ => base,
    }
}

/// Build a fresh reference: random hex prefix, underscore, sanitized name.
pub fn new_reference(ids: &dyn IdGenerator, prefix_len: usize, name: &str) -> String {
    format!("{}_{}", ids.token(prefix_len), sanitize_filename(name))
}

/// Reject references that could address anything outside the storage root.
///
/// The accepted set mirrors what [`new_reference`] produces: any single path
/// component other than `.` and `..`. Dots inside a name are fine.
pub fn validate_reference(reference: &str) -> StorageResult<()> {
    let invalid = matches!(reference, "" | "." | "..")
        || reference.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StorageError::InvalidReference {
            reference: reference.to_string(),
        });
    }
    Ok(())
}
