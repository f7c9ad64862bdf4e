//! In-memory blob storage for testing.

use super::{new_reference, validate_reference, BlobStore, BlobWriter};
use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use connect_types::{IdGenerator, UuidIdGenerator};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct Blobs {
    committed: HashMap<String, Vec<u8>>,
    /// References handed to writers that have not finished yet.
    pending: HashSet<String>,
}

/// Blob store backed by a `HashMap`. Contents are lost on drop.
#[derive(Clone)]
pub struct MemoryBlobStore {
    blobs: Arc<Mutex<Blobs>>,
    ids: Arc<dyn IdGenerator>,
    prefix_len: usize,
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdGenerator), 4)
    }
}

impl MemoryBlobStore {
    /// Create an empty store.
    pub fn new(ids: Arc<dyn IdGenerator>, prefix_len: usize) -> Self {
        Self {
            blobs: Arc::default(),
            ids,
            prefix_len,
        }
    }

    /// Number of committed blobs.
    pub fn len(&self) -> usize {
        self.blobs.lock().committed.len()
    }

    /// Whether no blob has been committed.
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().committed.is_empty()
    }

    /// Number of uploads started but neither committed nor discarded.
    pub fn pending(&self) -> usize {
        self.blobs.lock().pending.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn create(&self, suggested_name: &str) -> StorageResult<Box<dyn BlobWriter>> {
        let mut blobs = self.blobs.lock();
        let reference = loop {
            let candidate = new_reference(self.ids.as_ref(), self.prefix_len, suggested_name);
            if !blobs.committed.contains_key(&candidate) && !blobs.pending.contains(&candidate) {
                break candidate;
            }
        };
        blobs.pending.insert(reference.clone());

        Ok(Box::new(MemoryBlobWriter {
            blobs: self.blobs.clone(),
            reference,
            buf: Vec::new(),
            done: false,
        }))
    }

    async fn retrieve(&self, reference: &str) -> StorageResult<Vec<u8>> {
        validate_reference(reference)?;
        self.blobs
            .lock()
            .committed
            .get(reference)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                reference: reference.to_string(),
            })
    }
}

struct MemoryBlobWriter {
    blobs: Arc<Mutex<Blobs>>,
    reference: String,
    buf: Vec<u8>,
    done: bool,
}

impl MemoryBlobWriter {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.done {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                format!("upload {} already finished", self.reference),
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    async fn write_chunk(&mut self, chunk: &[u8]) -> StorageResult<()> {
        self.ensure_open()?;
        self.buf.extend_from_slice(chunk);
        Ok(())
    }

    fn written(&self) -> u64 {
        self.buf.len() as u64
    }

    async fn commit(&mut self) -> StorageResult<String> {
        self.ensure_open()?;
        self.done = true;
        let mut blobs = self.blobs.lock();
        blobs.pending.remove(&self.reference);
        blobs
            .committed
            .insert(self.reference.clone(), std::mem::take(&mut self.buf));
        Ok(self.reference.clone())
    }

    async fn discard(&mut self) {
        if !self.done {
            self.done = true;
            self.buf.clear();
            self.blobs.lock().pending.remove(&self.reference);
        }
    }
}
