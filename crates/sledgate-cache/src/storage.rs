//! The storage capability consumed by the index, and its in-memory
//! implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::CacheError;

/// Object storage as the index sees it: put whole blobs, read leading
/// ranges, delete, and an advisory object count.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Store `data` under `obj_id`, overwriting any previous blob.
    async fn put(&self, obj_id: &str, data: &[u8]) -> Result<(), CacheError>;

    /// Read bytes `0..max_bytes` of the blob (less if the blob is shorter).
    async fn get_range(&self, obj_id: &str, max_bytes: usize) -> Result<Vec<u8>, CacheError>;

    /// Remove the blob. Removing an absent blob succeeds.
    async fn delete(&self, obj_id: &str) -> Result<(), CacheError>;

    /// Advisory object count; backends that cannot count return 0.
    fn size(&self) -> usize;
}

/// Process-local storage for tests and single-process runs.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn put(&self, obj_id: &str, data: &[u8]) -> Result<(), CacheError> {
        self.objects
            .write()
            .expect("storage lock")
            .insert(obj_id.to_owned(), data.to_vec());
        Ok(())
    }

    async fn get_range(&self, obj_id: &str, max_bytes: usize) -> Result<Vec<u8>, CacheError> {
        let objects = self.objects.read().expect("storage lock");
        let data = objects.get(obj_id).ok_or_else(|| CacheError::NotFound {
            obj_id: obj_id.to_owned(),
        })?;
        Ok(data[..max_bytes.min(data.len())].to_vec())
    }

    async fn delete(&self, obj_id: &str) -> Result<(), CacheError> {
        self.objects.write().expect("storage lock").remove(obj_id);
        Ok(())
    }

    fn size(&self) -> usize {
        self.objects.read().expect("storage lock").len()
    }
}
