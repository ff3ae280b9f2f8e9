/// Blob Storage System
///
/// Durable key -> bytes storage split into two independent namespaces,
/// `uploads` and `outputs`. Existence is determined purely by the presence
/// of the blob; there is no index or manifest.
///
/// No locking is done across calls: callers must not assume atomicity between
/// `exists` and `write`. `write_new` is the only atomic primitive.

pub mod disk;
pub mod memory;
pub mod models;

pub use disk::DiskBlobStore;
pub use memory::MemoryBlobStore;
pub use models::*;

use crate::error::ServiceResult;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Blob storage backend trait
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if a blob exists
    async fn exists(&self, namespace: Namespace, key: &str) -> ServiceResult<bool>;

    /// Store a blob, replacing any existing content (last writer wins)
    async fn write(&self, namespace: Namespace, key: &str, data: &[u8]) -> ServiceResult<()>;

    /// Store a blob only if the key is free
    ///
    /// Returns `false` without touching the existing blob when the key is taken.
    async fn write_new(&self, namespace: Namespace, key: &str, data: &[u8])
        -> ServiceResult<bool>;

    /// Retrieve a blob; `NotFound` if absent
    async fn read(&self, namespace: Namespace, key: &str) -> ServiceResult<Vec<u8>>;

    /// Delete a blob; `NotFound` if absent
    async fn delete(&self, namespace: Namespace, key: &str) -> ServiceResult<()>;

    /// List every key currently stored in a namespace
    async fn list(&self, namespace: Namespace) -> ServiceResult<BTreeSet<String>>;

    /// Verify the backend can serve requests
    async fn check_ready(&self) -> ServiceResult<()> {
        Ok(())
    }
}

pub(crate) fn not_found(namespace: Namespace, key: &str) -> crate::error::ServiceError {
    crate::error::ServiceError::NotFound(format!("Blob not found: {}/{}", namespace, key))
}
