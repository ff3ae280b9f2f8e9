/// In-memory blob storage backend
use crate::{
    blob_store::{is_valid_key, not_found, BlobStore, Namespace},
    error::{ServiceError, ServiceResult},
};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

/// Memory storage backend for tests and embedding
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<(Namespace, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs held in a namespace
    pub async fn len(&self, namespace: Namespace) -> usize {
        self.blobs
            .read()
            .await
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .count()
    }
}

fn check_key(key: &str) -> ServiceResult<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(ServiceError::BlobStorage(format!("Invalid blob key: {:?}", key)))
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, namespace: Namespace, key: &str) -> ServiceResult<bool> {
        Ok(self
            .blobs
            .read()
            .await
            .contains_key(&(namespace, key.to_string())))
    }

    async fn write(&self, namespace: Namespace, key: &str, data: &[u8]) -> ServiceResult<()> {
        check_key(key)?;
        self.blobs
            .write()
            .await
            .insert((namespace, key.to_string()), data.to_vec());
        Ok(())
    }

    async fn write_new(
        &self,
        namespace: Namespace,
        key: &str,
        data: &[u8],
    ) -> ServiceResult<bool> {
        check_key(key)?;
        let mut blobs = self.blobs.write().await;
        let slot = (namespace, key.to_string());
        if blobs.contains_key(&slot) {
            return Ok(false);
        }
        blobs.insert(slot, data.to_vec());
        Ok(true)
    }

    async fn read(&self, namespace: Namespace, key: &str) -> ServiceResult<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(&(namespace, key.to_string()))
            .cloned()
            .ok_or_else(|| not_found(namespace, key))
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> ServiceResult<()> {
        self.blobs
            .write()
            .await
            .remove(&(namespace, key.to_string()))
            .map(|_| ())
            .ok_or_else(|| not_found(namespace, key))
    }

    async fn list(&self, namespace: Namespace) -> ServiceResult<BTreeSet<String>> {
        Ok(self
            .blobs
            .read()
            .await
            .keys()
            .filter(|(ns, _)| *ns == namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip_and_delete() {
        let store = MemoryBlobStore::new();

        store.write(Namespace::Uploads, "a.png", b"abc").await.unwrap();
        assert_eq!(store.read(Namespace::Uploads, "a.png").await.unwrap(), b"abc");
        assert_eq!(store.len(Namespace::Uploads).await, 1);
        assert_eq!(store.len(Namespace::Outputs).await, 0);

        store.delete(Namespace::Uploads, "a.png").await.unwrap();
        assert!(matches!(
            store.delete(Namespace::Uploads, "a.png").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_write_new() {
        let store = MemoryBlobStore::new();

        assert!(store.write_new(Namespace::Outputs, "x.png", b"1").await.unwrap());
        assert!(!store.write_new(Namespace::Outputs, "x.png", b"2").await.unwrap());
        assert_eq!(store.read(Namespace::Outputs, "x.png").await.unwrap(), b"1");
        assert_eq!(
            store.list(Namespace::Outputs).await.unwrap().into_iter().collect::<Vec<_>>(),
            vec!["x.png".to_string()]
        );
    }
}
