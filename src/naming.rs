/// Unique blob key generation
///
/// Keys are `{uuid-v7}{extension}`. UUID v7 is time ordered with 74 random
/// bits, so collisions inside one namespace are not expected in practice.
use crate::{
    blob_store::{BlobStore, Namespace},
    error::ServiceResult,
};
use uuid::Uuid;

/// Extension appended to every rendered diff
pub const RESULT_EXTENSION: &str = ".png";

/// Generates collision-free keys within a namespace
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyGenerator;

impl KeyGenerator {
    pub fn new() -> Self {
        Self
    }

    /// A fresh identifier, not yet checked against any store
    pub fn next_id(&self) -> String {
        Uuid::now_v7().to_string()
    }

    /// Return an id such that no blob exists at `{id}{extension}` at the moment of the check
    ///
    /// This is check-then-act: a concurrent writer may still claim the key
    /// before the caller writes it. Prefer [`KeyGenerator::reserve`] when
    /// the bytes are already at hand.
    pub async fn generate(
        &self,
        store: &dyn BlobStore,
        namespace: Namespace,
        extension: &str,
    ) -> ServiceResult<String> {
        loop {
            let id = self.next_id();
            if !store.exists(namespace, &format!("{}{}", id, extension)).await? {
                return Ok(id);
            }
            tracing::debug!(namespace = %namespace, id = %id, "key_collision_retry");
        }
    }

    /// Generate an id and store `data` under `{id}{extension}` atomically
    ///
    /// Uses the store's create-if-absent write, retrying with a new id when
    /// the key is already taken. Returns the bare id.
    pub async fn reserve(
        &self,
        store: &dyn BlobStore,
        namespace: Namespace,
        extension: &str,
        data: &[u8],
    ) -> ServiceResult<String> {
        loop {
            let id = self.generate(store, namespace, extension).await?;
            if store
                .write_new(namespace, &format!("{}{}", id, extension), data)
                .await?
            {
                return Ok(id);
            }
            tracing::debug!(namespace = %namespace, id = %id, "key_claimed_concurrently");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob_store::MemoryBlobStore;
    use async_trait::async_trait;
    use std::collections::{BTreeSet, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_generated_keys_are_unique() {
        let store = MemoryBlobStore::new();
        let generator = KeyGenerator::new();

        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generator
                .generate(&store, Namespace::Uploads, ".png")
                .await
                .unwrap();
            assert!(seen.insert(id), "duplicate key generated");
        }
    }

    #[tokio::test]
    async fn test_reserve_writes_blob() {
        let store = MemoryBlobStore::new();
        let generator = KeyGenerator::new();

        let id = generator
            .reserve(&store, Namespace::Outputs, RESULT_EXTENSION, b"png bytes")
            .await
            .unwrap();

        let key = format!("{}{}", id, RESULT_EXTENSION);
        assert_eq!(store.read(Namespace::Outputs, &key).await.unwrap(), b"png bytes");
    }

    #[test]
    fn test_ids_are_uuids() {
        let id = KeyGenerator::new().next_id();
        let parsed = Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 7);
    }

    /// Store that reports the first N keys as taken
    struct CrowdedStore {
        inner: MemoryBlobStore,
        taken: AtomicUsize,
    }

    #[async_trait]
    impl BlobStore for CrowdedStore {
        async fn exists(&self, namespace: Namespace, key: &str) -> ServiceResult<bool> {
            if self.taken.load(Ordering::SeqCst) > 0 {
                self.taken.fetch_sub(1, Ordering::SeqCst);
                return Ok(true);
            }
            self.inner.exists(namespace, key).await
        }

        async fn write(&self, namespace: Namespace, key: &str, data: &[u8]) -> ServiceResult<()> {
            self.inner.write(namespace, key, data).await
        }

        async fn write_new(
            &self,
            namespace: Namespace,
            key: &str,
            data: &[u8],
        ) -> ServiceResult<bool> {
            self.inner.write_new(namespace, key, data).await
        }

        async fn read(&self, namespace: Namespace, key: &str) -> ServiceResult<Vec<u8>> {
            self.inner.read(namespace, key).await
        }

        async fn delete(&self, namespace: Namespace, key: &str) -> ServiceResult<()> {
            self.inner.delete(namespace, key).await
        }

        async fn list(&self, namespace: Namespace) -> ServiceResult<BTreeSet<String>> {
            self.inner.list(namespace).await
        }
    }

    #[tokio::test]
    async fn test_generate_retries_past_taken_keys() {
        let store = CrowdedStore {
            inner: MemoryBlobStore::new(),
            taken: AtomicUsize::new(3),
        };

        let id = KeyGenerator::new()
            .generate(&store, Namespace::Uploads, ".jpg")
            .await
            .unwrap();

        assert_eq!(store.taken.load(Ordering::SeqCst), 0);
        assert!(!store.inner.exists(Namespace::Uploads, &id).await.unwrap());
    }

    /// Store whose first `write_new` finds the key already claimed
    struct RacingStore {
        inner: MemoryBlobStore,
        lost_races: AtomicUsize,
        attempted: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BlobStore for RacingStore {
        async fn exists(&self, namespace: Namespace, key: &str) -> ServiceResult<bool> {
            self.inner.exists(namespace, key).await
        }

        async fn write(&self, namespace: Namespace, key: &str, data: &[u8]) -> ServiceResult<()> {
            self.inner.write(namespace, key, data).await
        }

        async fn write_new(
            &self,
            namespace: Namespace,
            key: &str,
            data: &[u8],
        ) -> ServiceResult<bool> {
            self.attempted.lock().unwrap().push(key.to_string());
            if self.lost_races.load(Ordering::SeqCst) > 0 {
                self.lost_races.fetch_sub(1, Ordering::SeqCst);
                return Ok(false);
            }
            self.inner.write_new(namespace, key, data).await
        }

        async fn read(&self, namespace: Namespace, key: &str) -> ServiceResult<Vec<u8>> {
            self.inner.read(namespace, key).await
        }

        async fn delete(&self, namespace: Namespace, key: &str) -> ServiceResult<()> {
            self.inner.delete(namespace, key).await
        }

        async fn list(&self, namespace: Namespace) -> ServiceResult<BTreeSet<String>> {
            self.inner.list(namespace).await
        }
    }

    #[tokio::test]
    async fn test_reserve_retries_after_lost_write() {
        let store = RacingStore {
            inner: MemoryBlobStore::new(),
            lost_races: AtomicUsize::new(1),
            attempted: std::sync::Mutex::new(Vec::new()),
        };

        let id = KeyGenerator::new()
            .reserve(&store, Namespace::Outputs, RESULT_EXTENSION, b"diff")
            .await
            .unwrap();

        let attempted = store.attempted.lock().unwrap().clone();
        let key = format!("{}{}", id, RESULT_EXTENSION);
        assert_eq!(attempted.len(), 2);
        assert_ne!(attempted[0], attempted[1]);
        assert_eq!(attempted[1], key);

        // Only the second id holds the data
        assert!(!store.inner.exists(Namespace::Outputs, &attempted[0]).await.unwrap());
        assert_eq!(store.inner.read(Namespace::Outputs, &key).await.unwrap(), b"diff");
    }
}
