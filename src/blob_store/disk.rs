/// Disk-based blob storage backend
use crate::{
    blob_store::{is_valid_key, not_found, BlobStore, Namespace},
    error::{ServiceError, ServiceResult},
};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::{fs, io::AsyncWriteExt};

/// Disk storage backend
///
/// Each namespace is a flat directory; a blob is the file `{dir}/{key}`.
#[derive(Clone, Debug)]
pub struct DiskBlobStore {
    uploads_dir: PathBuf,
    outputs_dir: PathBuf,
}

impl DiskBlobStore {
    /// Create a new disk storage backend
    pub fn new(uploads_dir: PathBuf, outputs_dir: PathBuf) -> Self {
        Self {
            uploads_dir,
            outputs_dir,
        }
    }

    /// Directory backing a namespace
    pub fn namespace_dir(&self, namespace: Namespace) -> &Path {
        match namespace {
            Namespace::Uploads => &self.uploads_dir,
            Namespace::Outputs => &self.outputs_dir,
        }
    }

    /// Get the file path for a key, or None if the key could escape the namespace
    fn blob_path(&self, namespace: Namespace, key: &str) -> Option<PathBuf> {
        is_valid_key(key).then(|| self.namespace_dir(namespace).join(key))
    }

    fn writable_path(&self, namespace: Namespace, key: &str) -> ServiceResult<PathBuf> {
        self.blob_path(namespace, key)
            .ok_or_else(|| ServiceError::BlobStorage(format!("Invalid blob key: {:?}", key)))
    }

    /// Create both namespace directories if they don't exist
    pub async fn ensure_directories(&self) -> ServiceResult<()> {
        for namespace in Namespace::all() {
            let dir = self.namespace_dir(namespace);
            fs::create_dir_all(dir).await.map_err(|e| {
                ServiceError::BlobStorage(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }
        Ok(())
    }

    /// Ensure the namespace directory exists before a write
    async fn ensure_namespace_dir(&self, namespace: Namespace) -> ServiceResult<()> {
        fs::create_dir_all(self.namespace_dir(namespace))
            .await
            .map_err(|e| {
                ServiceError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn exists(&self, namespace: Namespace, key: &str) -> ServiceResult<bool> {
        let Some(path) = self.blob_path(namespace, key) else {
            return Ok(false);
        };

        match fs::metadata(&path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ServiceError::BlobStorage(format!(
                "Failed to stat blob {}/{}: {}",
                namespace, key, e
            ))),
        }
    }

    async fn write(&self, namespace: Namespace, key: &str, data: &[u8]) -> ServiceResult<()> {
        let path = self.writable_path(namespace, key)?;
        self.ensure_namespace_dir(namespace).await?;

        fs::write(&path, data).await.map_err(|e| {
            ServiceError::BlobStorage(format!("Failed to write blob {}/{}: {}", namespace, key, e))
        })
    }

    async fn write_new(
        &self,
        namespace: Namespace,
        key: &str,
        data: &[u8],
    ) -> ServiceResult<bool> {
        let path = self.writable_path(namespace, key)?;
        self.ensure_namespace_dir(namespace).await?;

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(ServiceError::BlobStorage(format!(
                    "Failed to create blob {}/{}: {}",
                    namespace, key, e
                )))
            }
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            // Leave no truncated blob behind
            drop(file);
            let _ = fs::remove_file(&path).await;
            return Err(ServiceError::BlobStorage(format!(
                "Failed to write blob {}/{}: {}",
                namespace, key, e
            )));
        }

        Ok(true)
    }

    async fn read(&self, namespace: Namespace, key: &str) -> ServiceResult<Vec<u8>> {
        let path = self
            .blob_path(namespace, key)
            .ok_or_else(|| not_found(namespace, key))?;

        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(namespace, key)),
            Err(e) => Err(ServiceError::BlobStorage(format!(
                "Failed to read blob {}/{}: {}",
                namespace, key, e
            ))),
        }
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> ServiceResult<()> {
        let path = self
            .blob_path(namespace, key)
            .ok_or_else(|| not_found(namespace, key))?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(not_found(namespace, key)),
            Err(e) => Err(ServiceError::BlobStorage(format!(
                "Failed to delete blob {}/{}: {}",
                namespace, key, e
            ))),
        }
    }

    async fn list(&self, namespace: Namespace) -> ServiceResult<BTreeSet<String>> {
        let mut keys = BTreeSet::new();

        let mut entries = match fs::read_dir(self.namespace_dir(namespace)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => {
                return Err(ServiceError::BlobStorage(format!(
                    "Failed to list {}: {}",
                    namespace, e
                )))
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                if let Some(name) = entry.file_name().to_str() {
                    keys.insert(name.to_string());
                }
            }
        }

        Ok(keys)
    }

    async fn check_ready(&self) -> ServiceResult<()> {
        for namespace in Namespace::all() {
            let dir = self.namespace_dir(namespace);
            let metadata = fs::metadata(dir).await.map_err(|e| {
                ServiceError::BlobStorage(format!("{} directory unavailable: {}", namespace, e))
            })?;
            if !metadata.is_dir() {
                return Err(ServiceError::BlobStorage(format!(
                    "{} location {:?} is not a directory",
                    namespace, dir
                )));
            }
        }
        Ok(())
    }
}
