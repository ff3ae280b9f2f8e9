/// Upload, compare, fetch and delete orchestration
///
/// Stateless between requests: every call goes straight to the blob store.
/// Two requests touching the same key are not serialized, so a caller may
/// see `NotFound` for a blob another request just deleted.
use crate::{
    blob_store::{BlobStore, Namespace},
    diff::{DiffEngine, DiffOptions, DiffReport},
    error::{ServiceError, ServiceResult},
    metrics,
    naming::{KeyGenerator, RESULT_EXTENSION},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const NO_FILE_UPLOADED: &str = "No file uploaded.";
const MISSING_COMPARE_INPUT: &str = "Missing first or second or both.";
const SAME_COMPARE_INPUT: &str = "first and second must name different uploads.";
const INVALID_RESULT_NAME: &str = "Invalid result name.";
const INVALID_UPLOAD_NAME: &str = "Invalid upload name.";

/// Upload response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Stored key, including the original extension
    pub file_name: String,
}

/// Compare request body
///
/// Both fields are read independently; neither substitutes for the other.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompareRequest {
    pub first: Option<String>,
    pub second: Option<String>,
}

/// Compare response: the diff report with the stored output name alongside
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareResponse {
    /// Output key without the `.png` extension
    pub result_name: String,
    #[serde(flatten)]
    pub report: DiffReport,
}

/// Blob content handed back for download
#[derive(Debug, Clone)]
pub struct Download {
    /// Full stored key
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Extension of an uploaded file name, including the dot
///
/// Directory components are dropped and a leading dot does not start an
/// extension, so `.profile` has none while `shot.` keeps `.`.
pub fn extension_of(original_name: &str) -> &str {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let leading_dots = base.len() - base.trim_start_matches('.').len();

    match base[leading_dots..].rfind('.') {
        Some(i) => &base[leading_dots + i..],
        None => "",
    }
}

fn present(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.is_empty())
}

fn rename_not_found(err: ServiceError, message: &str) -> ServiceError {
    match err {
        ServiceError::NotFound(detail) => {
            debug!(detail = %detail, "blob_lookup_missed");
            ServiceError::NotFound(message.to_string())
        }
        other => other,
    }
}

/// Orchestrates the blob store, key generator and diff engine
pub struct ScreendiffService {
    store: Arc<dyn BlobStore>,
    engine: Arc<dyn DiffEngine>,
    keys: KeyGenerator,
    options: DiffOptions,
}

impl ScreendiffService {
    /// Create a service using the fixed comparison options
    pub fn new(store: Arc<dyn BlobStore>, engine: Arc<dyn DiffEngine>) -> Self {
        Self {
            store,
            engine,
            keys: KeyGenerator::new(),
            options: DiffOptions::default(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    /// Store an uploaded image under a fresh key
    ///
    /// Any bytes are accepted; the format is never inspected.
    pub async fn upload(
        &self,
        data: Option<Vec<u8>>,
        original_name: Option<&str>,
    ) -> ServiceResult<UploadResponse> {
        let data = data
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| ServiceError::MissingInput(NO_FILE_UPLOADED.to_string()))?;
        let extension = extension_of(original_name.unwrap_or_default());

        let id = self
            .keys
            .reserve(self.store.as_ref(), Namespace::Uploads, extension, &data)
            .await?;
        let file_name = format!("{}{}", id, extension);

        metrics::record_upload();
        info!(file_name = %file_name, size = data.len(), "upload_stored");

        Ok(UploadResponse { file_name })
    }

    /// Compare two uploads and store the rendered diff
    pub async fn compare(&self, request: CompareRequest) -> ServiceResult<CompareResponse> {
        let result = self.run_comparison(request).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(ServiceError::MissingInput(_)) | Err(ServiceError::InvalidInput(_)) => {
                "invalid_request"
            }
            Err(ServiceError::InvalidReference(_)) => "invalid_reference",
            Err(_) => "failure",
        };
        metrics::record_comparison(outcome);

        result
    }

    async fn run_comparison(&self, request: CompareRequest) -> ServiceResult<CompareResponse> {
        let (first, second) = match (present(request.first), present(request.second)) {
            (Some(first), Some(second)) => (first, second),
            _ => return Err(ServiceError::MissingInput(MISSING_COMPARE_INPUT.to_string())),
        };

        if first == second {
            return Err(ServiceError::InvalidInput(SAME_COMPARE_INPUT.to_string()));
        }

        let first_exists = self.store.exists(Namespace::Uploads, &first).await?;
        let second_exists = self.store.exists(Namespace::Uploads, &second).await?;
        if !(first_exists && second_exists) {
            let missing: Vec<&str> = [(&first, first_exists), (&second, second_exists)]
                .into_iter()
                .filter(|(_, exists)| !exists)
                .map(|(key, _)| key.as_str())
                .collect();
            return Err(ServiceError::InvalidReference(format!(
                "Invalid file(s): {}",
                missing.join(" ")
            )));
        }

        // Either upload may have been deleted since the existence check
        let first_bytes = self.read_reference(&first).await?;
        let second_bytes = self.read_reference(&second).await?;

        let engine = Arc::clone(&self.engine);
        let options = self.options.clone();
        let started = Instant::now();
        let outcome = tokio::task::spawn_blocking(move || {
            engine.compare(&first_bytes, &second_bytes, &options)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("Comparison task failed: {}", e)))??;
        metrics::record_comparison_duration(started.elapsed().as_secs_f64());

        let result_name = self
            .keys
            .reserve(
                self.store.as_ref(),
                Namespace::Outputs,
                RESULT_EXTENSION,
                &outcome.image,
            )
            .await?;

        info!(
            first = %first,
            second = %second,
            result_name = %result_name,
            mismatch = %outcome.report.mis_match_percentage,
            "comparison_stored"
        );

        Ok(CompareResponse {
            result_name,
            report: outcome.report,
        })
    }

    async fn read_reference(&self, key: &str) -> ServiceResult<Vec<u8>> {
        self.store
            .read(Namespace::Uploads, key)
            .await
            .map_err(|err| match err {
                ServiceError::NotFound(_) => {
                    ServiceError::InvalidReference(format!("Invalid file(s): {}", key))
                }
                other => other,
            })
    }

    /// Fetch a rendered diff by name (without extension)
    pub async fn fetch_output(&self, name: &str) -> ServiceResult<Download> {
        let file_name = format!("{}{}", name, RESULT_EXTENSION);
        let data = self
            .store
            .read(Namespace::Outputs, &file_name)
            .await
            .map_err(|e| rename_not_found(e, INVALID_RESULT_NAME))?;
        Ok(Download { file_name, data })
    }

    /// Delete a rendered diff by name (without extension)
    pub async fn delete_output(&self, name: &str) -> ServiceResult<()> {
        let file_name = format!("{}{}", name, RESULT_EXTENSION);
        self.store
            .delete(Namespace::Outputs, &file_name)
            .await
            .map_err(|e| rename_not_found(e, INVALID_RESULT_NAME))?;

        metrics::record_delete(Namespace::Outputs.as_str());
        info!(file_name = %file_name, "output_deleted");
        Ok(())
    }

    /// Fetch an upload by its full stored key
    pub async fn fetch_upload(&self, name: &str) -> ServiceResult<Download> {
        let data = self
            .store
            .read(Namespace::Uploads, name)
            .await
            .map_err(|e| rename_not_found(e, INVALID_UPLOAD_NAME))?;
        Ok(Download {
            file_name: name.to_string(),
            data,
        })
    }

    /// Delete an upload by its full stored key
    pub async fn delete_upload(&self, name: &str) -> ServiceResult<()> {
        self.store
            .delete(Namespace::Uploads, name)
            .await
            .map_err(|e| rename_not_found(e, INVALID_UPLOAD_NAME))?;

        metrics::record_delete(Namespace::Uploads.as_str());
        info!(file_name = %name, "upload_deleted");
        Ok(())
    }
}
