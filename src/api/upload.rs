/// Upload endpoints: store, download and delete source images
use crate::{
    api::{blob_name, download_response},
    context::AppContext,
    error::{ServiceError, ServiceResult},
    service::UploadResponse,
};
use axum::{
    extract::{multipart::MultipartRejection, rejection::PathRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Multipart field carrying the image
const IMAGE_FIELD: &str = "image";

/// Build upload routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/upload", post(upload_image))
        .route("/upload/:name", get(get_upload).delete(delete_upload))
}

/// Store the `image` field of a multipart body
///
/// Responds 201 with the generated key; 400 when no file is present.
async fn upload_image(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServiceResult<(StatusCode, Json<UploadResponse>)> {
    let (data, original_name) = match multipart {
        Ok(multipart) => read_image_field(multipart).await?,
        Err(rejection) => {
            tracing::debug!(reason = %rejection.body_text(), "upload_without_multipart");
            (None, None)
        }
    };

    let response = ctx.service.upload(data, original_name.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Pull the image bytes and client file name out of the form
async fn read_image_field(
    mut multipart: Multipart,
) -> ServiceResult<(Option<Vec<u8>>, Option<String>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("Malformed upload: {}", e.body_text())))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let original_name = field.file_name().map(str::to_string);
        let data = field.bytes().await.map_err(|e| {
            ServiceError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
        })?;
        return Ok((Some(data.to_vec()), original_name));
    }

    Ok((None, None))
}

/// Download an upload by its full key
async fn get_upload(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> ServiceResult<Response> {
    let name = blob_name(path)?;
    let download = ctx.service.fetch_upload(&name).await?;
    Ok(download_response(download))
}

/// Delete an upload by its full key
async fn delete_upload(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> ServiceResult<impl IntoResponse> {
    let name = blob_name(path)?;
    ctx.service.delete_upload(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
