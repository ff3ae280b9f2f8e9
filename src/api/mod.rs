/// API routes and handlers
pub mod compare;
pub mod health;
pub mod result;
pub mod upload;

use crate::{
    context::AppContext,
    error::{ServiceError, ServiceResult},
    service::Download,
};
use axum::{
    extract::{rejection::PathRejection, Path},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Router,
};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(upload::routes())
        .merge(compare::routes())
        .merge(result::routes())
        .merge(health::routes())
}

/// Unwrap a `:name` path segment, turning extractor failures into JSON 400s
pub fn blob_name(path: Result<Path<String>, PathRejection>) -> ServiceResult<String> {
    path.map(|Path(name)| name).map_err(|rejection| {
        ServiceError::InvalidInput(format!("Invalid blob name: {}", rejection.body_text()))
    })
}

/// Content type guessed from a stored key's extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Serve a stored blob as a file download
pub fn download_response(download: Download) -> Response {
    // Header values must stay visible ASCII
    let safe_name: String = download
        .file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type_for(&download.file_name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", safe_name),
            ),
        ],
        download.data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
        assert_eq!(content_type_for("a.tiff"), "application/octet-stream");
    }

    #[test]
    fn test_download_headers() {
        let response = download_response(Download {
            file_name: "abc\".png".to_string(),
            data: vec![1, 2, 3],
        });

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"abc_.png\""
        );
    }
}
