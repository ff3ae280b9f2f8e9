/// Diff result endpoints
use crate::{
    api::{blob_name, download_response},
    context::AppContext,
    error::ServiceResult,
};
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};

/// Build result routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/result/:name", get(get_result).delete(delete_result))
}

/// Download a rendered diff; `name` has no extension
async fn get_result(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> ServiceResult<Response> {
    let name = blob_name(path)?;
    let download = ctx.service.fetch_output(&name).await?;
    Ok(download_response(download))
}

/// Delete a rendered diff
async fn delete_result(
    State(ctx): State<AppContext>,
    path: Result<Path<String>, PathRejection>,
) -> ServiceResult<StatusCode> {
    let name = blob_name(path)?;
    ctx.service.delete_output(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
