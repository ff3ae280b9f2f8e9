/// Comparison endpoint
use crate::{
    context::AppContext,
    error::{ServiceError, ServiceResult},
    service::{CompareRequest, CompareResponse},
};
use axum::{
    extract::{FromRequest, Request, State},
    http::{header, HeaderMap},
    routing::post,
    Form, Json, Router,
};

/// Build compare routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/compare", post(compare_images))
}

fn is_form_encoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
        .unwrap_or(false)
}

/// Read `first` and `second` from a JSON or urlencoded form body
async fn read_compare_request(request: Request) -> ServiceResult<CompareRequest> {
    if is_form_encoded(request.headers()) {
        let Form(body) = Form::<CompareRequest>::from_request(request, &())
            .await
            .map_err(|rejection| {
                ServiceError::InvalidInput(format!(
                    "Invalid compare request: {}",
                    rejection.body_text()
                ))
            })?;
        return Ok(body);
    }

    let Json(body) = Json::<CompareRequest>::from_request(request, &())
        .await
        .map_err(|rejection| {
            ServiceError::InvalidInput(format!("Invalid compare request: {}", rejection.body_text()))
        })?;
    Ok(body)
}

/// Compare two uploads named by `first` and `second`
///
/// 200 with the diff report and `resultName`; 400 when a field is missing;
/// 404 when either upload does not exist.
async fn compare_images(
    State(ctx): State<AppContext>,
    request: Request,
) -> ServiceResult<Json<CompareResponse>> {
    let body = read_compare_request(request).await?;

    let response = ctx.service.compare(body).await?;
    Ok(Json(response))
}
