/// End-to-end HTTP scenarios
/// Drives the full router against a disk-backed store in a temp directory and
/// the pixel diff engine on real encoded images.
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use screendiff::{config::ServerConfig, context::AppContext, server::build_router};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const BOUNDARY: &str = "screendiff-scenario-boundary";

async fn setup() -> (Router, TempDir) {
    let dir = tempdir().unwrap();
    let mut config = ServerConfig::default();
    config.storage.uploads_directory = dir.path().join("uploads");
    config.storage.outputs_directory = dir.path().join("outputs");

    let ctx = AppContext::new(config).await.unwrap();
    (build_router(ctx), dir)
}

fn png_bytes(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(color));
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

/// Black field with a white square in the top-left corner
fn jpeg_with_square(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

fn upload_request(file_name: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn compare_request(first: &str, second: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/compare")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "first": first, "second": second }).to_string(),
        ))
        .unwrap()
}

fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn upload(app: &Router, file_name: &str, data: &[u8]) -> String {
    let response = app
        .clone()
        .oneshot(upload_request(file_name, data))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["fileName"]
        .as_str()
        .unwrap()
        .to_string()
}

fn stored_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_upload_compare_fetch_delete() {
    let (app, dir) = setup().await;

    let first = upload(&app, "foo.png", &png_bytes(40, 40, [0, 0, 0, 255])).await;
    let second = upload(&app, "bar.jpg", &jpeg_with_square(40, 40)).await;
    assert!(first.ends_with(".png"));
    assert!(second.ends_with(".jpg"));
    assert_ne!(first, second);
    assert_eq!(stored_files(&dir.path().join("uploads")), 2);

    let response = app
        .clone()
        .oneshot(compare_request(&first, &second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    let result_name = report["resultName"].as_str().unwrap().to_string();
    assert!(!result_name.ends_with(".png"));
    assert_eq!(report["isSameDimensions"], true);
    assert!(report["rawMisMatchPercentage"].as_f64().unwrap() > 0.0);
    assert!(report["misMatchPercentage"].is_string());
    assert!(report.get("diffBounds").is_some());
    assert!(report.get("analysisTime").is_some());

    let response = app
        .clone()
        .oneshot(request(Method::GET, &format!("/result/{}", result_name)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let png = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let rendered = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
    assert_eq!((rendered.width(), rendered.height()), (40, 40));

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &format!("/result/{}", result_name)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(stored_files(&dir.path().join("outputs")), 0);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &format!("/result/{}", result_name)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Uploads survive comparison and output deletion
    assert_eq!(stored_files(&dir.path().join("uploads")), 2);
}

#[tokio::test]
async fn test_identical_uploads_match() {
    let (app, _dir) = setup().await;
    let data = png_bytes(16, 16, [10, 200, 30, 255]);

    let first = upload(&app, "left.png", &data).await;
    let second = upload(&app, "right.png", &data).await;

    let response = app
        .clone()
        .oneshot(compare_request(&first, &second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    assert_eq!(report["misMatchPercentage"], "0.00");
    assert_eq!(report["rawMisMatchPercentage"], 0.0);
}

#[tokio::test]
async fn test_compare_names_missing_upload() {
    let (app, dir) = setup().await;
    let second = upload(&app, "bar.png", &png_bytes(8, 8, [0, 0, 0, 255])).await;

    let response = app
        .clone()
        .oneshot(compare_request("missing.png", &second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let error = body_json(response).await["error"]
        .as_str()
        .unwrap()
        .to_string();
    assert!(error.contains("missing.png"));
    assert!(!error.contains(&second));
    assert_eq!(stored_files(&dir.path().join("outputs")), 0);
}

#[tokio::test]
async fn test_undecodable_upload_is_server_error() {
    let (app, dir) = setup().await;
    let first = upload(&app, "notes.txt", b"not an image at all").await;
    let second = upload(&app, "bar.png", &png_bytes(8, 8, [0, 0, 0, 255])).await;

    let response = app
        .clone()
        .oneshot(compare_request(&first, &second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Internal server error");
    assert_eq!(stored_files(&dir.path().join("outputs")), 0);
}

#[tokio::test]
async fn test_upload_roundtrip_and_delete() {
    let (app, _dir) = setup().await;
    let data = png_bytes(4, 4, [1, 2, 3, 255]);
    let file_name = upload(&app, "shot.png", &data).await;
    let uri = format!("/upload/{}", file_name);

    let response = app.clone().oneshot(request(Method::GET, &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&file_name));
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], &data[..]);

    let response = app
        .clone()
        .oneshot(request(Method::DELETE, &uri))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.clone().oneshot(request(Method::GET, &uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Invalid upload name.");
}

#[tokio::test]
async fn test_readiness_reports_storage() {
    let (app, dir) = setup().await;

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    std::fs::remove_dir_all(dir.path().join("outputs")).unwrap();

    let response = app
        .clone()
        .oneshot(request(Method::GET, "/health/ready"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"], "Blob storage unavailable");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _dir) = setup().await;
    upload(&app, "foo.png", &png_bytes(2, 2, [0, 0, 0, 255])).await;

    let response = app
        .oneshot(request(Method::GET, "/metrics"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("screendiff_uploads_total"));
}
