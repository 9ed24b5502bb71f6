//! HTTP tests: the router driven through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use edgequake_doc2md::server::{create_router, AppState};
use edgequake_doc2md::{
    identify, ConversionConfig, Converter, ConverterCategory, ExtractError, ExtractRequest,
    StrategyTable,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "doc2md-test-boundary";

// ── Test helpers ─────────────────────────────────────────────────────────────

struct Part<'a> {
    field: &'a str,
    filename: Option<&'a str>,
    content: &'a [u8],
}

fn file<'a>(field: &'a str, filename: &'a str, content: &'a [u8]) -> Part<'a> {
    Part {
        field,
        filename: Some(filename),
        content,
    }
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.filename {
            Some(name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.field
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.field)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn app(staging: &TempDir, max_file_size: u64, max_upload_bytes: Option<u64>) -> Router {
    app_with(staging, max_file_size, max_upload_bytes, StrategyTable::builtin())
}

fn app_with(
    staging: &TempDir,
    max_file_size: u64,
    max_upload_bytes: Option<u64>,
    strategies: StrategyTable,
) -> Router {
    let config = ConversionConfig::builder()
        .staging_dir(staging.path())
        .max_file_size(max_file_size)
        .build()
        .unwrap();
    let state = AppState::new(Converter::with_strategies(config, strategies))
        .with_max_upload_bytes(max_upload_bytes);
    create_router(state)
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// ── GET /health ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let staging = TempDir::new().unwrap();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

// ── POST /convert ────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_file_success() {
    let staging = TempDir::new().unwrap();
    let request = upload_request("/convert", &[file("file", "report.txt", b"hello there")]);
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "message": "Conversion successful",
            "content": "# report.txt\n\nhello there\n"
        })
    );
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn single_file_without_file_field() {
    let staging = TempDir::new().unwrap();
    let request = upload_request(
        "/convert",
        &[Part {
            field: "comment",
            filename: None,
            content: b"no file here",
        }],
    );
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No file part in the request" }));
}

#[tokio::test]
async fn single_file_with_non_multipart_body() {
    let staging = TempDir::new().unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/convert")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No file part in the request");
}

#[tokio::test]
async fn single_file_with_empty_filename() {
    let staging = TempDir::new().unwrap();
    let request = upload_request("/convert", &[file("file", "", b"data")]);
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "No selected file" }));
}

#[tokio::test]
async fn unsupported_type_is_415_with_mime() {
    let staging = TempDir::new().unwrap();
    let content: &[u8] = &[0x00, 0x9f, 0x92, 0x96, 0xff, 0x00, 0x13, 0x37];
    let expected_mime = identify("notes.xyz", content).mime_type;

    let request = upload_request("/convert", &[file("file", "notes.xyz", content)]);
    let (status, body) = send(app(&staging, 1000, None), request).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["mime_type"], json!(expected_mime));
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Unsupported file type: "), "{error}");
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn oversize_file_is_400() {
    let staging = TempDir::new().unwrap();
    let content = vec![b'a'; 101];
    let request = upload_request("/convert", &[file("file", "big.txt", &content)]);
    let (status, body) = send(app(&staging, 100, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "File size exceeds maximum allowed size of 100 bytes" })
    );
}

#[tokio::test]
async fn upload_ceiling_rejects_while_streaming() {
    let staging = TempDir::new().unwrap();
    let content = vec![b'a'; 64];
    let request = upload_request("/convert", &[file("file", "big.txt", &content)]);
    let (status, body) = send(app(&staging, 1000, Some(32)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "File size exceeds maximum allowed size of 32 bytes"
    );
}

#[tokio::test]
async fn without_ceiling_streaming_stops_at_max_file_size() {
    let staging = TempDir::new().unwrap();
    let content = vec![b'a'; 1 << 20];
    let request = upload_request("/convert", &[file("file", "huge.txt", &content)]);
    let (status, body) = send(app(&staging, 100, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "error": "File size exceeds maximum allowed size of 100 bytes" })
    );
    assert_eq!(std::fs::read_dir(staging.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn batch_over_ceiling_rejects_the_request() {
    let staging = TempDir::new().unwrap();
    let too_big = vec![b'a'; 200];
    let request = upload_request(
        "/api/convert",
        &[
            file("a", "small.txt", b"fine"),
            file("b", "big.txt", &too_big),
        ],
    );
    let (status, body) = send(app(&staging, 1000, Some(150)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "File size exceeds maximum allowed size of 150 bytes"
    );
}

#[tokio::test]
async fn total_failure_is_500() {
    let staging = TempDir::new().unwrap();
    // Removing the staged file makes the plain-text fallback fail as well.
    let table = StrategyTable::empty().with_strategy(
        ConverterCategory::Text,
        |req: ExtractRequest| async move {
            let _ = std::fs::remove_file(&req.path);
            Err(ExtractError::failed(ConverterCategory::Text, "stub"))
        },
    );
    let request = upload_request("/convert", &[file("file", "notes.txt", b"hello")]);
    let (status, body) = send(app_with(&staging, 1000, None, table), request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to convert file: "), "{error}");
}

// ── POST /api/convert ────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_without_files_is_400() {
    let staging = TempDir::new().unwrap();
    let request = upload_request(
        "/api/convert",
        &[Part {
            field: "note",
            filename: None,
            content: b"text field only",
        }],
    );
    let (status, body) = send(app(&staging, 1000, None), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Please upload files in the request" }));
}

#[tokio::test]
async fn batch_returns_one_record_per_file_in_order() {
    let staging = TempDir::new().unwrap();
    let too_big = vec![b'a'; 200];
    let request = upload_request(
        "/api/convert",
        &[
            file("a", "intro.md", b"# Intro\n\nWelcome."),
            file("b", "blob.xyz", &[0x00, 0x9f, 0x92, 0x96, 0xff, 0x00]),
            file("c", "big.txt", &too_big),
        ],
    );
    let (status, body) = send(app(&staging, 100, None), request).await;
    assert_eq!(status, StatusCode::OK);

    let records = body.as_array().unwrap();
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["filename"], "intro.md");
    assert_eq!(records[0]["title"], "intro.md");
    assert_eq!(records[0]["markdown"], "# intro.md\n\n# Intro\n\nWelcome.\n");
    assert_eq!(records[0]["metadata"]["converterType"], "markdown");
    assert_eq!(records[0]["metadata"]["fileSizeBytes"], 18);

    assert_eq!(records[1]["filename"], "blob.xyz");
    assert!(records[1]["error"]
        .as_str()
        .unwrap()
        .starts_with("Unsupported file type"));

    assert_eq!(records[2]["filename"], "big.txt");
    assert_eq!(
        records[2]["error"],
        "File size exceeds maximum allowed size of 100 bytes"
    );
}
