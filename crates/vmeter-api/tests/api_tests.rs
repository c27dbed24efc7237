//! API integration tests against stub backends.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bytes::Bytes;
use serde_json::{json, Value};
use tower::ServiceExt;

use vmeter_api::{create_router, ApiConfig, AppState};
use vmeter_media::{LoudnessAnalyzer, MediaError, MediaResult};
use vmeter_models::{LoudnessMeasurement, UploadedVideo};
use vmeter_postgrest::{InMemoryPresetRepository, PresetRepository};
use vmeter_storage::{StorageResult, VideoStore};

// =============================================================================
// Test Helpers
// =============================================================================

const BOUNDARY: &str = "vmeter-test-boundary";

/// Analyzer that reports a fixed reading, or fails on request.
enum StubAnalyzer {
    Reading(Option<f64>),
    Unavailable,
    Fails,
}

#[async_trait]
impl LoudnessAnalyzer for StubAnalyzer {
    async fn analyze(&self, media: Bytes) -> MediaResult<LoudnessMeasurement> {
        match self {
            StubAnalyzer::Reading(integrated) => Ok(LoudnessMeasurement::new(
                *integrated,
                None,
                format!("analyzed {} bytes", media.len()),
            )),
            StubAnalyzer::Unavailable => Err(MediaError::engine_unavailable("ffmpeg not found")),
            StubAnalyzer::Fails => Err(MediaError::analysis_failed(
                "FFmpeg exited with non-zero status: Invalid data found when processing input",
                Some("Invalid data found when processing input".into()),
                Some(1),
            )),
        }
    }

    async fn engine_version(&self) -> MediaResult<String> {
        match self {
            StubAnalyzer::Unavailable => Err(MediaError::engine_unavailable("ffmpeg not found")),
            _ => Ok("ffmpeg version stub".to_string()),
        }
    }

    fn is_ready(&self) -> bool {
        !matches!(self, StubAnalyzer::Unavailable)
    }
}

struct StubStore;

#[async_trait]
impl VideoStore for StubStore {
    async fn upload(&self, file_name: &str, _data: Bytes, _content_type: &str) -> StorageResult<UploadedVideo> {
        Ok(UploadedVideo {
            success: true,
            url: self.public_url(file_name),
            file_name: file_name.to_string(),
        })
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("https://storage.test/videos/{}", file_name)
    }
}

fn state_with(analyzer: StubAnalyzer, videos: Option<Arc<dyn VideoStore>>) -> AppState {
    let presets: Arc<dyn PresetRepository> = Arc::new(InMemoryPresetRepository::new());
    AppState::new(ApiConfig::default(), Arc::new(analyzer), presets, videos)
}

fn app(state: AppState) -> Router {
    create_router(state, None)
}

fn multipart(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match file_name {
            Some(f) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: video/mp4\r\n\r\n",
                    name, f
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes()),
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[(&str, Option<&str>, &[u8])]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(multipart(parts)))
        .unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };
    (status, body)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = app(state_with(StubAnalyzer::Reading(Some(-23.4)), None));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_ready_reports_engine_and_presets() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let (status, body) = send(&app, get("/ready")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["checks"]["engine"]["detail"], "ffmpeg version stub");
    assert_eq!(body["checks"]["presets"]["detail"], "memory");
    assert_eq!(body["checks"]["storage"]["status"], "disabled");
}

#[tokio::test]
async fn test_ready_is_degraded_without_engine() {
    let app = app(state_with(StubAnalyzer::Unavailable, None));
    let (status, body) = send(&app, get("/ready")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["checks"]["engine"]["status"], "error");
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let (status, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

// =============================================================================
// Analysis
// =============================================================================

#[tokio::test]
async fn test_analyze_returns_measurement() {
    let app = app(state_with(StubAnalyzer::Reading(Some(-23.4)), None));
    let (status, body) = send(&app, multipart_request("/api/analyze", &[("file", Some("clip.mp4"), b"media")])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["measurement"]["integrated"], -23.4);
    assert_eq!(body["measurement"]["shortTerm"], Value::Null);
    assert_eq!(body["measurement"]["rawLog"], "analyzed 5 bytes");
    assert!(body.get("report").is_none());
}

#[tokio::test]
async fn test_analyze_absent_reading_is_null_not_zero() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let (status, body) = send(&app, multipart_request("/api/analyze", &[("file", Some("clip.mp4"), b"x")])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["measurement"]["integrated"], Value::Null);
}

#[tokio::test]
async fn test_analyze_without_file_is_bad_request() {
    let app = app(state_with(StubAnalyzer::Reading(Some(-23.4)), None));
    let (status, body) = send(&app, multipart_request("/api/analyze", &[("presetId", None, b"")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file uploaded");
}

#[tokio::test]
async fn test_analyze_with_preset_includes_report() {
    let app = app(state_with(StubAnalyzer::Reading(Some(-25.5)), None));

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/presets",
            json!({ "name": "Broadcast", "target": -23.0, "tolerance": 2.0, "createdBy": "user-1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let preset_id = created["preset"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        multipart_request(
            "/api/analyze",
            &[("presetId", None, preset_id.as_bytes()), ("file", Some("clip.mp4"), b"media")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let report = &body["report"];
    assert_eq!(report["presetName"], "Broadcast");
    assert_eq!(report["integrated"]["display"], "-25.5");
    assert_eq!(report["integrated"]["withinTarget"], false);
    assert_eq!(report["integrated"]["verdict"]["status"], "below");
    assert_eq!(report["summary"], "Integrated LUFS is 2.5 LUFS below target.");
}

#[tokio::test]
async fn test_analyze_with_unknown_preset_is_not_found() {
    let app = app(state_with(StubAnalyzer::Reading(Some(-23.0)), None));
    let (status, _) = send(
        &app,
        multipart_request(
            "/api/analyze",
            &[
                ("presetId", None, b"6f1c2a54-9d0e-4b7a-8c11-2f3e4d5a6b7c"),
                ("file", Some("clip.mp4"), b"media"),
            ],
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_while_busy_is_conflict() {
    let state = state_with(StubAnalyzer::Reading(Some(-23.4)), None);
    let app = app(state.clone());

    let permit = state.gate.try_acquire().unwrap();
    let (status, _) = send(&app, multipart_request("/api/analyze", &[("file", Some("a.mp4"), b"media")])).await;
    assert_eq!(status, StatusCode::CONFLICT);

    drop(permit);
    let (status, _) = send(&app, multipart_request("/api/analyze", &[("file", Some("a.mp4"), b"media")])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_gate_is_released_after_failure() {
    let state = state_with(StubAnalyzer::Fails, None);
    let app = app(state.clone());

    let (status, body) = send(&app, multipart_request("/api/analyze", &[("file", Some("a.mp4"), b"junk")])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "analysis_failed");
    assert!(!state.gate.is_busy());
}

#[tokio::test]
async fn test_analyze_engine_unavailable() {
    let app = app(state_with(StubAnalyzer::Unavailable, None));
    let (status, body) = send(&app, multipart_request("/api/analyze", &[("file", Some("a.mp4"), b"media")])).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "engine_unavailable");
}

#[tokio::test]
async fn test_compare_against_target() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));

    let (status, body) = send(
        &app,
        json_request("POST", "/api/compare", json!({ "integrated": -25.0, "target": -23.0, "tolerance": 2.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integrated"]["withinTarget"], true);
    assert_eq!(body["shortTerm"]["withinTarget"], false);
    assert_eq!(body["shortTerm"]["display"], "N/A");
    assert_eq!(body["shortTerm"]["verdict"]["status"], "unmeasured");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/compare", json!({ "integrated": -25.0, "target": -23.0, "tolerance": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Presets
// =============================================================================

#[tokio::test]
async fn test_preset_lifecycle() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/presets",
            json!({ "name": "Podcast", "target": -16.0, "tolerance": 1.0, "isMonoCheck": true, "createdBy": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["preset"]["isPublic"], false);
    let id = created["preset"]["id"].as_str().unwrap().to_string();

    // Private presets are hidden from other users
    let (_, listing) = send(&app, get("/api/presets?userId=bob&includePublic=true")).await;
    assert_eq!(listing["presets"].as_array().unwrap().len(), 0);

    let (_, listing) = send(&app, get("/api/presets?userId=alice")).await;
    assert_eq!(listing["presets"][0]["name"], "Podcast");

    let (status, updated) = send(
        &app,
        json_request("PUT", &format!("/api/presets/{}", id), json!({ "tolerance": 1.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["preset"]["tolerance"], 1.5);
    assert_eq!(updated["preset"]["name"], "Podcast");

    let (status, shared) = send(&app, json_request("POST", &format!("/api/presets/{}/share", id), json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(shared["preset"]["isPublic"], true);

    let (_, listing) = send(&app, get("/api/presets?userId=bob&includePublic=true")).await;
    assert_eq!(listing["presets"].as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/presets/{}", id))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, _) = send(&app, get(&format!("/api/presets/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_preset_validation() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));

    for body in [
        json!({ "name": "  ", "target": -16.0, "tolerance": 1.0, "createdBy": "alice" }),
        json!({ "name": "Loud", "target": 3.0, "tolerance": 1.0, "createdBy": "alice" }),
        json!({ "name": "Tight", "target": -16.0, "tolerance": 0.0, "createdBy": "alice" }),
    ] {
        let (status, response) = send(&app, json_request("POST", "/api/presets", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["code"], "validation_failed");
    }
}

#[tokio::test]
async fn test_list_presets_without_scope_is_empty() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let (status, body) = send(&app, get("/api/presets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "presets": [] }));
}

#[tokio::test]
async fn test_include_public_only_honors_literal_true() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/presets",
            json!({ "name": "Shared", "target": -14.0, "tolerance": 1.0, "isPublic": true, "createdBy": "alice" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    for flag in ["1", "yes", "TRUE"] {
        let (status, body) = send(&app, get(&format!("/api/presets?userId=bob&includePublic={}", flag))).await;
        assert_eq!(status, StatusCode::OK, "includePublic={}", flag);
        assert_eq!(body["presets"].as_array().unwrap().len(), 0);
    }

    let (_, body) = send(&app, get("/api/presets?userId=bob&includePublic=true")).await;
    assert_eq!(body["presets"][0]["name"], "Shared");
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_upload_stores_with_timestamped_name() {
    let app = app(state_with(StubAnalyzer::Reading(None), Some(Arc::new(StubStore))));
    let (status, body) = send(&app, multipart_request("/api/upload", &[("file", Some("clip.mp4"), b"media")])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let file_name = body["fileName"].as_str().unwrap();
    assert!(file_name.ends_with("_clip.mp4"));
    assert!(file_name.split('_').next().unwrap().parse::<i64>().is_ok());
    assert_eq!(body["url"], format!("https://storage.test/videos/{}", file_name));
}

#[tokio::test]
async fn test_upload_without_file_is_bad_request() {
    let app = app(state_with(StubAnalyzer::Reading(None), Some(Arc::new(StubStore))));
    let (status, body) = send(&app, multipart_request("/api/upload", &[("other", None, b"x")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_without_storage_is_unavailable() {
    let app = app(state_with(StubAnalyzer::Reading(None), None));
    let (status, _) = send(&app, multipart_request("/api/upload", &[("file", Some("clip.mp4"), b"media")])).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
