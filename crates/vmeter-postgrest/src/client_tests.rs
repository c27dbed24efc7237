//! Tests for the PostgREST client and preset repository.

use std::time::Duration;

use serde_json::json;
use serial_test::serial;
use uuid::Uuid;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vmeter_models::{PresetId, PresetQuery, PresetUpdate};

use crate::client::{PostgrestClient, PostgrestConfig};
use crate::error::PostgrestError;
use crate::repository::{PostgrestPresetRepository, PresetRepository};
use crate::retry::RetryConfig;

// =============================================================================
// Test Helpers
// =============================================================================

const PRESET_ID: &str = "6f1c2a54-9d0e-4b7a-8c11-2f3e4d5a6b7c";

fn test_config(base_url: &str) -> PostgrestConfig {
    PostgrestConfig {
        timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(2),
        retry: RetryConfig {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..PostgrestConfig::new(base_url, "service-key")
    }
}

fn repo(server: &MockServer) -> PostgrestPresetRepository {
    let client = PostgrestClient::new(test_config(&server.uri())).unwrap();
    PostgrestPresetRepository::new(client, "presets")
}

fn row(name: &str, public: bool) -> serde_json::Value {
    json!({
        "id": PRESET_ID,
        "name": name,
        "target": -23.0,
        "tolerance": 1.0,
        "is_mono_check": false,
        "created_by": "user-1",
        "is_public": public,
        "created_at": "2024-05-01T12:00:00Z"
    })
}

fn preset_id() -> PresetId {
    PresetId(Uuid::parse_str(PRESET_ID).unwrap())
}

// =============================================================================
// Error Mapping
// =============================================================================

#[test]
fn test_error_from_http_status() {
    assert!(matches!(PostgrestError::from_http_status(404, "x"), PostgrestError::NotFound(_)));
    assert!(matches!(PostgrestError::from_http_status(409, "x"), PostgrestError::AlreadyExists(_)));
    assert!(matches!(PostgrestError::from_http_status(400, "x"), PostgrestError::RequestFailed(_)));
    assert!(matches!(PostgrestError::from_http_status(503, "x"), PostgrestError::ServerError(503, _)));

    let limited = PostgrestError::from_http_parts(429, Some(3000), "x");
    assert_eq!(limited.retry_after_ms(), Some(3000));
    assert!(limited.is_retryable());
    assert!(!PostgrestError::from_http_status(401, "x").is_retryable());
}

#[test]
fn test_error_http_status_getter() {
    assert_eq!(PostgrestError::RateLimited(1000).http_status(), Some(429));
    assert_eq!(PostgrestError::ServerError(502, "bad gateway".into()).http_status(), Some(502));
    assert_eq!(PostgrestError::not_found("preset").http_status(), Some(404));
    assert_eq!(PostgrestError::not_configured("x").http_status(), None);
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
#[serial]
fn test_config_from_env() {
    std::env::set_var("SUPABASE_URL", "https://project.supabase.co/");
    std::env::set_var("SUPABASE_SERVICE_KEY", "secret");
    std::env::set_var("POSTGREST_CONNECT_TIMEOUT_SECS", "9");

    let config = PostgrestConfig::from_env().unwrap();
    assert_eq!(config.base_url, "https://project.supabase.co");
    assert_eq!(config.api_key, "secret");
    assert_eq!(config.connect_timeout, Duration::from_secs(9));

    std::env::remove_var("SUPABASE_URL");
    std::env::remove_var("SUPABASE_SERVICE_KEY");
    std::env::remove_var("POSTGREST_CONNECT_TIMEOUT_SECS");
}

#[test]
#[serial]
fn test_config_from_env_requires_url() {
    std::env::remove_var("SUPABASE_URL");
    std::env::set_var("SUPABASE_SERVICE_KEY", "secret");

    let err = PostgrestConfig::from_env().unwrap_err();
    assert!(matches!(err, PostgrestError::NotConfigured(_)));

    std::env::remove_var("SUPABASE_SERVICE_KEY");
}

#[test]
#[serial]
fn test_config_from_env_rejects_bad_url() {
    std::env::set_var("SUPABASE_SERVICE_KEY", "secret");

    std::env::set_var("SUPABASE_URL", "not a url");
    assert!(matches!(PostgrestConfig::from_env(), Err(PostgrestError::NotConfigured(_))));

    std::env::set_var("SUPABASE_URL", "ftp://project.supabase.co");
    assert!(matches!(PostgrestConfig::from_env(), Err(PostgrestError::NotConfigured(_))));

    std::env::remove_var("SUPABASE_URL");
    std::env::remove_var("SUPABASE_SERVICE_KEY");
}

// =============================================================================
// Repository Requests
// =============================================================================

#[tokio::test]
async fn test_list_owned_or_public_request_shape() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .and(header("apikey", "service-key"))
        .and(header("authorization", "Bearer service-key"))
        .and(query_param("or", "(created_by.eq.\"user-1\",is_public.eq.true)"))
        .and(query_param("order", "created_at.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("Broadcast", true)])))
        .expect(1)
        .mount(&server)
        .await;

    let presets = repo(&server)
        .list(&PresetQuery {
            user_id: Some("user-1".into()),
            include_public: true,
        })
        .await
        .unwrap();

    assert_eq!(presets.len(), 1);
    assert_eq!(presets[0].name, "Broadcast");
    assert_eq!(presets[0].id, preset_id());
    assert!(presets[0].is_public);
}

#[tokio::test]
async fn test_list_public_only_and_empty_scope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .and(query_param("is_public", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let repo = repo(&server);
    let public = PresetQuery {
        user_id: None,
        include_public: true,
    };
    assert!(repo.list(&public).await.unwrap().is_empty());

    // No user and no public flag never reaches the backend
    assert!(repo.list(&PresetQuery::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .and(query_param("id", format!("eq.{}", PRESET_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = repo(&server).get(&preset_id()).await.unwrap_err();
    assert!(matches!(err, PostgrestError::NotFound(_)));
}

#[tokio::test]
async fn test_create_sends_snake_case_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/presets"))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([row("Podcast", false)])))
        .expect(1)
        .mount(&server)
        .await;

    let preset = vmeter_models::NewPreset {
        id: Some(preset_id()),
        name: "Podcast".into(),
        target: -23.0,
        tolerance: 1.0,
        is_mono_check: false,
        is_public: false,
        created_by: "user-1".into(),
    }
    .into_preset();

    let created = repo(&server).create(preset).await.unwrap();
    assert_eq!(created.name, "Podcast");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["created_by"], "user-1");
    assert_eq!(body[0]["id"], PRESET_ID);
    assert!(body[0].get("createdBy").is_none());
}

#[tokio::test]
async fn test_share_patches_is_public() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/presets"))
        .and(query_param("id", format!("eq.{}", PRESET_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("Broadcast", true)])))
        .expect(1)
        .mount(&server)
        .await;

    let shared = repo(&server).share(&preset_id()).await.unwrap();
    assert!(shared.is_public);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body, json!({ "is_public": true }));
}

#[tokio::test]
async fn test_empty_update_reads_current_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("Broadcast", false)])))
        .expect(1)
        .mount(&server)
        .await;

    let preset = repo(&server).update(&preset_id(), &PresetUpdate::default()).await.unwrap();
    assert_eq!(preset.name, "Broadcast");
}

#[tokio::test]
async fn test_delete_missing_row_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = repo(&server).delete(&preset_id()).await.unwrap_err();
    assert!(matches!(err, PostgrestError::NotFound(_)));
}

// =============================================================================
// Retry Behavior
// =============================================================================

#[tokio::test]
async fn test_list_retries_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row("Broadcast", true)])))
        .mount(&server)
        .await;

    let presets = repo(&server)
        .list(&PresetQuery {
            user_id: None,
            include_public: true,
        })
        .await
        .unwrap();
    assert_eq!(presets.len(), 1);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_create_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let preset = vmeter_models::NewPreset {
        id: None,
        name: "x".into(),
        target: -14.0,
        tolerance: 1.0,
        is_mono_check: false,
        is_public: false,
        created_by: "u".into(),
    }
    .into_preset();

    let err = repo(&server).create(preset).await.unwrap_err();
    assert!(matches!(err, PostgrestError::ServerError(500, _)));
}

#[tokio::test]
async fn test_conflict_maps_to_already_exists() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/presets"))
        .respond_with(ResponseTemplate::new(409).set_body_string("duplicate key"))
        .mount(&server)
        .await;

    let preset = vmeter_models::NewPreset {
        id: Some(preset_id()),
        name: "dup".into(),
        target: -14.0,
        tolerance: 1.0,
        is_mono_check: false,
        is_public: false,
        created_by: "u".into(),
    }
    .into_preset();

    let err = repo(&server).create(preset).await.unwrap_err();
    assert!(matches!(err, PostgrestError::AlreadyExists(_)));
}
