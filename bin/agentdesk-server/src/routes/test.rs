//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use agentdesk_core::stream::collect_stream;

use super::build;
use crate::config::Config;
use crate::middleware::trace::X_TRACE_ID;
use crate::state::AppState;

const TOKEN: &str = "mock-token";

fn test_config() -> Config {
    Config {
        enable_swagger: false,
        stream_chunk_delay: Duration::ZERO,
        processing_delay: Duration::from_secs(3600),
        ..Config::default()
    }
}

fn app_with(config: Config) -> Router {
    build(Arc::new(AppState::new(config)))
}

fn app() -> Router {
    app_with(test_config())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder().method(method).uri(uri).body(Body::empty()).unwrap()
}

fn with_token(mut req: Request<Body>, token: &str) -> Request<Body> {
    req.headers_mut()
        .insert(header::AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    req
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_agent(app: &Router, name: &str) -> String {
    let (status, body) = send(app, json_request("POST", "/api/agents", json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["id"].as_str().unwrap().to_owned()
}

fn multipart_upload(uri: &str, file: Option<(&str, &[u8])>, chunk_size: Option<&str>) -> Request<Body> {
    const BOUNDARY: &str = "agentdesk-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    if let Some((name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                 Content-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    if let Some(chunk_size) = chunk_size {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"chunkSize\"\r\n\r\n{chunk_size}\r\n")
                .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

// ── envelope & middleware ─────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_not_enveloped() {
    let (status, body) = send(&app(), empty_request("GET", "/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body.get("code").is_none());
}

#[tokio::test]
async fn trace_id_is_echoed_or_generated() {
    let app = app();
    let supplied = "7f1c3f0e-6a53-4e43-9a35-1f4f1f2b8c11";
    let mut req = empty_request("GET", "/health");
    req.headers_mut().insert(X_TRACE_ID, supplied.parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.headers()[X_TRACE_ID], supplied);

    let response = app.oneshot(empty_request("GET", "/health")).await.unwrap();
    assert!(response.headers().contains_key(X_TRACE_ID));
}

#[tokio::test]
async fn malformed_json_is_a_400_envelope() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/agents")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn unknown_resource_is_a_404_envelope() {
    let (status, body) = send(&app(), empty_request("GET", "/api/agents/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
    assert_eq!(body["message"], "agent nope not found");
}

// ── auth ──────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn login_returns_the_shared_token() {
    let req = json_request("POST", "/api/auth/login", json!({ "username": "admin", "password": "x" }));
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["message"], "success");
    assert_eq!(body["data"]["token"], TOKEN);
    assert_eq!(body["data"]["userId"], 1);
}

#[tokio::test]
async fn profile_requires_a_matching_token() {
    let app = app();

    let (status, body) = send(&app, empty_request("GET", "/api/v1/user/profile")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "not logged in");

    let (status, body) = send(&app, with_token(empty_request("GET", "/api/v1/user/profile"), "wrong")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "invalid token");

    let (status, body) = send(&app, with_token(empty_request("GET", "/api/v1/user/profile"), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["username"], "admin");
}

#[tokio::test]
async fn profile_update_delete_and_menus() {
    let app = app();
    let req = with_token(
        json_request("PUT", "/api/v1/user/profile", json!({ "nickname": "Ops" })),
        TOKEN,
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nickname"], "Ops");

    let (_, body) = send(&app, with_token(empty_request("DELETE", "/api/v1/user/profile"), TOKEN)).await;
    assert_eq!(body["data"]["deleted"], true);
    let (_, body) = send(&app, with_token(empty_request("GET", "/api/v1/user/profile"), TOKEN)).await;
    assert_eq!(body["data"]["nickname"], "Ops");

    for path in ["/api/menus", "/api/v1/menus"] {
        let (status, body) = send(&app, with_token(empty_request("GET", path), TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["title"], "Home");
    }
}

#[tokio::test]
async fn resource_routes_are_open_unless_guarded() {
    let (status, _) = send(&app(), empty_request("GET", "/api/agents")).await;
    assert_eq!(status, StatusCode::OK);

    let guarded = app_with(Config {
        guard_resources: true,
        ..test_config()
    });
    let (status, _) = send(&guarded, empty_request("GET", "/api/agents")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&guarded, with_token(empty_request("GET", "/api/agents"), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&guarded, json_request("POST", "/api/auth/login", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
}

// ── agents ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn agent_lifecycle_through_workflow_save() {
    let app = app();
    let id = create_agent(&app, "A").await;

    let (_, body) = send(&app, empty_request("GET", &format!("/api/agents/{id}"))).await;
    assert_eq!(body["data"]["status"], "draft");

    let (status, body) = send(&app, empty_request("POST", &format!("/api/agents/{id}/publish"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "published");

    let (_, body) = send(&app, json_request("POST", "/api/workflows", json!({ "name": "W" }))).await;
    let wf = body["data"]["id"].as_str().unwrap().to_owned();
    let req = json_request("POST", &format!("/api/workflows/{wf}/save"), json!({ "agentIds": [id] }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["agentIds"], json!([id]));

    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/agents/{id}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, empty_request("GET", &format!("/api/agents/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_without_name_is_rejected() {
    let (status, body) = send(&app(), json_request("POST", "/api/agents", json!({ "model": "m" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn list_pages_newest_first() {
    let app = app();
    for name in ["one", "two", "three"] {
        create_agent(&app, name).await;
    }
    let (status, body) = send(&app, empty_request("GET", "/api/agents?page=2&pageSize=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["items"][0]["name"], "two");

    let (status, _) = send(&app, empty_request("GET", "/api/agents?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, empty_request("GET", "/api/agents?page=abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn json_chat_records_history() {
    let app = app();
    let id = create_agent(&app, "chatty").await;
    let req = json_request("POST", &format!("/api/agents/{id}/chat"), json!({ "message": "hello" }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "assistant");
    assert!(body["data"]["content"].as_str().unwrap().ends_with("reply: hello"));

    let (_, body) = send(&app, empty_request("GET", &format!("/api/agents/{id}/chat/messages"))).await;
    let history = body["data"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["role"], "user");
    assert_eq!(history[1]["role"], "assistant");

    let (_, body) = send(&app, empty_request("GET", &format!("/api/agents/{id}/chat/messages?limit=0"))).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn streamed_chat_matches_json_reply() {
    let app = app();
    let id = create_agent(&app, "streamer").await;

    let req = json_request("POST", &format!("/api/agents/{id}/chat"), json!({ "message": "stream me please" }));
    let (_, body) = send(&app, req).await;
    let expected = body["data"]["content"].as_str().unwrap().to_owned();

    let req = json_request("POST", &format!("/api/agents/{id}/chat/stream"), json!({ "message": "stream me please" }));
    let response = app.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    let outcome = collect_stream(response.into_body().into_data_stream()).await.unwrap();
    assert!(outcome.is_complete());
    assert_eq!(outcome.text(), expected);
}

#[tokio::test]
async fn chat_switches_to_sse_on_accept_or_flag() {
    let app = app();
    let id = create_agent(&app, "both").await;

    let mut req = json_request("POST", &format!("/api/agents/{id}/chat"), json!({ "message": "hi" }));
    req.headers_mut().insert(header::ACCEPT, "text/event-stream".parse().unwrap());
    let response = app.clone().oneshot(req).await.unwrap();
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let req = json_request("POST", &format!("/api/agents/{id}/chat"), json!({ "message": "hi", "stream": true }));
    let response = app.oneshot(req).await.unwrap();
    let outcome = collect_stream(response.into_body().into_data_stream()).await.unwrap();
    assert!(outcome.is_complete());
    assert!(outcome.text().ends_with("reply: hi"));
}

#[tokio::test]
async fn chat_without_a_body_uses_defaults() {
    let app = app();
    let id = create_agent(&app, "quiet").await;

    let (status, body) = send(&app, empty_request("POST", &format!("/api/agents/{id}/chat"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "assistant");

    let response = app
        .clone()
        .oneshot(empty_request("POST", &format!("/api/agents/{id}/chat/stream")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = collect_stream(response.into_body().into_data_stream()).await.unwrap();
    assert!(outcome.is_complete());

    let req = json_request("POST", &format!("/api/agents/{id}/chat"), json!("not an object"));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn chat_with_unknown_agent_is_not_streamed() {
    let req = json_request("POST", "/api/agents/ghost/chat/stream", json!({ "message": "hi" }));
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

// ── sessions ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sessions_are_gated_and_default_named() {
    let app = app();
    let id = create_agent(&app, "host").await;
    let path = format!("/api/agents/{id}/sessions");

    let (status, _) = send(&app, empty_request("GET", &path)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, with_token(empty_request("POST", &path), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "New session");
    let sid = body["data"]["id"].as_str().unwrap().to_owned();

    let req = with_token(json_request("PUT", &format!("{path}/{sid}"), json!({ "name": "Renamed" })), TOKEN);
    let (_, body) = send(&app, req).await;
    assert_eq!(body["data"]["name"], "Renamed");

    let req = with_token(json_request("PUT", &format!("{path}/{sid}"), json!({ "name": "  " })), TOKEN);
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, with_token(empty_request("GET", &path), TOKEN)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, with_token(empty_request("DELETE", &format!("{path}/{sid}")), TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
}

// ── knowledge bases ───────────────────────────────────────────────────────────

#[tokio::test]
async fn multipart_upload_updates_counters() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "Docs" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");

    let content = vec![b'x'; 1200];
    let (status, body) = send(&app, multipart_upload(&docs, Some(("guide.txt", content.as_slice())), Some("500"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "guide.txt");
    assert_eq!(body["data"]["size"], 1200);
    assert_eq!(body["data"]["chunkCount"], 3);
    assert_eq!(body["data"]["status"], "pending");
    let doc = body["data"]["id"].as_str().unwrap().to_owned();

    let (_, body) = send(&app, empty_request("GET", &format!("/api/knowledge-bases/{kb}"))).await;
    assert_eq!(body["data"]["documentCount"], 1);
    assert_eq!(body["data"]["chunkCount"], 3);
    assert_eq!(body["data"]["totalSize"], 1200);

    let (_, body) = send(&app, empty_request("GET", &docs)).await;
    assert_eq!(body["data"]["total"], 1);

    let (status, _) = send(&app, empty_request("DELETE", &format!("{docs}/{doc}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, empty_request("GET", &format!("/api/knowledge-bases/{kb}"))).await;
    assert_eq!(body["data"]["documentCount"], 0);
    assert_eq!(body["data"]["totalSize"], 0);
}

#[tokio::test]
async fn upload_rejects_missing_file_and_bad_chunk_size() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "Docs" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");

    let (status, body) = send(&app, multipart_upload(&docs, None, Some("500"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "file is required");

    let (status, _) = send(&app, multipart_upload(&docs, Some(("a.txt", b"abc".as_slice())), Some("lots"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, multipart_upload(&docs, Some(("a.txt", b"abc".as_slice())), Some("0"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, multipart_upload("/api/knowledge-bases/none/documents", Some(("a.txt", b"abc".as_slice())), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_past_the_axum_default_limit_are_streamed() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "Big" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");

    let content = vec![b'x'; 3 * 1024 * 1024];
    let (status, body) = send(&app, multipart_upload(&docs, Some(("big.bin", content.as_slice())), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["size"], 3_145_728);

    let (_, body) = send(&app, empty_request("GET", "/health")).await;
    assert_eq!(body["pendingDocuments"], 1);
}

#[tokio::test]
async fn uploads_over_the_configured_limit_are_413() {
    let app = app_with(Config { max_upload_bytes: 1024, ..test_config() });
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "Small" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");

    let content = vec![b'x'; 4096];
    let (status, body) = send(&app, multipart_upload(&docs, Some(("big.bin", content.as_slice())), None)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], 413);

    let (status, _) = send(&app, multipart_upload(&docs, Some(("ok.txt", b"abc".as_slice())), None)).await;
    assert_eq!(status, StatusCode::OK);
    // JSON routes keep axum's default limit.
    let (status, _) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "x".repeat(2048) }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_a_knowledge_base_removes_its_documents() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "Tmp" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");
    send(&app, multipart_upload(&docs, Some(("a.txt", b"abc".as_slice())), None)).await;

    let (status, _) = send(&app, empty_request("DELETE", &format!("/api/knowledge-bases/{kb}"))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, empty_request("GET", &docs)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn search_validates_and_ranks() {
    let app = app();
    let (_, body) = send(&app, json_request("POST", "/api/knowledge-bases", json!({ "name": "S" }))).await;
    let kb = body["data"]["id"].as_str().unwrap().to_owned();
    let docs = format!("/api/knowledge-bases/{kb}/documents");
    for name in ["a.txt", "b.txt", "c.txt"] {
        send(&app, multipart_upload(&docs, Some((name, b"content".as_slice())), None)).await;
    }
    let search = format!("/api/knowledge-bases/{kb}/search");

    let (status, _) = send(&app, json_request("POST", &search, json!({ "query": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, json_request("POST", &search, json!({ "query": "refund", "topK": 2 }))).await;
    assert_eq!(status, StatusCode::OK);
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0]["score"].as_f64().unwrap() >= results[1]["score"].as_f64().unwrap());
}

// ── workflows ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn workflow_save_rejects_unpublished_agents_and_executes_chain() {
    let app = app();
    let draft = create_agent(&app, "draft").await;
    let published = create_agent(&app, "live").await;
    send(&app, empty_request("POST", &format!("/api/agents/{published}/publish"))).await;

    let (_, body) = send(&app, json_request("POST", "/api/workflows", json!({ "name": "Flow" }))).await;
    let wf = body["data"]["id"].as_str().unwrap().to_owned();

    let req = json_request("POST", &format!("/api/workflows/{wf}/save"), json!({ "agentIds": [published, draft] }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains(&draft));
    let (_, body) = send(&app, empty_request("GET", &format!("/api/workflows/{wf}"))).await;
    assert_eq!(body["data"]["agentIds"], json!([]));

    let req = json_request("POST", &format!("/api/workflows/{wf}/save"), json!({ "agentIds": "nope" }));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = json_request("POST", &format!("/api/workflows/{wf}/save"), json!({ "agentIds": [published] }));
    send(&app, req).await;
    let req = json_request("POST", &format!("/api/workflows/{wf}/execute"), json!({ "input": "go" }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["nodeResults"].as_array().unwrap().len(), 1);
    assert!(!body["data"]["sessionId"].as_str().unwrap().is_empty());
    assert_eq!(body["data"]["output"], body["data"]["nodeResults"][0]["output"]);
}

// ── plugins ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn plugin_must_pass_test_before_enable_and_publish() {
    let app = app();
    let req = json_request(
        "POST",
        "/api/plugins",
        json!({ "name": "Weather", "tools": [{ "name": "forecast", "description": "", "method": "GET", "path": "/f" }] }),
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_owned();

    let (status, _) = send(&app, empty_request("POST", &format!("/api/plugins/{id}/toggle?enable=true"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, empty_request("POST", &format!("/api/plugins/{id}/publish"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = json_request(
        "POST",
        "/api/plugins/test",
        json!({ "pluginId": id, "toolName": "forecast", "inputs": { "city": "Oslo" } }),
    );
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["success"], true);
    assert_eq!(body["data"]["output"]["inputs"]["city"], "Oslo");

    let (_, body) = send(&app, empty_request("POST", &format!("/api/plugins/{id}/toggle?enable=true"))).await;
    assert_eq!(body["data"]["enabled"], true);
    let (status, body) = send(&app, empty_request("POST", &format!("/api/plugins/{id}/publish"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["publishStatus"], "published");

    let (status, _) = send(&app, empty_request("POST", &format!("/api/plugins/{id}/toggle"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn plugin_template_import_and_published_names() {
    let app = app();
    let template = json!({
        "openapi": "3.0.0",
        "info": { "title": "Weather", "description": "Forecasts", "version": "2.0.0" },
        "servers": [{ "url": "https://weather.example.com" }],
        "paths": { "/forecast": { "get": { "operationId": "forecast" } } }
    })
    .to_string();
    let req = multipart_upload("/api/plugins/import", Some(("weather.json", template.as_bytes())), None);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Weather");
    assert_eq!(body["data"]["pluginUrl"], "https://weather.example.com");
    assert_eq!(body["data"]["tools"][0]["name"], "forecast");
    assert_eq!(body["data"]["tools"][0]["method"], "GET");

    let (_, body) = send(&app, empty_request("GET", "/api/plugins")).await;
    assert_eq!(body["data"]["total"], 0);

    let req = multipart_upload("/api/plugins/import", Some(("bad.json", b"{ not json".as_slice())), None);
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("invalid plugin template"));
    let (status, body) = send(&app, multipart_upload("/api/plugins/import", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "file is required");

    let (_, body) = send(&app, json_request("POST", "/api/plugins", json!({ "name": "Weather" }))).await;
    let id = body["data"]["id"].as_str().unwrap().to_owned();
    send(&app, json_request("POST", "/api/plugins", json!({ "name": "Draft" }))).await;
    let (status, body) = send(&app, empty_request("GET", "/api/plugins/getlist")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    send(&app, json_request("POST", "/api/plugins/test", json!({ "pluginId": id }))).await;
    send(&app, empty_request("POST", &format!("/api/plugins/{id}/toggle?enable=true"))).await;
    send(&app, empty_request("POST", &format!("/api/plugins/{id}/publish"))).await;
    let (_, body) = send(&app, empty_request("GET", "/api/plugins/getlist")).await;
    assert_eq!(body["data"], json!(["Weather"]));
}
