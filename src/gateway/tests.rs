use super::*;
use axum::body::Body;
use axum::http::Request;
use serde_json::json;
use tower::ServiceExt;

const TEST_TOKEN: &str = "test-token";

fn make_state() -> AppState {
    let mut config = Config::default();
    config.server.bearer_token = TEST_TOKEN.to_string();
    // Unroutable on purpose — these tests never reach the upstreams.
    config.lms.base_url = "http://127.0.0.1:9".to_string();
    config.whatsapp.graph_url = "http://127.0.0.1:9".to_string();
    AppState::from_config(&config)
}

fn post(uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(resp: axum::http::Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint_is_open() {
    let app = build_router(make_state());
    let req = Request::builder()
        .method("GET")
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], crate::VERSION);
}

#[tokio::test]
async fn test_missing_auth_header_is_401() {
    let app = build_router(make_state());
    let resp = app.oneshot(post("/wa", None, "{}")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Missing or invalid Authorization header");
}

#[tokio::test]
async fn test_non_bearer_auth_header_is_401() {
    let app = build_router(make_state());
    let resp = app
        .oneshot(post("/wa", Some("Basic dXNlcjpwdw=="), "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_token_is_403() {
    let app = build_router(make_state());
    let resp = app
        .oneshot(post("/wa", Some("Bearer wrong"), "{}"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let json = body_json(resp).await;
    assert_eq!(json["message"], "Invalid bearer token");
}

#[tokio::test]
async fn test_body_without_messages_acks_with_sentinel() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    let resp = app
        .oneshot(post("/wa", Some(&auth), r#"{ "to": "1555" }"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"EVENT_RECEIVED");
}

#[tokio::test]
async fn test_non_json_body_acks_with_sentinel() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    let resp = app
        .oneshot(post("/wa", Some(&auth), "not json at all"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"EVENT_RECEIVED");
}

#[tokio::test]
async fn test_unrecognized_text_returns_main_menu() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    let body = r#"{ "to": "1555", "messages": [{ "type": "text", "text": { "body": "hello" } }] }"#;
    let resp = app.oneshot(post("/wa", Some(&auth), body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let json = body_json(resp).await;
    assert_eq!(json["type"], "interactive");
    let buttons = json["interactive"]["action"]["buttons"].as_array().unwrap();
    let ids: Vec<&str> = buttons
        .iter()
        .map(|b| b["reply"]["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["cmd_zoom", "cmd_pay_fees"]);
}

#[tokio::test]
async fn test_decode_splits_payload() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    // base64("a|b|c")
    let resp = app
        .oneshot(post("/utils/decode", Some(&auth), "YXxifGM="))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["parts"], json!(["a", "b", "c"]));
}

#[tokio::test]
async fn test_decode_rejects_bad_base64() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    let resp = app
        .oneshot(post("/utils/decode", Some(&auth), "!!! not base64 !!!"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let json = body_json(resp).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_hash_returns_sha256_hex() {
    let app = build_router(make_state());
    let auth = format!("Bearer {}", TEST_TOKEN);
    let resp = app
        .oneshot(post("/utils/hash", Some(&auth), "hello"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(
        json["hash"],
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[tokio::test]
async fn test_maintenance_endpoints_behind_auth() {
    let app = build_router(make_state());
    let resp = app
        .clone()
        .oneshot(post("/utils/decode", None, "YXxi"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = app.oneshot(post("/utils/hash", None, "x")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
