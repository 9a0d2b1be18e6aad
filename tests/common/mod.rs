// Shared test helpers — not all items used by every test binary.
#![allow(unused)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use classline::config::Config;
use classline::gateway::{AppState, build_router};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::MockServer;

pub const BEARER: &str = "hook-secret";

/// A config wired to wiremock stand-ins for the two external gateways.
pub fn test_config(lms: &MockServer, graph: &MockServer) -> Config {
    let mut config = Config::default();
    config.server.bearer_token = BEARER.to_string();
    config.lms.base_url = lms.uri();
    config.lms.token = "lms-secret".to_string();
    config.whatsapp.graph_url = graph.uri();
    config.whatsapp.token = "wa-secret".to_string();
    config.portal.base_url = "https://pay.example.com".to_string();
    config
}

pub fn test_app(lms: &MockServer, graph: &MockServer) -> axum::Router {
    build_router(AppState::from_config(&test_config(lms, graph)))
}

/// POST a webhook body with valid auth; returns the status and parsed reply.
pub async fn post_webhook(app: axum::Router, body: &Value) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri("/wa")
        .header("Authorization", format!("Bearer {}", BEARER))
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub fn text_event(phone: &str, text: &str) -> Value {
    json!({
        "to": phone,
        "messages": [{ "type": "text", "text": { "body": text } }]
    })
}

pub fn button_reply_event(phone: &str, id: &str) -> Value {
    json!({
        "to": phone,
        "messages": [{
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": { "id": id, "title": "ignored" }
            }
        }]
    })
}

pub fn image_event(phone: &str, media_id: &str) -> Value {
    json!({
        "to": phone,
        "messages": [{
            "type": "image",
            "image": { "id": media_id, "mime_type": "image/jpeg" }
        }]
    })
}

pub fn document_event(phone: &str, media_id: &str, filename: &str) -> Value {
    json!({
        "to": phone,
        "messages": [{
            "type": "document",
            "document": {
                "id": media_id,
                "mime_type": "application/pdf",
                "filename": filename
            }
        }]
    })
}

/// Button ids of an interactive reply, in order.
pub fn button_ids(reply: &Value) -> Vec<String> {
    reply["interactive"]["action"]["buttons"]
        .as_array()
        .map(|buttons| {
            buttons
                .iter()
                .map(|b| b["reply"]["id"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn button_titles(reply: &Value) -> Vec<String> {
    reply["interactive"]["action"]["buttons"]
        .as_array()
        .map(|buttons| {
            buttons
                .iter()
                .map(|b| b["reply"]["title"].as_str().unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn menu_body(reply: &Value) -> &str {
    reply["interactive"]["body"]["text"].as_str().unwrap_or("")
}

pub fn student_json(id: &str, name: &str, account_id: &str, account_name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "payment_token": format!("tok-{}", id),
        "account": { "id": account_id, "name": account_name }
    })
}
