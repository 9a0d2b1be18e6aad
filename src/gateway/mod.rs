/// HTTP surface of the service.
///
/// One webhook route (`POST /wa`) plus two stateless maintenance transforms
/// and a health check. The webhook route never answers with a 5xx: the
/// messaging platform retries on anything but a 200, and a retried delivery
/// would duplicate user-visible side effects (receipt uploads especially).
/// The maintenance endpoints have no such retry contract and may fail
/// plainly.
use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::config::Config;
use crate::event::ConversationalEvent;
use crate::ingest::ReceiptIngestor;
use crate::lms::LmsClient;
use crate::media::MediaClient;
use crate::router::CommandRouter;

/// Shared state between HTTP handlers. Everything is constructed once at
/// startup from the config — no handler reaches into the environment.
#[derive(Clone)]
pub struct AppState {
    pub bearer_token: Arc<String>,
    pub router: Arc<CommandRouter>,
    pub ingestor: Arc<ReceiptIngestor>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        let lms = Arc::new(LmsClient::new(&config.lms));
        let media = MediaClient::new(&config.whatsapp, config.receipts.max_download_bytes);
        Self {
            bearer_token: Arc::new(config.server.bearer_token.clone()),
            router: Arc::new(CommandRouter::new(lms.clone(), config.portal.clone())),
            ingestor: Arc::new(ReceiptIngestor::new(lms, media, config.receipts.clone())),
        }
    }
}

/// Build the router. The health check stays outside the bearer wall.
pub fn build_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/wa", post(wa_handler))
        .route("/utils/decode", post(decode_handler))
        .route("/utils/hash", post(hash_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), bearer_auth))
        .with_state(state);

    Router::new()
        .route("/api/health", get(health_handler))
        .merge(protected)
}

/// Bearer middleware: missing/malformed header → 401, wrong token → 403.
/// Token comparison is constant-time.
async fn bearer_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "success": false,
                "message": "Missing or invalid Authorization header"
            })),
        )
            .into_response());
    };

    if !bool::from(token.as_bytes().ct_eq(state.bearer_token.as_bytes())) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({
                "success": false,
                "message": "Invalid bearer token"
            })),
        )
            .into_response());
    }

    Ok(next.run(req).await)
}

/// POST /wa — the webhook. Always 200: a structured reply for actionable
/// events, the channel's receipt sentinel for anything malformed.
async fn wa_handler(State(state): State<AppState>, body: String) -> Response {
    let Ok(value) = serde_json::from_str::<Value>(&body) else {
        debug!("webhook: non-JSON body, acking");
        return event_received();
    };
    let Some(event) = ConversationalEvent::from_webhook_body(&value) else {
        debug!("webhook: no well-formed messages array, acking");
        return event_received();
    };

    debug!("webhook: {:?} event from {}", event.kind, event.sender);
    let reply = if event.is_media() {
        state.ingestor.ingest(&event).await
    } else {
        state.router.route(&event).await
    };

    (StatusCode::OK, Json(reply)).into_response()
}

/// The ack the platform requires for events we don't process; anything else
/// triggers a redelivery storm.
fn event_received() -> Response {
    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}

/// POST /utils/decode — base64-decode the body and split it on `|`.
async fn decode_handler(body: String) -> Response {
    let decoded = match base64::engine::general_purpose::STANDARD.decode(body.trim()) {
        Ok(decoded) => decoded,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "message": format!("invalid base64: {}", e) })),
            )
                .into_response();
        }
    };
    let Ok(text) = String::from_utf8(decoded) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "decoded payload is not UTF-8" })),
        )
            .into_response();
    };

    let parts: Vec<&str> = text.split('|').collect();
    Json(json!({ "success": true, "parts": parts })).into_response()
}

/// POST /utils/hash — SHA-256 hex digest of the raw body.
async fn hash_handler(body: Bytes) -> Response {
    let digest = Sha256::digest(&body);
    Json(json!({ "success": true, "hash": hex::encode(digest) })).into_response()
}

/// GET /api/health — health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

/// Run the server until ctrl-c.
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<()> {
    let app = build_router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("classline listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests;
