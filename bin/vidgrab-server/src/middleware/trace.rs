//! Per-request trace ids and request/response logging.
//!
//! Response bodies are never buffered: `/api/download` streams media of
//! arbitrary size. Only small JSON request bodies are read for logging.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Request bodies at most this large (and JSON) are logged verbatim.
const MAX_LOGGED_BODY: usize = 1024;

pub async fn trace_middleware(req: Request<Body>, next: Next) -> Response {
    let start_time = Instant::now();

    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let mut req = log_small_json_body(req).await;

        let header_value = HeaderValue::from_str(&trace_id.to_string()).ok();
        if let Some(v) = &header_value {
            req.headers_mut().insert(X_TRACE_ID, v.clone());
        }

        let mut response = next.run(req).await;

        if let Some(v) = header_value {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            content_type = content_type(response.headers()),
            latency_ms = start_time.elapsed().as_millis(),
            "← response headers sent"
        );

        response
    }
    .instrument(span)
    .await
}

fn content_type(headers: &HeaderMap) -> &str {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Log a request body when it is declared JSON and small; otherwise leave
/// the body untouched.
async fn log_small_json_body(req: Request<Body>) -> Request<Body> {
    let is_json = content_type(req.headers()).contains("application/json");
    let small = declared_length(req.headers()).is_some_and(|n| n <= MAX_LOGGED_BODY);
    if !(is_json && small) {
        if let Some(len) = declared_length(req.headers()).filter(|n| *n > 0) {
            info!("request Body: [Skipped: Type={}, Size={}]", content_type(req.headers()), len);
        }
        return req;
    }

    let (parts, body) = req.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, "failed to read request body");
            Bytes::new()
        }
    };
    if let Ok(text) = std::str::from_utf8(&bytes) {
        info!("request Body: {}", text);
    }
    Request::from_parts(parts, Body::from(bytes))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::routing::post;
    use axum::Router;
    use tower::ServiceExt;
    use tracing_test::traced_test;

    fn app() -> Router {
        Router::new()
            .route("/echo", post(|body: String| async move { body }))
            .layer(axum::middleware::from_fn(trace_middleware))
    }

    #[tokio::test]
    async fn generates_trace_id_header() {
        let req = Request::post("/echo").body(Body::from("hi")).unwrap();
        let resp = app().oneshot(req).await.unwrap();
        let id = resp.headers().get(X_TRACE_ID).expect("trace id header");
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn echoes_incoming_trace_id() {
        let incoming = Uuid::new_v4().to_string();
        let req = Request::post("/echo")
            .header(X_TRACE_ID, &incoming)
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[X_TRACE_ID], incoming.as_str());
    }

    #[tokio::test]
    #[traced_test]
    async fn logged_json_body_is_still_delivered() {
        let json = r#"{"url":"https://youtu.be/x"}"#;
        let req = Request::post("/echo")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, json.len())
            .body(Body::from(json))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body, json.as_bytes());
        assert!(logs_contain("youtu.be/x"));
    }
}
