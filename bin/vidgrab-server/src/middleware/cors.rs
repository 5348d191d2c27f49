use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::middleware::trace::X_TRACE_ID;
use crate::state::AppState;

pub fn cors_layer(state: &Arc<AppState>) -> CorsLayer {
    let trace_id = HeaderName::from_static(X_TRACE_ID);
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, trace_id.clone()])
        .expose_headers([header::CONTENT_DISPOSITION, trace_id]);

    let Some(origins_str) = &state.config.cors_allowed_origins else {
        // Wildcard – suitable for development; set VIDGRAB_CORS_ORIGINS in production.
        return base.allow_origin(Any);
    };

    // Parse the comma-separated origin list and build a restrictive layer.
    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %s, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        base.allow_origin(Any)
    } else {
        base.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use axum::body::Body;
    use axum::http::header::{
        ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_EXPOSE_HEADERS,
        ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
    };
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    fn app(origins: Option<&str>) -> Router {
        let state = Arc::new(AppState::from_config(Config {
            cors_allowed_origins: origins.map(str::to_owned),
            ..Config::default()
        }));
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(cors_layer(&state))
    }

    fn header_str(resp: &axum::response::Response, name: HeaderName) -> String {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    #[tokio::test]
    async fn allowlisted_origin_is_echoed_with_exposed_headers() {
        let req = Request::get("/ping")
            .header(ORIGIN, "http://b.test")
            .body(Body::empty())
            .unwrap();
        let resp = app(Some("http://a.test, http://b.test")).oneshot(req).await.unwrap();

        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "http://b.test");
        let exposed = header_str(&resp, ACCESS_CONTROL_EXPOSE_HEADERS);
        assert!(exposed.contains("content-disposition"));
        assert!(exposed.contains(X_TRACE_ID));
    }

    #[tokio::test]
    async fn unlisted_origin_is_not_allowed() {
        let req = Request::get("/ping")
            .header(ORIGIN, "http://evil.test")
            .body(Body::empty())
            .unwrap();
        let resp = app(Some("http://a.test")).oneshot(req).await.unwrap();
        assert!(resp.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn invalid_allowlist_falls_back_to_any_origin() {
        let req = Request::get("/ping")
            .header(ORIGIN, "http://a.test")
            .body(Body::empty())
            .unwrap();
        let resp = app(Some(" , ")).oneshot(req).await.unwrap();
        assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn preflight_allows_trace_id_but_not_authorization() {
        let req = Request::options("/ping")
            .header(ORIGIN, "http://a.test")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-trace-id")
            .body(Body::empty())
            .unwrap();
        let resp = app(None).oneshot(req).await.unwrap();

        let allowed = header_str(&resp, ACCESS_CONTROL_ALLOW_HEADERS);
        assert!(allowed.contains(X_TRACE_ID));
        assert!(allowed.contains("content-type"));
        assert!(!allowed.contains("authorization"));
    }
}
