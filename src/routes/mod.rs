//! Router: `/ws`, the JSON API under `/api/v1`, and the SPA bundle as fallback.

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Frontend bundle directory, `STATIC_DIR` or `./static`.
fn static_dir() -> String {
    std::env::var("STATIC_DIR").unwrap_or_else(|_| "./static".into())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(http::http_health))
        .route("/roles", get(http::http_get_roles))
        .route("/session", post(http::http_create_session))
        .route("/session/:id", get(http::http_get_session).delete(http::http_delete_session))
        .route("/session/:id/action", post(http::http_post_action))
}

/// One WebSocket session per connection; HTTP sessions live until deleted or idle.
/// Any origin may call the API, limited to the methods it actually serves.
pub fn build_router(state: Arc<AppState>) -> Router {
    let dir = static_dir();
    let frontend = ServeDir::new(&dir)
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new(format!("{dir}/index.html")));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(cors)
        .layer(trace)
        .fallback_service(frontend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::catalog::Catalog;
    use crate::generation::testing::{client, feedback_json, scenario_json, ScriptedBackend};

    fn app(backend: Arc<ScriptedBackend>) -> Router {
        build_router(Arc::new(AppState::with_parts(Catalog::default(), client(backend))))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_and_roles() {
        let app = app(ScriptedBackend::new(vec![]));
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "generation": "scripted" }));

        let (_, roles) = call(&app, Method::GET, "/api/v1/roles", None).await;
        assert_eq!(roles.as_array().map(Vec::len), Some(6));
        assert_eq!(roles[1]["id"], "frontend-developer");
        assert_eq!(roles[1]["longDescription"].as_str().map(|s| !s.is_empty()), Some(true));
    }

    #[tokio::test]
    async fn full_challenge_flow_over_http() {
        let backend = ScriptedBackend::new(vec![Ok(scenario_json()), Ok(feedback_json())]);
        let app = app(backend.clone());

        let (status, created) = call(&app, Method::POST, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["session"]["authenticated"], false);
        let id = created["sessionId"].as_str().unwrap().to_string();
        let action = format!("/api/v1/session/{id}/action");

        call(&app, Method::POST, &action, Some(json!({ "type": "login" }))).await;
        let (_, s) = call(&app, Method::POST, &action,
            Some(json!({ "type": "select_role", "roleId": "frontend-developer" }))).await;
        assert_eq!(s["view"]["name"], "roleDetail");

        let (_, s) = call(&app, Method::POST, &action,
            Some(json!({ "type": "start_challenge", "prompt": "Build a reusable Star Rating component" }))).await;
        assert_eq!(s["view"]["name"], "briefing");
        assert_eq!(s["view"]["scenario"]["companyName"], "Starboard Labs");
        assert_eq!(s["loading"], Value::Null);

        call(&app, Method::POST, &action, Some(json!({ "type": "begin_simulation" }))).await;
        let (_, s) = call(&app, Method::POST, &action,
            Some(json!({ "type": "submit_simulation", "text": "export function StarRating() {}" }))).await;
        assert_eq!(s["view"]["name"], "debrief");
        assert_eq!(s["challengeHistory"].as_array().map(Vec::len), Some(1));
        assert_eq!(backend.call_count(), 2);

        let resource = s["view"]["feedback"]["learningKit"][0].clone();
        let (_, s) = call(&app, Method::POST, &action, Some(json!({ "type": "save_resource", "resource": resource }))).await;
        assert_eq!(s["savedResources"].as_array().map(Vec::len), Some(1));

        let (_, s) = call(&app, Method::POST, &action, Some(json!({ "type": "navigate", "view": "profile" }))).await;
        assert_eq!(s["view"]["name"], "profile");
        assert_eq!(s["profile"]["completedChallenges"], 1);

        let (status, _) = call(&app, Method::GET, &format!("/api/v1/session/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn generation_failure_is_reported_in_the_snapshot() {
        let backend = ScriptedBackend::new(vec![Ok("not json".into())]);
        let app = app(backend);
        let (_, created) = call(&app, Method::POST, "/api/v1/session", None).await;
        let action = format!("/api/v1/session/{}/action", created["sessionId"].as_str().unwrap());

        call(&app, Method::POST, &action, Some(json!({ "type": "login" }))).await;
        call(&app, Method::POST, &action, Some(json!({ "type": "select_role", "roleId": "ux-designer" }))).await;
        let (status, s) = call(&app, Method::POST, &action,
            Some(json!({ "type": "start_challenge", "prompt": "Audit accessibility" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(s["view"]["name"], "roleDetail");
        assert_eq!(s["error"], "Failed to generate a scenario. Please try again.");
    }

    #[tokio::test]
    async fn unknown_and_deleted_sessions_are_404() {
        let app = app(ScriptedBackend::new(vec![]));
        let (status, body) = call(&app, Method::GET, "/api/v1/session/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "UNKNOWN_SESSION");

        let (_, created) = call(&app, Method::POST, "/api/v1/session", None).await;
        let uri = format!("/api/v1/session/{}", created["sessionId"].as_str().unwrap());
        let (status, _) = call(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_creation_is_refused_at_the_limit() {
        let state = AppState::with_parts(Catalog::default(), client(ScriptedBackend::new(vec![])))
            .with_limits(crate::state::SessionLimits { idle_ttl: std::time::Duration::from_secs(600), max_live: 1 });
        let app = build_router(Arc::new(state));

        let (status, _) = call(&app, Method::POST, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(&app, Method::POST, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "SESSION_LIMIT");
    }
}
