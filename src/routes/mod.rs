//! Router assembly: HTTP endpoints, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
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

/// Build the application router with:
/// - REST API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers)
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/characters", get(http::http_list_characters))
        .route("/api/v1/characters/:id", get(http::http_get_character))
        .route("/api/v1/conversations", post(http::http_create_conversation))
        .route("/api/v1/conversations/:id", get(http::http_get_conversation))
        .route("/api/v1/conversations/:id/messages", post(http::http_post_message))
        .route("/api/v1/translate", post(http::http_post_translate))
        .route("/api/v1/users/:id", get(http::http_get_user))
        .route("/api/v1/users/:id/achievements", get(http::http_get_user_achievements))
        .route("/api/v1/users/:id/conversations", get(http::http_get_user_conversations))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AgentConfig;
    use crate::engine::tests::{eval, seeded_store, ScriptedOracle};
    use crate::error::OracleError;
    use crate::translate::PhraseTranslator;

    async fn app_with(oracle: ScriptedOracle) -> Router {
        let translator = Arc::new(PhraseTranslator::new().unwrap());
        let state = AppState::with_parts(seeded_store().await, Arc::new(oracle), translator, AgentConfig::default());
        build_router(Arc::new(state))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let req = Request::builder().method(method).uri(uri);
        let req = match body {
            Some(b) => req
                .header("content-type", "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, v)
    }

    #[tokio::test]
    async fn health_and_characters() {
        let app = app_with(ScriptedOracle::default()).await;
        let (s, v) = call(&app, "GET", "/api/v1/health", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["ok"], true);
        assert_eq!(v["oracle"], "scripted");

        let (s, v) = call(&app, "GET", "/api/v1/characters", None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["characters"].as_array().unwrap().len(), 3);
        assert!(v["characters"][0]["persuasionResistance"].is_number());

        let (s, v) = call(&app, "GET", "/api/v1/characters/99", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
        assert!(v["message"].as_str().unwrap().contains("character"));
    }

    #[tokio::test]
    async fn full_round_over_http() {
        let app = app_with(ScriptedOracle::default()).await;
        let (s, v) = call(&app, "POST", "/api/v1/conversations", Some(json!({"characterId": 1, "difficulty": "beginner"}))).await;
        assert_eq!(s, StatusCode::OK);
        let id = v["conversation"]["id"].as_i64().unwrap();
        assert_eq!(v["conversation"]["progress"], 0);
        assert_eq!(v["conversation"]["title"], "Persuasion Challenge");

        let uri = format!("/api/v1/conversations/{}/messages", id);
        let (s, v) = call(&app, "POST", &uri, Some(json!({"content": "Mepɛ sɛ meka biribi", "tone": "formal"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["userMessage"]["sender"], "user");
        assert_eq!(v["userMessage"]["tone"], "formal");
        assert_eq!(v["aiMessage"]["sender"], "ai");
        assert_eq!(v["conversation"]["progress"], 1);
        assert_eq!(v["shouldEndConversation"], false);
        assert_eq!(v["achievement"]["type"], "conversation_starter");

        let (s, v) = call(&app, "GET", &format!("/api/v1/conversations/{}", id), None).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["messages"].as_array().unwrap().len(), 2);
        assert_eq!(v["character"]["id"], 1);

        let (_, v) = call(&app, "GET", "/api/v1/users/1", None).await;
        assert_eq!(v["user"]["totalXp"], 20);
        assert_eq!(v["stats"]["totalConversations"], 1);

        let (_, v) = call(&app, "GET", "/api/v1/users/1/achievements", None).await;
        assert_eq!(v["achievements"].as_array().unwrap().len(), 1);
        let (_, v) = call(&app, "GET", "/api/v1/users/1/conversations", None).await;
        assert_eq!(v["conversations"][0]["id"], id);
    }

    #[tokio::test]
    async fn bad_input_maps_to_client_errors() {
        let app = app_with(ScriptedOracle::default()).await;
        let (s, v) = call(&app, "POST", "/api/v1/conversations", Some(json!({"characterId": 1, "difficulty": "expert"}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert!(v["message"].as_str().unwrap().contains("expert"));

        let (s, _) = call(&app, "POST", "/api/v1/conversations", Some(json!({"characterId": 1, "difficulty": "beginner", "userId": 42}))).await;
        assert_eq!(s, StatusCode::NOT_FOUND);

        let (s, _) = call(&app, "POST", "/api/v1/conversations/7/messages", Some(json!({"content": "hello"}))).await;
        assert_eq!(s, StatusCode::NOT_FOUND);

        let (s, _) = call(&app, "POST", "/api/v1/translate", Some(json!({"text": "   "}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);

        let (s, _) = call(&app, "GET", "/api/v1/users/5", None).await;
        assert_eq!(s, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_bodies_answer_with_message_json() {
        let app = app_with(ScriptedOracle::default()).await;
        let (s, v) = call(&app, "POST", "/api/v1/conversations", Some(json!({"difficulty": "beginner"}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert!(v["message"].as_str().unwrap().contains("characterId"));

        let (s, v) = call(&app, "POST", "/api/v1/conversations/1/messages", Some(json!({"tone": "polite"}))).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert!(v["message"].as_str().unwrap().contains("content"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/translate")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(v["message"].is_string());

        let (s, v) = call(&app, "GET", "/api/v1/conversations/abc", None).await;
        assert_eq!(s, StatusCode::BAD_REQUEST);
        assert!(v["message"].is_string());
    }

    #[tokio::test]
    async fn oracle_failure_is_bad_gateway() {
        let oracle = ScriptedOracle::default();
        oracle.push(Err(OracleError::Decode("not json".into())));
        oracle.push(Ok(eval(3.0, 15.0, false)));
        let app = app_with(oracle).await;
        let (_, v) = call(&app, "POST", "/api/v1/conversations", Some(json!({"characterId": 2, "difficulty": "advanced"}))).await;
        let uri = format!("/api/v1/conversations/{}/messages", v["conversation"]["id"]);

        let (s, v) = call(&app, "POST", &uri, Some(json!({"content": "Ojekoo"}))).await;
        assert_eq!(s, StatusCode::BAD_GATEWAY);
        assert!(v["message"].is_string());

        let (s, v) = call(&app, "POST", &uri, Some(json!({"content": "Ojekoo"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["conversation"]["progress"], 1);
        assert_eq!(v["conversation"]["persuasionScore"], 3);
    }

    #[tokio::test]
    async fn translate_endpoint() {
        let app = app_with(ScriptedOracle::default()).await;
        let (s, v) = call(&app, "POST", "/api/v1/translate", Some(json!({"text": "Medaase"}))).await;
        assert_eq!(s, StatusCode::OK);
        assert_eq!(v["translation"]["originalText"], "Medaase");
        assert_eq!(v["translation"]["detectedLanguage"], "twi");
        assert_ne!(v["translation"]["translatedText"], "Medaase");
    }
}
