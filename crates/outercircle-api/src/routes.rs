use axum::{Json, Router, middleware, routing::{get, post}};
use serde_json::{Value, json};

use crate::middleware::require_admin;
use crate::state::AppState;
use crate::{admin, codes, messages};

/// All routes, without transport layers (CORS, tracing); the server adds those.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin/messages", get(admin::list_messages))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health))
        .route("/codes", post(codes::issue_code))
        .route("/codes/verify", post(codes::verify_code))
        .route("/messages", post(messages::submit_message))
        .route("/admin/login", post(admin::login))
        .merge(admin_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use outercircle_db::SqliteStore;
    use tower::ServiceExt;

    use crate::admin::AdminGate;
    use crate::codes::CodeFormat;
    use crate::service::DropService;
    use crate::state::AppStateInner;

    fn app(admin: AdminGate) -> Router {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let service = DropService::new(store, CodeFormat::default());
        router(AppStateInner::new(service, admin))
    }

    fn gated() -> AdminGate {
        AdminGate::new(Some("hunter2".into()), b"test-session-key".to_vec())
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_with(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn issue(app: &Router) -> String {
        let (status, body) = call(app, Request::post("/codes").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::CREATED);
        body["code"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = call(&app(AdminGate::disabled()), get_with("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn issued_code_verifies_and_unknown_does_not() {
        let app = app(AdminGate::disabled());
        let code = issue(&app).await;
        assert_eq!(code.len(), 4);

        let (status, body) = call(&app, post_json("/codes/verify", json!({ "code": code.to_lowercase() }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);
        assert_eq!(body["code"], code);

        let (_, body) = call(&app, post_json("/codes/verify", json!({ "code": "ZZZZ" }))).await;
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn submit_rejects_empty_and_unknown() {
        let app = app(AdminGate::disabled());
        let code = issue(&app).await;

        let (status, body) = call(&app, post_json("/messages", json!({ "code": code, "message": "" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message cannot be empty.");

        let (status, body) = call(&app, post_json("/messages", json!({ "code": "ZZZZ", "message": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid code. Please try again or get a new one.");

        let (_, listing) = call(&app, get_with("/admin/messages", None)).await;
        assert_eq!(listing, json!([]));
    }

    #[tokio::test]
    async fn unknown_fields_are_refused() {
        let app = app(AdminGate::disabled());
        let (status, body) = call(&app, post_json("/codes/verify", json!({ "code": "AAAA", "extra": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Malformed request body"));
    }

    #[tokio::test]
    async fn malformed_json_gets_error_envelope() {
        let app = app(AdminGate::disabled());
        let req = Request::builder()
            .method("POST")
            .uri("/messages")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let (status, body) = call(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn missing_or_null_message_is_empty() {
        let app = app(AdminGate::disabled());
        let code = issue(&app).await;

        for payload in [json!({ "code": code }), json!({ "code": code, "message": null })] {
            let (status, body) = call(&app, post_json("/messages", payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "Message cannot be empty.");
        }

        let (_, listing) = call(&app, get_with("/admin/messages", None)).await;
        assert_eq!(listing, json!([]));
    }

    #[tokio::test]
    async fn missing_code_is_invalid() {
        let app = app(AdminGate::disabled());
        let (status, body) = call(&app, post_json("/messages", json!({ "message": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid code. Please try again or get a new one.");

        let (status, body) = call(&app, post_json("/codes/verify", json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn messages_show_up_grouped_newest_first() {
        let app = app(AdminGate::disabled());
        let code = issue(&app).await;

        let (status, body) = call(
            &app,
            post_json(
                "/messages",
                json!({ "code": code, "message": "hello", "sensitivity": "high", "delivery": "gentle" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], code);
        assert_eq!(body["timestamp_utc"].as_str().unwrap().len(), "2024-01-01T00:00:00.000000Z".len());

        let (status, _) = call(&app, post_json("/messages", json!({ "code": code, "message": "again" }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, listing) = call(&app, get_with("/admin/messages", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing[0]["code"], code);
        assert_eq!(listing[0]["messages"][0]["message"], "again");
        assert_eq!(listing[0]["messages"][1]["message"], "hello");
        assert_eq!(listing[0]["messages"][1]["sensitivity"], "high");
        assert_eq!(listing[0]["messages"][1]["delivery"], "gentle");
    }

    #[tokio::test]
    async fn admin_listing_requires_session_when_gated() {
        let app = app(gated());

        let (status, _) = call(&app, get_with("/admin/messages", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, get_with("/admin/messages", Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, post_json("/admin/login", json!({ "password": "wrong" }))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = call(&app, post_json("/admin/login", json!({ "password": "hunter2" }))).await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, listing) = call(&app, get_with("/admin/messages", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listing, json!([]));
    }

    #[tokio::test]
    async fn admin_login_is_not_found_when_ungated() {
        let app = app(AdminGate::disabled());
        let (status, _) = call(&app, post_json("/admin/login", json!({ "password": "anything" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
