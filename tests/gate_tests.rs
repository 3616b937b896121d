//! Authorization gate integration tests: session first, bearer fallback, exact role sets

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use catalog_service::{
    auth::{jwt::TOKEN_TTL_HOURS, TokenCodec},
    models::{Principal, Role},
};
use chrono::{Duration, Utc};
use serde_json::json;

mod common;
use common::{
    bearer_request, cookie_request, create_test_app, json_request, plain_request, read_json,
    session_cookie, ADMIN_ONLY_URI,
};

#[tokio::test]
async fn test_no_credentials_is_unauthorized() {
    let app = create_test_app();

    let response = app.send(plain_request("GET", "/api/auth/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(response).await["error"]["code"], 401);

    let response = app.send(plain_request("GET", ADMIN_ONLY_URI)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_bearer_is_unauthorized() {
    let app = create_test_app();
    let principal = app.create_user("alice", "longenough1").await;

    let minted = Utc::now() - Duration::hours(TOKEN_TTL_HOURS) - Duration::minutes(1);
    let token = app.state.token_codec.issue_at(&principal, minted).unwrap();

    let response = app.send(bearer_request("GET", "/api/auth/me", &token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&response).is_none());
    assert_eq!(
        read_json(response).await["error"]["message"],
        "Invalid or expired token"
    );
}

#[tokio::test]
async fn test_bearer_signed_with_other_secret_is_unauthorized() {
    let app = create_test_app();
    let principal = app.create_user("alice", "longenough1").await;
    let forged = TokenCodec::new(b"someone-elses-secret-0123456789").issue(&principal).unwrap();

    let response = app.send(bearer_request("GET", "/api/auth/me", &forged)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_scheme_is_ignored() {
    let app = create_test_app();
    let principal = app.create_user("alice", "longenough1").await;
    let token = app.token_for(&principal);

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("Token {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_token_on_admin_route_is_forbidden() {
    let app = create_test_app();
    let principal = app.create_user("alice", "longenough1").await;
    let token = app.token_for(&principal);

    let response = app.send(bearer_request("GET", ADMIN_ONLY_URI, &token)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(read_json(response).await["error"]["message"], "Access denied");
}

#[tokio::test]
async fn test_admin_token_on_admin_route_succeeds() {
    let app = create_test_app();
    let admin = app.create_admin("admin", "password").await;
    assert_eq!(admin.role, Role::Admin);
    let token = app.token_for(&admin);

    let response = app.send(bearer_request("GET", ADMIN_ONLY_URI, &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["pong"], "admin");
}

#[tokio::test]
async fn test_admin_allowed_where_both_roles_listed() {
    let app = create_test_app();
    let admin = app.create_admin("admin", "password").await;
    let token = app.token_for(&admin);

    let response = app.send(bearer_request("GET", "/api/auth/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["role"], "ADMIN");
}

#[tokio::test]
async fn test_bearer_identity_is_promoted_into_session() {
    let app = create_test_app();
    let principal = app.create_user("alice", "longenough1").await;
    let token = app.token_for(&principal);

    let response = app.send(bearer_request("GET", "/api/auth/me", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).expect("promotion should issue a session cookie");

    // the cookie alone now authenticates
    let response = app.send(cookie_request("GET", "/api/auth/me", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    assert_eq!(read_json(response).await["username"], "alice");
}

#[tokio::test]
async fn test_session_is_consulted_before_bearer() {
    let app = create_test_app();
    app.create_user("alice", "longenough1").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/auth/login",
            json!({"username": "alice", "password": "longenough1"}),
        ))
        .await;
    let cookie = session_cookie(&response).unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/me")
        .header(header::COOKIE, &cookie)
        .header(header::AUTHORIZATION, "Bearer not-a-token")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_routes_skip_authentication() {
    let app = create_test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::from(
            json!({"username": "alice", "password": "longenough1"}).to_string(),
        ))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_session_cookie_is_replaced() {
    let app = create_test_app();
    app.create_user("alice", "longenough1").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, "SESSION_ID=made-up-by-the-client")
        .body(Body::from(
            json!({"username": "alice", "password": "longenough1"}).to_string(),
        ))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response).unwrap();
    assert_ne!(cookie, "SESSION_ID=made-up-by-the-client");
}

#[tokio::test]
async fn test_gate_publishes_identity_to_handlers() {
    let app = create_test_app();
    let admin: Principal = app.create_admin("root", "rootpassword").await;
    let token = app.token_for(&admin);

    let response = app.send(bearer_request("GET", ADMIN_ONLY_URI, &token)).await;
    assert_eq!(read_json(response).await["pong"], "root");
}
