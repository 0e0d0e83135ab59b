//! HTTP-level scenario tests for the pinning surface.

mod helpers;

use axum::body::Body;
use axum::http::{Method, StatusCode};
use serde_json::json;
use sqlx::PgPool;

use helpers::{body_to_json, create_test_user_with_token, TestApp};

/// S1: a well-formed `POST /pins` eventually settles as `pinned`, backed
/// by a fake backend that completes instantly.
#[sqlx::test]
async fn add_pin_then_poll_settles_as_pinned(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;
    let (_, token) = create_test_user_with_token(&pool, "alice").await;

    let request = TestApp::request(Method::POST, "/pins")
        .header("authorization", format!("Bearer {token}"))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"cid": "bafyaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"})
                .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let created = body_to_json(response).await;
    let request_id = created["requestid"].as_str().unwrap().to_string();

    // The dispatcher runs concurrently with the request that created the
    // job; poll briefly for it to reach a terminal state.
    let mut last_status = created["status"].as_str().unwrap().to_string();
    for _ in 0..50 {
        let get = TestApp::request(Method::GET, &format!("/pins/{request_id}"))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(get).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_to_json(response).await;
        last_status = body["status"].as_str().unwrap().to_string();
        if last_status == "pinned" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert_eq!(last_status, "pinned");
}

/// S3: a pin owned by one user is invisible to another — never a 403,
/// always a 404 (invariant 5).
#[sqlx::test]
async fn fetching_another_users_pin_returns_not_found(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;
    let (_, alice_token) = create_test_user_with_token(&pool, "alice").await;
    let (_, bob_token) = create_test_user_with_token(&pool, "bob").await;

    let create = TestApp::request(Method::POST, "/pins")
        .header("authorization", format!("Bearer {alice_token}"))
        .header("content-type", "application/json")
        .body(Body::from(json!({"cid": "bafybbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"}).to_string()))
        .unwrap();
    let created = body_to_json(app.oneshot(create).await).await;
    let request_id = created["requestid"].as_str().unwrap().to_string();

    let get = TestApp::request(Method::GET, &format!("/pins/{request_id}"))
        .header("authorization", format!("Bearer {bob_token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_to_json(response).await;
    assert_eq!(body["error"]["reason"], "NOT_FOUND");
}

/// S4: a malformed request ID (not valid hex) is rejected as a 400, not
/// treated as "not found".
#[sqlx::test]
async fn malformed_request_id_is_bad_request(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;
    let (_, token) = create_test_user_with_token(&pool, "alice").await;

    let get = TestApp::request(Method::GET, "/pins/not-a-hex-id")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(get).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_to_json(response).await;
    assert_eq!(body["error"]["reason"], "BAD_REQUEST");
}

/// S5: any request missing a bearer token is rejected before it reaches
/// the handler.
#[sqlx::test]
async fn missing_token_is_unauthorized(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;

    let request = TestApp::request(Method::GET, "/pins")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_to_json(response).await;
    assert_eq!(body["error"]["reason"], "UNAUTHORIZED");
}

/// An unknown bearer token is likewise unauthorized, not merely
/// unauthenticated-as-anonymous.
#[sqlx::test]
async fn unknown_token_is_unauthorized(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;

    let request = TestApp::request(Method::GET, "/pins")
        .header("authorization", "Bearer not-a-real-token")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Health endpoint requires no auth and reports database connectivity.
#[sqlx::test]
async fn health_endpoint_is_public(pool: PgPool) {
    let app = TestApp::new(pool.clone()).await;

    let request = TestApp::request(Method::GET, "/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], true);
}
