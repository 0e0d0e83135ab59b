//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full
//! axum router, backed by a fake [`PinBackend`] so scenario tests don't
//! depend on a real IPFS node.

use axum::{
    body::Body,
    http::{self, Method, Request, Response},
    Router,
};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use http_body_util::BodyExt;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use pin_server::api::{create_router, AppState};
use pin_server::auth::hash_token;
use pin_server::backend::{BackendError, Identity, PinAddEvent, PinBackend};
use pin_server::config::Config;
use pin_server::db;
use pin_server::pin::{PinHandler, PinQueue};

/// A backend that succeeds immediately, with no actual network traffic.
/// Scenario tests that need to observe an in-flight job (supersession)
/// use [`BlockingFakeBackend`] instead.
#[derive(Debug, Default)]
pub struct ImmediateFakeBackend;

impl PinBackend for ImmediateFakeBackend {
    fn identify(&self) -> BoxFuture<'_, Result<Identity, BackendError>> {
        Box::pin(async { Ok(Identity::default()) })
    }

    fn connect_peer(&self, _multiaddr: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }

    fn pin_add(&self, _cid: &str) -> BoxFuture<'_, Result<BoxStream<'static, PinAddEvent>, BackendError>> {
        use futures::StreamExt;
        Box::pin(async { Ok(futures::stream::empty().boxed()) })
    }

    fn pin_update(
        &self,
        _old_cid: &str,
        _new_cid: &str,
        _unpin_old: bool,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }

    fn pin_remove(&self, _cid: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        Box::pin(async { Ok(()) })
    }
}

/// A test application wrapping the full axum router over a real database.
pub struct TestApp {
    pub router: Router,
    pub pool: PgPool,
}

impl TestApp {
    /// Build a test app around an already-migrated pool (as handed out by
    /// `#[sqlx::test]`), wired to an [`ImmediateFakeBackend`].
    pub async fn new(pool: PgPool) -> Self {
        let config = Config::default_for_test();
        let backend: Arc<dyn PinBackend> = Arc::new(ImmediateFakeBackend);
        let queue = PinQueue::start(pool.clone(), Arc::clone(&backend))
            .await
            .expect("failed to start pin queue");
        let handler = PinHandler::new(pool.clone(), backend, queue);
        let state = AppState::new(pool.clone(), config, handler);
        let router = create_router(state);

        Self { router, pool }
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Create a test user with a known bearer token, returning `(user_id, raw_token)`.
pub async fn create_test_user_with_token(pool: &PgPool, name: &str) -> (Uuid, String) {
    let user = db::create_user(pool, name)
        .await
        .expect("failed to create test user");
    let raw_token = format!("test-token-{}", Uuid::new_v4());
    let hash = hash_token(&raw_token);
    db::create_token(pool, user.id, &hash)
        .await
        .expect("failed to create test token");
    (user.id, raw_token)
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
