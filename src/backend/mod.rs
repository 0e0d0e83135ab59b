//! Storage Backend Interface
//!
//! The abstract remote, asynchronous content-addressed store the queue
//! drives pin/unpin/update operations against. [`http`] provides the
//! concrete HTTP adapter; tests substitute an in-memory fake.

pub mod http;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use thiserror::Error;

pub use self::http::HttpPinBackend;

/// A single progress event from an in-flight `pin_add` operation.
#[derive(Debug, Clone)]
pub struct PinAddEvent {
    pub error: Option<String>,
}

/// Node identity and reachable addresses, used to populate `delegates`.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub id: String,
    pub addresses: Vec<String>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend reported failure: {0}")]
    Remote(String),
}

/// The asynchronous content-addressed store the queue drives on behalf of
/// pin records. All methods respect the caller's cancellation; the queue
/// relies on cancellation as its primary termination signal for superseded
/// jobs.
///
/// Methods return boxed futures rather than being declared `async fn` so
/// the trait stays object-safe: the queue and handler hold the backend as
/// `Arc<dyn PinBackend>`, swapped for an in-memory fake in tests.
pub trait PinBackend: Send + Sync + 'static {
    /// Node identity, used to populate `delegates` in handler responses.
    /// Failure here is non-fatal to callers.
    fn identify(&self) -> BoxFuture<'_, Result<Identity, BackendError>>;

    /// Best-effort hint to dial a peer. Invoked once per origin,
    /// out-of-band; failures are logged and otherwise ignored.
    fn connect_peer(&self, multiaddr: &str) -> BoxFuture<'_, Result<(), BackendError>>;

    /// Begin pinning `cid`, yielding a lazy, finite, non-restartable
    /// sequence of progress events. The stream closing cleanly indicates
    /// success; any event carrying a non-empty error indicates failure.
    fn pin_add(&self, cid: &str) -> BoxFuture<'_, Result<BoxStream<'static, PinAddEvent>, BackendError>>;

    /// Replace a pin's content. `unpin_old` requests the old CID also be
    /// released; the queue always calls this with `false` (invariant:
    /// superseded CIDs are not unpinned by the core).
    fn pin_update(
        &self,
        old_cid: &str,
        new_cid: &str,
        unpin_old: bool,
    ) -> BoxFuture<'_, Result<(), BackendError>>;

    /// Release a previously pinned CID.
    fn pin_remove(&self, cid: &str) -> BoxFuture<'_, Result<(), BackendError>>;
}
