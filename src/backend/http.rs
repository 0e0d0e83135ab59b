//! HTTP Adapter for the Storage Backend
//!
//! A thin client over the IPFS HTTP API: POSTs to `<base>/api/v0/{id,
//! pin/add, pin/update, pin/rm, swarm/connect}`, with `pin/add` consumed as
//! a stream of newline-delimited JSON progress objects.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;

use super::{BackendError, Identity, PinAddEvent, PinBackend};

/// Turn a raw byte stream into a lazy stream of parsed progress events,
/// splitting on newlines as chunks arrive. Each line is parsed
/// independently; a malformed line surfaces as an error event rather than
/// terminating the stream early.
fn ndjson_progress_stream<S>(byte_stream: S) -> BoxStream<'static, PinAddEvent>
where
    S: Stream<Item = reqwest::Result<bytes::Bytes>> + Send + 'static,
{
    let state = (Box::pin(byte_stream), BytesMut::new());
    futures::stream::unfold(state, |(mut inner, mut buf)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line = buf.split_to(pos);
                buf.advance(1);
                if line.is_empty() {
                    continue;
                }
                let event = match serde_json::from_slice::<PinAddProgress>(&line) {
                    Ok(progress) => PinAddEvent {
                        error: progress.error,
                    },
                    Err(e) => PinAddEvent {
                        error: Some(e.to_string()),
                    },
                };
                return Some((event, (inner, buf)));
            }

            match inner.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    return Some((
                        PinAddEvent {
                            error: Some(e.to_string()),
                        },
                        (inner, BytesMut::new()),
                    ))
                }
                None => {
                    if buf.is_empty() {
                        return None;
                    }
                    let line = std::mem::take(&mut buf);
                    let event = match serde_json::from_slice::<PinAddProgress>(&line) {
                        Ok(progress) => PinAddEvent {
                            error: progress.error,
                        },
                        Err(e) => PinAddEvent {
                            error: Some(e.to_string()),
                        },
                    };
                    return Some((event, (inner, buf)));
                }
            }
        }
    })
    .boxed()
}

/// Concrete [`PinBackend`] speaking the IPFS HTTP API.
#[derive(Debug, Clone)]
pub struct HttpPinBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPinBackend {
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("reqwest client builder with valid timeout");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v0/{path}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Addresses", default)]
    addresses: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PinAddProgress {
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

impl PinBackend for HttpPinBackend {
    fn identify(&self) -> BoxFuture<'_, Result<Identity, BackendError>> {
        Box::pin(async move {
            let resp = self
                .client
                .post(self.endpoint("id"))
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;

            let body: IdResponse = resp
                .json()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;

            Ok(Identity {
                id: body.id,
                addresses: body.addresses,
            })
        })
    }

    fn connect_peer(&self, multiaddr: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        let multiaddr = multiaddr.to_string();
        Box::pin(async move {
            self.client
                .post(self.endpoint("swarm/connect"))
                .query(&[("arg", multiaddr.as_str())])
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?
                .error_for_status()
                .map_err(|e| BackendError::Remote(e.to_string()))?;
            Ok(())
        })
    }

    fn pin_add(
        &self,
        cid: &str,
    ) -> BoxFuture<'_, Result<BoxStream<'static, PinAddEvent>, BackendError>> {
        let cid = cid.to_string();
        Box::pin(async move {
            let resp = self
                .client
                .post(self.endpoint("pin/add"))
                .query(&[("arg", cid.as_str()), ("progress", "true")])
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?;

            let byte_stream = resp.bytes_stream();
            Ok(ndjson_progress_stream(byte_stream))
        })
    }

    fn pin_update(
        &self,
        old_cid: &str,
        new_cid: &str,
        unpin_old: bool,
    ) -> BoxFuture<'_, Result<(), BackendError>> {
        let old_cid = old_cid.to_string();
        let new_cid = new_cid.to_string();
        Box::pin(async move {
            self.client
                .post(self.endpoint("pin/update"))
                .query(&[
                    ("arg", old_cid.as_str()),
                    ("arg", new_cid.as_str()),
                    ("unpin", if unpin_old { "true" } else { "false" }),
                ])
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?
                .error_for_status()
                .map_err(|e| BackendError::Remote(e.to_string()))?;
            Ok(())
        })
    }

    fn pin_remove(&self, cid: &str) -> BoxFuture<'_, Result<(), BackendError>> {
        let cid = cid.to_string();
        Box::pin(async move {
            self.client
                .post(self.endpoint("pin/rm"))
                .query(&[("arg", cid.as_str())])
                .send()
                .await
                .map_err(|e| BackendError::Request(e.to_string()))?
                .error_for_status()
                .map_err(|e| BackendError::Remote(e.to_string()))?;
            Ok(())
        })
    }
}
