//! PinHandler
//!
//! The transactional bridge between HTTP requests and the Store/Queue:
//! authenticate, authorize, mutate the record and enqueue the resulting
//! job inside one transaction, then commit. Enqueue-before-commit is
//! deliberate — if the commit fails, the queued job finds no record and
//! treats it as a no-op; if enqueue fails, the transaction rolls back and
//! the caller sees an error.

use sqlx::PgPool;
use std::sync::Arc;
use tracing::warn;

use crate::auth::AuthUser;
use crate::backend::PinBackend;
use crate::db;
use crate::pin::error::ApiError;
use crate::pin::query::PinQuery;
use crate::pin::queue::{Job, PinQueue};
use crate::pin::wire::{decode_request_id, PinRequest, PinResults, PinStatus};

/// Implements the five pin operations consumed by the HTTP surface.
#[derive(Clone)]
pub struct PinHandler {
    pool: PgPool,
    backend: Arc<dyn PinBackend>,
    queue: PinQueue,
}

impl PinHandler {
    #[must_use]
    pub fn new(pool: PgPool, backend: Arc<dyn PinBackend>, queue: PinQueue) -> Self {
        Self {
            pool,
            backend,
            queue,
        }
    }

    /// List this user's pins matching `query`.
    pub async fn pins(&self, user: &AuthUser, query: &PinQuery) -> Result<PinResults, ApiError> {
        query.validate()?;
        let records = db::list_pins_for_owner(&self.pool, user.id).await?;
        let matched = query.apply(records);
        let results = matched
            .iter()
            .map(|record| PinStatus::from_record(record, Vec::new()))
            .collect::<Vec<_>>();
        Ok(PinResults {
            count: results.len(),
            results,
        })
    }

    /// Persist a new pin request and enqueue an Add job.
    pub async fn add_pin(&self, user: &AuthUser, req: PinRequest) -> Result<PinStatus, ApiError> {
        let name = non_empty_name(req.name)?;

        let mut tx = self.pool.begin().await?;
        let record = db::insert_pin(
            &mut *tx,
            user.id,
            &name,
            &req.cid,
            &req.origins,
            req.meta.as_ref(),
        )
        .await?;

        self.queue.submit(Job::Add(record.clone())).await;
        tx.commit().await?;

        let delegates = self.delegates().await;
        Ok(PinStatus::from_record(&record, delegates))
    }

    /// Look up a single pin by its client-facing request ID, scoped to the
    /// caller (invariant 5: cross-user lookups are NotFound, not Forbidden).
    pub async fn get_pin(&self, user: &AuthUser, request_id: &str) -> Result<PinStatus, ApiError> {
        let id = decode_request_id(request_id)?;
        let record = db::find_pin_for_owner(&self.pool, id, user.id)
            .await?
            .ok_or_else(|| ApiError::not_found("pin not found"))?;
        Ok(PinStatus::from_record(&record, Vec::new()))
    }

    /// Replace a pin's content and enqueue an Update job superseding
    /// whatever is currently running for that Pin ID.
    pub async fn update_pin(
        &self,
        user: &AuthUser,
        request_id: &str,
        req: PinRequest,
    ) -> Result<PinStatus, ApiError> {
        let id = decode_request_id(request_id)?;
        let name = non_empty_name(req.name)?;

        let mut tx = self.pool.begin().await?;
        let old = db::find_pin_for_owner(&mut *tx, id, user.id)
            .await?
            .ok_or_else(|| ApiError::not_found("pin not found"))?;

        let new = db::replace_pin_content(
            &mut *tx,
            id,
            &name,
            &req.cid,
            &req.origins,
            req.meta.as_ref(),
        )
        .await?;

        self.queue
            .submit(Job::Update {
                old,
                new: new.clone(),
            })
            .await;
        tx.commit().await?;

        let delegates = self.delegates().await;
        Ok(PinStatus::from_record(&new, delegates))
    }

    /// Enqueue a Delete job for an owned pin. The record itself is only
    /// removed by the queue worker, after the backend unpin succeeds.
    pub async fn delete_pin(&self, user: &AuthUser, request_id: &str) -> Result<(), ApiError> {
        let id = decode_request_id(request_id)?;

        let mut tx = self.pool.begin().await?;
        let pin = db::find_pin_for_owner(&mut *tx, id, user.id)
            .await?
            .ok_or_else(|| ApiError::not_found("pin not found"))?;

        self.queue.submit(Job::Delete(pin)).await;
        tx.commit().await?;
        Ok(())
    }

    /// Best-effort node identity lookup for the `delegates` field. Failures
    /// are logged and degrade to an empty list rather than failing the
    /// surrounding operation.
    async fn delegates(&self) -> Vec<String> {
        match self.backend.identify().await {
            Ok(identity) => identity.addresses,
            Err(e) => {
                warn!(error = %e, "identify failed, returning empty delegates");
                Vec::new()
            }
        }
    }
}

fn non_empty_name(name: Option<String>) -> Result<String, ApiError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(ApiError::bad_request("name must be non-empty")),
    }
}
