//! PinQueue
//!
//! A per-pin concurrent job dispatcher. At most one job runs per Pin ID at
//! a time; a newer job for the same ID cancels the older (supersession);
//! `stop` drains outstanding jobs before returning; `start` rehydrates
//! in-flight work left behind by a previous crash before accepting new
//! submissions.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use sqlx::PgPool;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::PinBackend;
use crate::db::{self, PinRecord, PinStatusValue};

/// Work submitted to the queue for a given Pin ID.
#[derive(Debug, Clone)]
pub enum Job {
    Add(PinRecord),
    Update { old: PinRecord, new: PinRecord },
    Delete(PinRecord),
}

impl Job {
    fn pin_id(&self) -> i64 {
        match self {
            Self::Add(p) | Self::Delete(p) => p.id,
            Self::Update { new, .. } => new.id,
        }
    }
}

enum Command {
    Submit(Job),
    Stop(oneshot::Sender<()>),
}

/// Handle to a running dispatcher. Cheap to clone; every clone shares the
/// same underlying submission channel.
#[derive(Clone)]
pub struct PinQueue {
    sender: mpsc::Sender<Command>,
}

impl PinQueue {
    /// Launch the dispatcher and rehydrate any pins left in `queued` or
    /// `pinning` status by a previous crash, then begin accepting
    /// submissions. Rehydrated jobs are enqueued before this function
    /// returns, so submissions made afterward are never reordered ahead
    /// of them.
    pub async fn start(pool: PgPool, backend: Arc<dyn PinBackend>) -> sqlx::Result<Self> {
        let pending = db::list_pending_pins(&pool).await?;
        let (sender, receiver) = mpsc::channel(256);

        let dispatcher = Dispatcher {
            pool,
            backend,
            jobs: HashMap::new(),
            root: CancellationToken::new(),
        };

        info!(count = pending.len(), "rehydrating pending pins");
        let rehydrated: Vec<Job> = pending.into_iter().map(Job::Add).collect();

        tokio::spawn(dispatcher.run(rehydrated, receiver));

        Ok(Self { sender })
    }

    /// Submit a job. The job is keyed by its Pin ID; a job already running
    /// for that ID is cancelled and replaced.
    pub async fn submit(&self, job: Job) {
        if self.sender.send(Command::Submit(job)).await.is_err() {
            warn!("pin queue is stopped, dropping submission");
        }
    }

    /// Cancel the root context, stop accepting submissions, and wait for
    /// every outstanding job to finish observing cancellation.
    pub async fn stop(&self) {
        let (tx, rx) = oneshot::channel();
        if self.sender.send(Command::Stop(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

struct Dispatcher {
    pool: PgPool,
    backend: Arc<dyn PinBackend>,
    jobs: HashMap<i64, CancellationToken>,
    root: CancellationToken,
}

impl Dispatcher {
    async fn run(mut self, rehydrated: Vec<Job>, mut commands: mpsc::Receiver<Command>) {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<i64>();

        for job in rehydrated {
            self.dispatch(job, done_tx.clone());
        }

        let mut stop_reply: Option<oneshot::Sender<()>> = None;
        let mut stopping = false;

        loop {
            tokio::select! {
                biased;

                Some(pin_id) = done_rx.recv() => {
                    self.jobs.remove(&pin_id);
                    if stopping && self.jobs.is_empty() {
                        break;
                    }
                }

                maybe_command = commands.recv(), if !stopping => {
                    match maybe_command {
                        Some(Command::Submit(job)) => self.dispatch(job, done_tx.clone()),
                        Some(Command::Stop(reply)) => {
                            stopping = true;
                            self.root.cancel();
                            if self.jobs.is_empty() {
                                let _ = reply.send(());
                                break;
                            }
                            stop_reply = Some(reply);
                        }
                        None => break,
                    }
                }
            }
        }

        if let Some(reply) = stop_reply {
            let _ = reply.send(());
        }
    }

    /// Install a fresh cancellation token for this job's Pin ID, cancelling
    /// whatever was running for it, then launch the job.
    fn dispatch(&mut self, job: Job, done: mpsc::UnboundedSender<i64>) {
        let pin_id = job.pin_id();

        let token = install_token(&mut self.jobs, &self.root, pin_id);

        let pool = self.pool.clone();
        let backend = Arc::clone(&self.backend);

        tokio::spawn(async move {
            run_job(pool, backend, job, token).await;
            let _ = done.send(pin_id);
        });
    }
}

/// Cancel whatever token is currently installed for `pin_id`, install a
/// fresh child of `root` in its place, and return it. Pulled out of
/// [`Dispatcher::dispatch`] so the supersession bookkeeping is testable
/// without spinning up real jobs.
fn install_token(
    jobs: &mut HashMap<i64, CancellationToken>,
    root: &CancellationToken,
    pin_id: i64,
) -> CancellationToken {
    if let Some(previous) = jobs.remove(&pin_id) {
        previous.cancel();
    }
    let token = root.child_token();
    jobs.insert(pin_id, token.clone());
    token
}

async fn run_job(pool: PgPool, backend: Arc<dyn PinBackend>, job: Job, ct: CancellationToken) {
    match job {
        Job::Add(pin) => run_add(pool, backend, pin.id, pin.cid, pin.origins, ct).await,
        Job::Update { old, new } => run_update(pool, backend, old, new, ct).await,
        Job::Delete(pin) => run_delete(pool, backend, pin, ct).await,
    }
}

async fn connect_origins(backend: &Arc<dyn PinBackend>, origins: &[String]) {
    for origin in origins {
        let backend = Arc::clone(backend);
        let origin = origin.clone();
        tokio::spawn(async move {
            if let Err(e) = backend.connect_peer(&origin).await {
                warn!(origin = %origin, error = %e, "connect_peer failed");
            }
        });
    }
}

/// Write `next` for `pin_id` if and only if [`PinStatusValue::can_transition`]
/// allows moving from whatever status is currently stored. An illegal edge
/// (e.g. a late completion racing a reset back to `queued`) is logged and
/// skipped rather than written, so the state machine actually guards
/// writes instead of being advisory. Returns whether the record ended up
/// in `next` (a no-op because it was already there counts as success —
/// rehydrating a pin that crashed mid-`pinning` re-claims the same status
/// rather than being rejected as an illegal re-entry).
async fn transition_status(pool: &PgPool, pin_id: i64, next: PinStatusValue) -> bool {
    let current = match db::find_pin_by_id(pool, pin_id).await {
        Ok(Some(record)) => record.status,
        Ok(None) => return false,
        Err(e) => {
            error!(pin_id, error = %e, "failed to read current pin status");
            return false;
        }
    };

    if current == next {
        return true;
    }

    if !current.can_transition(next) {
        warn!(pin_id, from = ?current, to = ?next, "skipping illegal status transition");
        return false;
    }

    if let Err(e) = db::update_pin_status(pool, pin_id, next).await {
        error!(pin_id, error = %e, "failed to persist pin status");
        return false;
    }
    true
}

/// Persist a terminal status unless the job was cancelled in the meantime
/// (a cancelled job must not clobber state reclaimed by rehydration or a
/// superseding job).
async fn persist_terminal(pool: &PgPool, pin_id: i64, status: PinStatusValue, ct: &CancellationToken) {
    if ct.is_cancelled() {
        return;
    }
    transition_status(pool, pin_id, status).await;
}

async fn run_add(
    pool: PgPool,
    backend: Arc<dyn PinBackend>,
    pin_id: i64,
    cid: String,
    origins: Vec<String>,
    ct: CancellationToken,
) {
    if ct.is_cancelled() {
        return;
    }
    if !transition_status(&pool, pin_id, PinStatusValue::Pinning).await {
        return;
    }

    connect_origins(&backend, &origins).await;

    let stream_result = tokio::select! {
        _ = ct.cancelled() => return,
        r = backend.pin_add(&cid) => r,
    };

    let mut stream = match stream_result {
        Ok(stream) => stream,
        Err(e) => {
            warn!(pin_id, error = %e, "pin_add failed");
            persist_terminal(&pool, pin_id, PinStatusValue::Failed, &ct).await;
            return;
        }
    };

    let mut failed = false;
    loop {
        let next = tokio::select! {
            _ = ct.cancelled() => return,
            n = stream.next() => n,
        };
        match next {
            Some(event) if event.error.is_some() => {
                failed = true;
            }
            Some(_) => {}
            None => break,
        }
    }

    let status = if failed {
        PinStatusValue::Failed
    } else {
        PinStatusValue::Pinned
    };
    persist_terminal(&pool, pin_id, status, &ct).await;
}

async fn run_update(
    pool: PgPool,
    backend: Arc<dyn PinBackend>,
    old: PinRecord,
    new: PinRecord,
    ct: CancellationToken,
) {
    if ct.is_cancelled() {
        return;
    }
    if !transition_status(&pool, new.id, PinStatusValue::Pinning).await {
        return;
    }

    connect_origins(&backend, &new.origins).await;

    let result = tokio::select! {
        _ = ct.cancelled() => return,
        r = backend.pin_update(&old.cid, &new.cid, false) => r,
    };

    let status = match result {
        Ok(()) => PinStatusValue::Pinned,
        Err(e) => {
            warn!(pin_id = new.id, error = %e, "pin_update failed");
            PinStatusValue::Failed
        }
    };
    persist_terminal(&pool, new.id, status, &ct).await;
}

async fn run_delete(pool: PgPool, backend: Arc<dyn PinBackend>, pin: PinRecord, ct: CancellationToken) {
    if ct.is_cancelled() {
        return;
    }
    let result = tokio::select! {
        _ = ct.cancelled() => return,
        r = backend.pin_remove(&pin.cid) => r,
    };

    match result {
        Ok(()) => {
            if let Err(e) = db::delete_pin(&pool, pin.id).await {
                error!(pin_id = pin.id, error = %e, "failed to delete pin record after unpin");
            }
        }
        Err(e) => {
            warn!(pin_id = pin.id, error = %e, "pin_remove failed, leaving record intact");
        }
    }
}
